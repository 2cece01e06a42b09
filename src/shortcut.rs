//! Shortcut strings and the user-configurable action mapping

use crate::keyboard::{keymap, LogicalKeyEvent};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Bindings shipped with the application
const DEFAULT_BINDINGS: &[(&str, &str)] = &[
    ("ShowWord", "Escape"),
    ("EditArticle", "Ctrl+E"),
    ("Next", "➡"),
    ("Previous", "⬅"),
    ("ToggleSimple", "`"),
    ("ToggleCollect", "Enter"),
    ("NextChapter", "Ctrl+➡"),
    ("PreviousChapter", "Ctrl+⬅"),
    ("RepeatChapter", "Ctrl+Enter"),
    ("DictationChapter", "Alt+Enter"),
    ("PlayWordPronunciation", "Ctrl+P"),
    ("ToggleShowTranslate", "Ctrl+Z"),
    ("ToggleDictation", "Ctrl+I"),
    ("ToggleTheme", "Ctrl+Q"),
    ("ToggleConciseMode", "Ctrl+M"),
    ("TogglePanel", "Ctrl+L"),
    ("RandomWrite", "Ctrl+R"),
    ("NextRandomWrite", "Ctrl+Shift+R"),
];

/// Canonical shortcut string for a key event.
///
/// Modifiers come first in fixed order (`Ctrl+`, `Alt+`, `Shift+`; Meta
/// counts as Ctrl), then the key token: uppercase letters for A-Z key codes,
/// arrow glyphs for the arrow keys, the raw key value otherwise. A bare
/// modifier key contributes no token.
pub fn compute_shortcut_string(event: &LogicalKeyEvent) -> String {
    let mut shortcut = String::new();
    if event.modifiers.command() {
        shortcut.push_str("Ctrl+");
    }
    if event.modifiers.alt {
        shortcut.push_str("Alt+");
    }
    if event.modifiers.shift {
        shortcut.push_str("Shift+");
    }

    if !keymap::is_modifier_key(&event.key) {
        if event.key_code.is_letter() {
            shortcut.push_str(&event.key.to_uppercase());
        } else if let Some(glyph) = keymap::arrow_glyph(&event.key) {
            shortcut.push_str(glyph);
        } else {
            shortcut.push_str(&event.key);
        }
    }

    shortcut.trim().to_string()
}

/// Ordered action-name -> shortcut-string mapping.
///
/// Lookups scan in declaration order and the first match wins, so a later
/// action bound to the same string is shadowed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShortcutMap {
    bindings: Vec<(String, String)>,
}

impl ShortcutMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Application defaults
    pub fn defaults() -> Self {
        DEFAULT_BINDINGS.iter().map(|(action, shortcut)| (*action, *shortcut)).collect()
    }

    /// Bind `action`, replacing its previous shortcut in place
    pub fn bind(&mut self, action: impl Into<String>, shortcut: impl Into<String>) {
        let action = action.into();
        let shortcut = shortcut.into();
        match self.bindings.iter_mut().find(|(a, _)| *a == action) {
            Some(entry) => entry.1 = shortcut,
            None => self.bindings.push((action, shortcut)),
        }
    }

    /// Remove the binding for `action`, returning its shortcut
    pub fn unbind(&mut self, action: &str) -> Option<String> {
        let index = self.bindings.iter().position(|(a, _)| a == action)?;
        Some(self.bindings.remove(index).1)
    }

    /// Shortcut bound to `action`
    pub fn get(&self, action: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(a, _)| a == action)
            .map(|(_, s)| s.as_str())
    }

    /// First action whose shortcut equals `shortcut`
    pub fn resolve(&self, shortcut: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(_, s)| s == shortcut)
            .map(|(a, _)| a.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(a, s)| (a.as_str(), s.as_str()))
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(a, _)| a.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings that can never fire because an earlier action owns the same string
    pub fn shadowed(&self) -> Vec<ShadowedBinding> {
        let mut shadowed = Vec::new();
        for (index, (action, shortcut)) in self.bindings.iter().enumerate() {
            if shortcut.is_empty() {
                continue;
            }
            if let Some((winner, _)) = self.bindings[..index].iter().find(|(_, s)| s == shortcut) {
                shadowed.push(ShadowedBinding {
                    shortcut: shortcut.clone(),
                    action: action.clone(),
                    shadowed_by: winner.clone(),
                });
            }
        }
        shadowed
    }
}

/// Resolve `shortcut` against `map`
pub fn resolve<'a>(shortcut: &str, map: &'a ShortcutMap) -> Option<&'a str> {
    map.resolve(shortcut)
}

/// An unreachable binding reported by [`ShortcutMap::shadowed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedBinding {
    pub shortcut: String,
    pub action: String,
    pub shadowed_by: String,
}

impl fmt::Display for ShadowedBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is bound to both {} and {}; {} wins",
            self.shortcut, self.shadowed_by, self.action, self.shadowed_by
        )
    }
}

impl<A: Into<String>, S: Into<String>> FromIterator<(A, S)> for ShortcutMap {
    fn from_iter<I: IntoIterator<Item = (A, S)>>(iter: I) -> Self {
        let mut map = ShortcutMap::new();
        for (action, shortcut) in iter {
            map.bindings.push((action.into(), shortcut.into()));
        }
        map
    }
}

impl Serialize for ShortcutMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.bindings.len()))?;
        for (action, shortcut) in &self.bindings {
            map.serialize_entry(action, shortcut)?;
        }
        map.end()
    }
}

struct ShortcutMapVisitor;

impl<'de> Visitor<'de> for ShortcutMapVisitor {
    type Value = ShortcutMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a table of action names to shortcut strings")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
        let mut map = ShortcutMap::new();
        while let Some((action, shortcut)) = access.next_entry::<String, String>()? {
            map.bindings.push((action, shortcut));
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for ShortcutMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ShortcutMapVisitor)
    }
}
