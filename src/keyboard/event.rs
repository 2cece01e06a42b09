//! Normalized keyboard event types

use super::keymap::{self, KeyCode};
use std::cell::Cell;
use std::time::Instant;

/// Keyboard channel an event was delivered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPhase {
    /// Key was pressed down
    Down,
    /// Key was released
    Up,
}

/// Where an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    /// Delivered by the platform's native key pipeline
    Physical,
    /// Fabricated from composition or soft-keyboard input
    Synthetic,
}

/// Modifier key state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ctrl() -> Self {
        Self { ctrl: true, ..Self::default() }
    }

    pub fn alt() -> Self {
        Self { alt: true, ..Self::default() }
    }

    pub fn shift() -> Self {
        Self { shift: true, ..Self::default() }
    }

    pub fn meta() -> Self {
        Self { meta: true, ..Self::default() }
    }

    /// Ctrl or Meta, which shortcuts treat as the same modifier
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.meta
    }
}

/// A keyboard event after normalization.
///
/// Physical events carry the platform's values verbatim. Synthetic events
/// are built by [`super::SyntheticKey`] and never carry modifiers.
#[derive(Debug, Clone)]
pub struct LogicalKeyEvent {
    /// Key value ("a", "Enter", "ArrowUp", "Unidentified")
    pub key: String,
    /// Physical key code ("KeyA", "Space"); empty only for synthetic events
    pub code: String,
    /// Legacy key code
    pub key_code: KeyCode,
    pub modifiers: Modifiers,
    /// Auto-repeat
    pub repeat: bool,
    pub source: SourceType,
    pub phase: KeyPhase,
    /// When the event occurred
    pub timestamp: Instant,
    default_prevented: Cell<bool>,
}

impl LogicalKeyEvent {
    /// Create a physical event.
    ///
    /// Platforms report an empty `code` for some soft-keyboard events; it is
    /// stored as "Unidentified" so that only synthetic events have none.
    pub fn physical(
        phase: KeyPhase,
        key: impl Into<String>,
        code: impl Into<String>,
        key_code: KeyCode,
        modifiers: Modifiers,
        timestamp: Instant,
    ) -> Self {
        let mut code = code.into();
        if code.is_empty() {
            code = keymap::UNIDENTIFIED.to_string();
        }
        Self {
            key: key.into(),
            code,
            key_code,
            modifiers,
            repeat: false,
            source: SourceType::Physical,
            phase,
            timestamp,
            default_prevented: Cell::new(false),
        }
    }

    /// Physical event for a character typed on a US layout.
    ///
    /// Returns `None` for characters the layout cannot produce.
    pub fn physical_char(phase: KeyPhase, ch: char, mut modifiers: Modifiers, timestamp: Instant) -> Option<Self> {
        let info = keymap::get_key_info(ch)?;
        modifiers.shift |= info.shifted;
        Some(Self::physical(phase, ch.to_string(), info.code, info.key_code, modifiers, timestamp))
    }

    /// Physical event for a named key ("Enter", "ArrowLeft", ...)
    pub fn physical_named(phase: KeyPhase, key: &str, modifiers: Modifiers, timestamp: Instant) -> Option<Self> {
        let (code, key_code) = keymap::named_key(key)?;
        Some(Self::physical(phase, key, code, key_code, modifiers, timestamp))
    }

    pub(crate) fn synthetic(
        phase: KeyPhase,
        key: String,
        code: String,
        key_code: KeyCode,
        timestamp: Instant,
    ) -> Self {
        Self {
            key,
            code,
            key_code,
            modifiers: Modifiers::none(),
            repeat: false,
            source: SourceType::Synthetic,
            phase,
            timestamp,
            default_prevented: Cell::new(false),
        }
    }

    /// Mark an auto-repeated event
    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == SourceType::Synthetic
    }

    /// Ask the host to cancel the platform's default action.
    ///
    /// No-op for synthetic events: there is no platform action behind them.
    pub fn prevent_default(&self) {
        if self.source == SourceType::Physical {
            self.default_prevented.set(true);
        }
    }

    /// Whether [`prevent_default`](Self::prevent_default) took effect
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// No-op for synthetic events; propagation is owned by the host for physical ones
    pub fn stop_propagation(&self) {}

    /// The Space key (by physical code)
    pub fn is_space(&self) -> bool {
        self.code == "Space"
    }

    /// Single printable character carried by this event, if any
    pub fn character(&self) -> Option<char> {
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_control() => Some(ch),
            _ => None,
        }
    }
}

impl PartialEq for LogicalKeyEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.code == other.code
            && self.key_code == other.key_code
            && self.modifiers == other.modifiers
            && self.repeat == other.repeat
            && self.source == other.source
            && self.phase == other.phase
            && self.timestamp == other.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_event_keeps_platform_values() {
        let now = Instant::now();
        let event = LogicalKeyEvent::physical(KeyPhase::Down, "a", "KeyA", KeyCode(65), Modifiers::ctrl(), now);
        assert_eq!(event.key, "a");
        assert_eq!(event.code, "KeyA");
        assert_eq!(event.key_code, KeyCode(65));
        assert!(event.modifiers.ctrl);
        assert_eq!(event.source, SourceType::Physical);
        assert!(!event.repeat);
    }

    #[test]
    fn physical_event_never_has_empty_code() {
        let event = LogicalKeyEvent::physical(
            KeyPhase::Down,
            "Unidentified",
            "",
            KeyCode::IME_PROCESS,
            Modifiers::none(),
            Instant::now(),
        );
        assert_eq!(event.code, "Unidentified");
    }

    #[test]
    fn prevent_default_marks_physical_events() {
        let event = LogicalKeyEvent::physical_char(KeyPhase::Down, 'x', Modifiers::none(), Instant::now())
            .expect("x is on the layout");
        assert!(!event.default_prevented());
        event.prevent_default();
        assert!(event.default_prevented());
    }

    #[test]
    fn physical_char_adds_shift_for_shifted_characters() {
        let event = LogicalKeyEvent::physical_char(KeyPhase::Down, 'A', Modifiers::none(), Instant::now())
            .expect("A is on the layout");
        assert!(event.modifiers.shift);
        assert_eq!(event.code, "KeyA");
    }

    #[test]
    fn character_only_for_single_printable_keys() {
        let now = Instant::now();
        let a = LogicalKeyEvent::physical_char(KeyPhase::Down, 'a', Modifiers::none(), now).expect("a");
        assert_eq!(a.character(), Some('a'));
        let enter = LogicalKeyEvent::physical_named(KeyPhase::Down, "Enter", Modifiers::none(), now).expect("enter");
        assert_eq!(enter.character(), None);
    }

    #[test]
    fn command_modifier_covers_meta() {
        assert!(Modifiers::meta().command());
        assert!(Modifiers::ctrl().command());
        assert!(!Modifiers::alt().command());
        assert!(!Modifiers::none().any());
    }
}
