//! Runtime state shared between the dispatch core and its host
//!
//! Replaces ambient globals: the listening flag, the current-word snapshot
//! and the settings snapshot all live here and are handed to the components
//! that read them.

use crate::config::Config;
use crate::shortcut::ShortcutMap;
use std::cell::{Cell, Ref, RefCell};

/// User-agent fragments that identify a touch/mobile form factor
const TOUCH_AGENTS: &[&str] = &["android", "iphone", "ipad", "ipod", "mobile"];

/// Detect a touch/mobile form factor from a user-agent string
pub fn detect_touch(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    TOUCH_AGENTS.iter().any(|fragment| ua.contains(fragment))
}

/// Snapshot of the word being practised
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentWord {
    /// Target word, possibly containing spaces
    pub word: String,
    /// What has been typed so far
    pub input: String,
    /// Input is locked waiting for a space
    pub input_lock: bool,
}

impl CurrentWord {
    pub fn new(word: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            input: input.into(),
            input_lock: false,
        }
    }

    pub fn locked(mut self, input_lock: bool) -> Self {
        self.input_lock = input_lock;
        self
    }

    /// The next character the word expects is a space
    pub fn expects_space(&self) -> bool {
        let position = self.input.chars().count();
        self.word.chars().nth(position) == Some(' ')
    }

    /// Space must be delivered as a literal character
    pub fn space_is_literal(&self) -> bool {
        self.input_lock || self.expects_space()
    }
}

/// Shared runtime state, read on every event
#[derive(Debug)]
pub struct RuntimeContext {
    listening_disabled: Cell<bool>,
    current_word: RefCell<Option<CurrentWord>>,
    shortcuts: RefCell<ShortcutMap>,
    route: RefCell<String>,
    touch: bool,
}

impl RuntimeContext {
    pub fn new(shortcuts: ShortcutMap, touch: bool) -> Self {
        Self {
            listening_disabled: Cell::new(false),
            current_word: RefCell::new(None),
            shortcuts: RefCell::new(shortcuts),
            route: RefCell::new(String::new()),
            touch,
        }
    }

    /// Build from config; the touch override wins over user-agent detection
    pub fn from_config(config: &Config, user_agent: &str) -> Self {
        let touch = config
            .mobile
            .touch_override
            .unwrap_or_else(|| detect_touch(user_agent));
        Self::new(config.shortcuts.clone(), touch)
    }

    pub fn is_touch(&self) -> bool {
        self.touch
    }

    pub fn is_listening(&self) -> bool {
        !self.listening_disabled.get()
    }

    /// Disable or re-enable all keyboard dispatch
    pub fn set_listening_disabled(&self, disabled: bool) {
        if self.listening_disabled.replace(disabled) != disabled {
            log::debug!("keyboard listening {}", if disabled { "disabled" } else { "enabled" });
        }
    }

    pub fn current_word(&self) -> Option<CurrentWord> {
        self.current_word.borrow().clone()
    }

    pub fn set_current_word(&self, word: Option<CurrentWord>) {
        *self.current_word.borrow_mut() = word;
    }

    /// Space must be treated as a typing character right now
    pub fn space_is_literal(&self) -> bool {
        self.current_word
            .borrow()
            .as_ref()
            .is_some_and(CurrentWord::space_is_literal)
    }

    /// Current settings snapshot
    pub fn shortcuts(&self) -> Ref<'_, ShortcutMap> {
        self.shortcuts.borrow()
    }

    /// Swap the settings snapshot; takes effect on the next keydown
    pub fn set_shortcuts(&self, shortcuts: ShortcutMap) {
        for shadowed in shortcuts.shadowed() {
            log::warn!("shortcut conflict: {}", shadowed);
        }
        *self.shortcuts.borrow_mut() = shortcuts;
    }

    /// Rebind one action in place
    pub fn bind_shortcut(&self, action: &str, shortcut: &str) {
        self.shortcuts.borrow_mut().bind(action, shortcut);
    }

    pub fn route(&self) -> String {
        self.route.borrow().clone()
    }

    pub fn set_route(&self, route: impl Into<String>) {
        *self.route.borrow_mut() = route.into();
    }
}
