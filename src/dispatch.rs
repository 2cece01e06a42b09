//! Keydown/keyup classification and publication
//!
//! Each keydown goes through the branches below in order; the first one
//! that applies decides the outcome:
//!
//! 1. listening disabled: ignored
//! 2. Space while the current word needs a literal space: typing
//! 3. shortcut string bound to an action: that action
//! 4. any other Space: typing
//! 5. typing key without Ctrl/Alt: typing (touch sentinel events dropped)
//! 6. everything else: raw keydown passthrough

use crate::bus::{BusEvent, EventBus};
use crate::context::RuntimeContext;
use crate::keyboard::{keymap, KeyCode, LogicalKeyEvent};
use crate::shortcut::compute_shortcut_string;
use std::rc::Rc;

/// Outcome of a keydown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Listening is disabled; nothing published
    Ignored,
    /// Published as typing input
    Typing,
    /// Published as the named action
    Shortcut(String),
    /// IME sentinel on a touch device; the bridge delivers the real character
    Dropped,
    /// Published as a raw keydown
    Passthrough,
}

/// The keydown/keyup handler behind every registered scope
pub struct DispatchCore {
    context: Rc<RuntimeContext>,
    bus: Rc<EventBus>,
}

impl DispatchCore {
    pub fn new(context: Rc<RuntimeContext>, bus: Rc<EventBus>) -> Self {
        Self { context, bus }
    }

    pub fn context(&self) -> &Rc<RuntimeContext> {
        &self.context
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// Decide what a keydown is without side effects
    pub fn classify(&self, event: &LogicalKeyEvent) -> Classification {
        if !self.context.is_listening() {
            return Classification::Ignored;
        }

        if event.is_space() && self.context.space_is_literal() {
            return Classification::Typing;
        }

        let shortcut = compute_shortcut_string(event);
        // Settings are read on every keydown; the borrow ends before publishing.
        let action = self.context.shortcuts().resolve(&shortcut).map(str::to_string);
        if let Some(action) = action {
            return Classification::Shortcut(action);
        }

        if event.is_space() {
            return Classification::Typing;
        }

        if is_typing_key(event) && !event.modifiers.ctrl && !event.modifiers.alt {
            if self.context.is_touch()
                && event.key_code == KeyCode::IME_PROCESS
                && event.key == keymap::UNIDENTIFIED
            {
                return Classification::Dropped;
            }
            return Classification::Typing;
        }

        Classification::Passthrough
    }

    /// Classify a keydown and publish the result
    pub fn on_keydown(&self, event: &LogicalKeyEvent) -> Classification {
        let classification = self.classify(event);
        match &classification {
            Classification::Typing => {
                event.prevent_default();
                self.bus.publish(BusEvent::Typing(event.clone()));
            }
            Classification::Shortcut(action) => {
                event.prevent_default();
                self.bus.publish(BusEvent::Shortcut {
                    action: action.clone(),
                    event: event.clone(),
                });
            }
            Classification::Passthrough => {
                self.bus.publish(BusEvent::KeyDown(event.clone()));
            }
            Classification::Dropped => {
                log::debug!("dropped unidentified IME keydown; waiting for composition input");
            }
            Classification::Ignored => {}
        }
        log::trace!("keydown {:?} ({}) -> {:?}", event.key, event.code, classification);
        classification
    }

    /// Publish a keyup verbatim. Returns false when listening is disabled.
    pub fn on_keyup(&self, event: &LogicalKeyEvent) -> bool {
        if !self.context.is_listening() {
            return false;
        }
        self.bus.publish(BusEvent::KeyUp(event.clone()));
        true
    }
}

/// Keys that contribute a character to the practice input.
///
/// Letters, digits, the punctuation whitelist and the IME sentinel qualify.
/// Synthetic events qualify whenever they carry a single character, since
/// composed text may contain characters outside the physical whitelist.
pub fn is_typing_key(event: &LogicalKeyEvent) -> bool {
    event.key_code.is_letter()
        || event.key_code.is_digit()
        || keymap::is_typing_punctuation(&event.code)
        || event.key_code == KeyCode::IME_PROCESS
        || (event.is_synthetic() && event.character().is_some())
}
