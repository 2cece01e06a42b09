//! Synthetic key events built from composed or soft-keyboard text

use super::{KeyCode, KeyPhase, LogicalKeyEvent};
use std::time::Instant;

/// Logical description of a key to fabricate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticKey {
    pub key: String,
    /// Explicit physical code; empty when the key has no physical counterpart
    pub code: Option<String>,
    pub key_code: KeyCode,
}

impl SyntheticKey {
    pub fn new(key: impl Into<String>, code: Option<String>, key_code: KeyCode) -> Self {
        Self {
            key: key.into(),
            code,
            key_code,
        }
    }

    /// Key for a single character of composed or typed text
    pub fn from_char(ch: char) -> Self {
        let code = (ch == ' ').then(|| "Space".to_string());
        Self::new(ch.to_string(), code, KeyCode::from_char(ch))
    }

    /// Backspace produced by a deletion input
    pub fn backspace() -> Self {
        Self::new("Backspace", Some("Backspace".to_string()), KeyCode::BACKSPACE)
    }

    /// Build the event: no modifiers, not repeated, cancellation is a no-op
    pub fn build(self, phase: KeyPhase, timestamp: Instant) -> LogicalKeyEvent {
        LogicalKeyEvent::synthetic(phase, self.key, self.code.unwrap_or_default(), self.key_code, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::SourceType;

    #[test]
    fn letter_builds_uppercase_key_code() {
        let event = SyntheticKey::from_char('q').build(KeyPhase::Down, Instant::now());
        assert_eq!(event.key, "q");
        assert_eq!(event.key_code, KeyCode(81));
        assert_eq!(event.code, "");
        assert_eq!(event.source, SourceType::Synthetic);
        assert!(!event.modifiers.any());
        assert!(!event.repeat);
    }

    #[test]
    fn space_gets_space_code() {
        let event = SyntheticKey::from_char(' ').build(KeyPhase::Down, Instant::now());
        assert_eq!(event.code, "Space");
        assert_eq!(event.key_code, KeyCode::SPACE);
        assert!(event.is_space());
    }

    #[test]
    fn backspace_key() {
        let event = SyntheticKey::backspace().build(KeyPhase::Down, Instant::now());
        assert_eq!(event.key, "Backspace");
        assert_eq!(event.code, "Backspace");
        assert_eq!(event.key_code, KeyCode(8));
    }

    #[test]
    fn prevent_default_is_a_no_op() {
        let event = SyntheticKey::from_char('a').build(KeyPhase::Down, Instant::now());
        event.prevent_default();
        event.stop_propagation();
        assert!(!event.default_prevented());
    }
}
