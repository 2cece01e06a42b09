//! Shared test utilities
//!
//! Builders for physical key events, used by unit and integration tests.

use crate::keyboard::{keymap, KeyCode, KeyPhase, LogicalKeyEvent, Modifiers};
use std::time::Instant;

/// Creates a physical event for a character with full control over all parameters.
///
/// Characters missing from the US layout get an "Unidentified" code and a
/// key code derived from the character.
pub fn make_char(phase: KeyPhase, ch: char, modifiers: Modifiers, timestamp: Instant) -> LogicalKeyEvent {
    LogicalKeyEvent::physical_char(phase, ch, modifiers, timestamp).unwrap_or_else(|| {
        LogicalKeyEvent::physical(phase, ch.to_string(), keymap::UNIDENTIFIED, KeyCode::from_char(ch), modifiers, timestamp)
    })
}

/// Keydown for a character at a specific time.
pub fn down_at(ch: char, timestamp: Instant) -> LogicalKeyEvent {
    make_char(KeyPhase::Down, ch, Modifiers::none(), timestamp)
}

/// Keydown for a character.
///
/// Uses `Instant::now()` for the timestamp.
pub fn down(ch: char) -> LogicalKeyEvent {
    down_at(ch, Instant::now())
}

/// Keyup for a character at a specific time.
pub fn up_at(ch: char, timestamp: Instant) -> LogicalKeyEvent {
    make_char(KeyPhase::Up, ch, Modifiers::none(), timestamp)
}

/// Keydown for a character with Ctrl held.
pub fn ctrl(ch: char) -> LogicalKeyEvent {
    make_char(KeyPhase::Down, ch, Modifiers::ctrl(), Instant::now())
}

/// Keydown for a named key ("Enter", "ArrowLeft", ...) at a specific time.
pub fn named_at(key: &str, timestamp: Instant) -> LogicalKeyEvent {
    LogicalKeyEvent::physical_named(KeyPhase::Down, key, Modifiers::none(), timestamp)
        .unwrap_or_else(|| LogicalKeyEvent::physical(KeyPhase::Down, key, key, KeyCode::default(), Modifiers::none(), timestamp))
}

/// Keydown for a named key.
pub fn named(key: &str) -> LogicalKeyEvent {
    named_at(key, Instant::now())
}

/// Space keydown.
pub fn space() -> LogicalKeyEvent {
    down(' ')
}

/// The unidentified IME keydown soft keyboards send ahead of their input, at a specific time.
pub fn sentinel_at(timestamp: Instant) -> LogicalKeyEvent {
    LogicalKeyEvent::physical(
        KeyPhase::Down,
        keymap::UNIDENTIFIED,
        "",
        KeyCode::IME_PROCESS,
        Modifiers::none(),
        timestamp,
    )
}

/// The unidentified IME keydown.
pub fn sentinel() -> LogicalKeyEvent {
    sentinel_at(Instant::now())
}
