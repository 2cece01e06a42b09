//! Terminal key events to physical logical key events
//!
//! Terminals report characters rather than physical keys, so the physical
//! code and key code are recovered from the US layout. Release events only
//! arrive on terminals that support the kitty keyboard protocol.

use crate::keyboard::{keymap, KeyCode, KeyPhase, LogicalKeyEvent, Modifiers};
use crossterm::event::{KeyCode as CtKeyCode, KeyEvent as CtKeyEvent, KeyEventKind, KeyModifiers};
use std::time::Instant;

fn modifiers(flags: KeyModifiers) -> Modifiers {
    Modifiers {
        ctrl: flags.contains(KeyModifiers::CONTROL),
        alt: flags.contains(KeyModifiers::ALT),
        shift: flags.contains(KeyModifiers::SHIFT),
        meta: flags.contains(KeyModifiers::SUPER) || flags.contains(KeyModifiers::META),
    }
}

fn named(code: CtKeyCode) -> Option<&'static str> {
    let key = match code {
        CtKeyCode::Backspace => "Backspace",
        CtKeyCode::Enter => "Enter",
        CtKeyCode::Tab | CtKeyCode::BackTab => "Tab",
        CtKeyCode::Esc => "Escape",
        CtKeyCode::Delete => "Delete",
        CtKeyCode::Left => "ArrowLeft",
        CtKeyCode::Right => "ArrowRight",
        CtKeyCode::Up => "ArrowUp",
        CtKeyCode::Down => "ArrowDown",
        _ => return None,
    };
    Some(key)
}

/// Translate a terminal key event.
///
/// Returns `None` for keys with no logical counterpart (function keys,
/// media keys, lone modifiers).
pub fn to_logical(event: &CtKeyEvent, timestamp: Instant) -> Option<LogicalKeyEvent> {
    let phase = match event.kind {
        KeyEventKind::Press | KeyEventKind::Repeat => KeyPhase::Down,
        KeyEventKind::Release => KeyPhase::Up,
    };
    let repeat = event.kind == KeyEventKind::Repeat;
    let mods = modifiers(event.modifiers);

    let logical = match event.code {
        CtKeyCode::Char(ch) => LogicalKeyEvent::physical_char(phase, ch, mods, timestamp).unwrap_or_else(|| {
            LogicalKeyEvent::physical(phase, ch.to_string(), keymap::UNIDENTIFIED, KeyCode::from_char(ch), mods, timestamp)
        }),
        code => {
            let key = named(code)?;
            let mut mods = mods;
            if code == CtKeyCode::BackTab {
                mods.shift = true;
            }
            LogicalKeyEvent::physical_named(phase, key, mods, timestamp)?
        }
    };
    Some(logical.with_repeat(repeat))
}
