//! Virtual key codes and the US character layout

use std::collections::HashMap;
use std::sync::LazyLock;

/// A legacy virtual key code (the `keyCode` reported by browsers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const BACKSPACE: KeyCode = KeyCode(8);
    pub const TAB: KeyCode = KeyCode(9);
    pub const ENTER: KeyCode = KeyCode(13);
    pub const SHIFT: KeyCode = KeyCode(16);
    pub const CONTROL: KeyCode = KeyCode(17);
    pub const ALT: KeyCode = KeyCode(18);
    pub const ESCAPE: KeyCode = KeyCode(27);
    pub const SPACE: KeyCode = KeyCode(32);
    pub const ARROW_LEFT: KeyCode = KeyCode(37);
    pub const ARROW_UP: KeyCode = KeyCode(38);
    pub const ARROW_RIGHT: KeyCode = KeyCode(39);
    pub const ARROW_DOWN: KeyCode = KeyCode(40);
    pub const DELETE: KeyCode = KeyCode(46);
    /// Reported while an IME is processing the key
    pub const IME_PROCESS: KeyCode = KeyCode(229);

    pub fn new(code: u32) -> Self {
        Self(code)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// A-Z
    pub fn is_letter(&self) -> bool {
        (65..=90).contains(&self.0)
    }

    /// 0-9 on the main row
    pub fn is_digit(&self) -> bool {
        (48..=57).contains(&self.0)
    }

    /// Key code derived from a character: uppercase first, then take the
    /// code point. Space maps to 32 like every other code point.
    pub fn from_char(ch: char) -> Self {
        let upper = ch.to_uppercase().next().unwrap_or(ch);
        Self(upper as u32)
    }
}

impl From<u32> for KeyCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

/// Key value reported when the platform cannot identify the key
pub const UNIDENTIFIED: &str = "Unidentified";

/// Physical `code` values of the punctuation keys that count as typing
pub const TYPING_PUNCTUATION_CODES: &[&str] = &[
    "Slash",
    "Quote",
    "Comma",
    "BracketLeft",
    "BracketRight",
    "Period",
    "Minus",
    "Equal",
    "Semicolon",
];

/// Modifier key values that never contribute a key token to a shortcut
pub const MODIFIER_KEYS: &[&str] = &["Control", "Alt", "Shift"];

pub fn is_typing_punctuation(code: &str) -> bool {
    TYPING_PUNCTUATION_CODES.contains(&code)
}

pub fn is_modifier_key(key: &str) -> bool {
    MODIFIER_KEYS.contains(&key)
}

/// Glyph used for an arrow key inside shortcut strings
pub fn arrow_glyph(key: &str) -> Option<&'static str> {
    match key {
        "ArrowRight" => Some("➡"),
        "ArrowLeft" => Some("⬅"),
        "ArrowUp" => Some("⬆"),
        "ArrowDown" => Some("⬇"),
        _ => None,
    }
}

/// Physical key information for a character on a US layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    /// Physical `code` (e.g. "KeyA", "Digit1", "Slash")
    pub code: &'static str,
    /// Legacy key code
    pub key_code: KeyCode,
    /// Whether Shift must be held to produce the character
    pub shifted: bool,
}

impl KeyInfo {
    const fn new(code: &'static str, key_code: u32, shifted: bool) -> Self {
        Self {
            code,
            key_code: KeyCode(key_code),
            shifted,
        }
    }
}

const LETTER_CODES: [&str; 26] = [
    "KeyA", "KeyB", "KeyC", "KeyD", "KeyE", "KeyF", "KeyG", "KeyH", "KeyI", "KeyJ", "KeyK",
    "KeyL", "KeyM", "KeyN", "KeyO", "KeyP", "KeyQ", "KeyR", "KeyS", "KeyT", "KeyU", "KeyV",
    "KeyW", "KeyX", "KeyY", "KeyZ",
];

const DIGIT_CODES: [&str; 10] = [
    "Digit0", "Digit1", "Digit2", "Digit3", "Digit4", "Digit5", "Digit6", "Digit7", "Digit8",
    "Digit9",
];

/// Character map for a standard US keyboard layout
pub static KEYMAP: LazyLock<HashMap<char, KeyInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Letters
    for (i, code) in LETTER_CODES.iter().enumerate() {
        let upper = (b'A' + i as u8) as char;
        let lower = upper.to_ascii_lowercase();
        map.insert(lower, KeyInfo::new(code, 65 + i as u32, false));
        map.insert(upper, KeyInfo::new(code, 65 + i as u32, true));
    }

    // Number row
    for (i, code) in DIGIT_CODES.iter().enumerate() {
        map.insert((b'0' + i as u8) as char, KeyInfo::new(code, 48 + i as u32, false));
    }
    for (ch, digit) in [
        ('!', 1), ('@', 2), ('#', 3), ('$', 4), ('%', 5),
        ('^', 6), ('&', 7), ('*', 8), ('(', 9), (')', 0),
    ] {
        map.insert(ch, KeyInfo::new(DIGIT_CODES[digit], 48 + digit as u32, true));
    }

    // Punctuation
    map.insert(' ', KeyInfo::new("Space", 32, false));
    map.insert('-', KeyInfo::new("Minus", 189, false));
    map.insert('_', KeyInfo::new("Minus", 189, true));
    map.insert('=', KeyInfo::new("Equal", 187, false));
    map.insert('+', KeyInfo::new("Equal", 187, true));
    map.insert('[', KeyInfo::new("BracketLeft", 219, false));
    map.insert('{', KeyInfo::new("BracketLeft", 219, true));
    map.insert(']', KeyInfo::new("BracketRight", 221, false));
    map.insert('}', KeyInfo::new("BracketRight", 221, true));
    map.insert('\\', KeyInfo::new("Backslash", 220, false));
    map.insert('|', KeyInfo::new("Backslash", 220, true));
    map.insert(';', KeyInfo::new("Semicolon", 186, false));
    map.insert(':', KeyInfo::new("Semicolon", 186, true));
    map.insert('\'', KeyInfo::new("Quote", 222, false));
    map.insert('"', KeyInfo::new("Quote", 222, true));
    map.insert(',', KeyInfo::new("Comma", 188, false));
    map.insert('<', KeyInfo::new("Comma", 188, true));
    map.insert('.', KeyInfo::new("Period", 190, false));
    map.insert('>', KeyInfo::new("Period", 190, true));
    map.insert('/', KeyInfo::new("Slash", 191, false));
    map.insert('?', KeyInfo::new("Slash", 191, true));
    map.insert('`', KeyInfo::new("Backquote", 192, false));
    map.insert('~', KeyInfo::new("Backquote", 192, true));

    map
});

/// Get key info for a character, if it is on the US layout
pub fn get_key_info(ch: char) -> Option<KeyInfo> {
    KEYMAP.get(&ch).copied()
}

/// Physical `code` and key code for a named (non-character) key value
pub fn named_key(key: &str) -> Option<(&'static str, KeyCode)> {
    let entry = match key {
        "Backspace" => ("Backspace", KeyCode::BACKSPACE),
        "Tab" => ("Tab", KeyCode::TAB),
        "Enter" => ("Enter", KeyCode::ENTER),
        "Shift" => ("ShiftLeft", KeyCode::SHIFT),
        "Control" => ("ControlLeft", KeyCode::CONTROL),
        "Alt" => ("AltLeft", KeyCode::ALT),
        "Escape" => ("Escape", KeyCode::ESCAPE),
        "ArrowLeft" => ("ArrowLeft", KeyCode::ARROW_LEFT),
        "ArrowUp" => ("ArrowUp", KeyCode::ARROW_UP),
        "ArrowRight" => ("ArrowRight", KeyCode::ARROW_RIGHT),
        "ArrowDown" => ("ArrowDown", KeyCode::ARROW_DOWN),
        "Delete" => ("Delete", KeyCode::DELETE),
        _ => return None,
    };
    Some(entry)
}
