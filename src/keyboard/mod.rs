//! Keyboard event normalization primitives

mod event;
pub mod keymap;
mod suppress;
mod synthetic;

pub use event::{KeyPhase, LogicalKeyEvent, Modifiers, SourceType};
pub use keymap::{get_key_info, KeyCode, KeyInfo, KEYMAP};
pub use suppress::{SuppressionRegistry, DEFAULT_WINDOW};
pub use synthetic::SyntheticKey;
