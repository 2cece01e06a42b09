//! Typing Input - keyboard input normalization for typing practice
//!
//! Turns raw host keyboard, composition and soft-keyboard events into a
//! single stream of logical key events, classifies each keydown as typing,
//! a named shortcut or a passthrough, and publishes the result on a typed
//! bus. Listener registration is scoped so that deactivating a component
//! removes everything it installed.

pub mod bridge;
pub mod bus;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod keyboard;
pub mod lifecycle;
pub mod replay;
pub mod scheduler;
pub mod shortcut;
pub mod test_helpers;
pub mod ui;

pub use bus::{BusEvent, EventBus, Topic};
pub use config::Config;
pub use context::{CurrentWord, RuntimeContext};
pub use dispatch::{Classification, DispatchCore};
pub use keyboard::{KeyPhase, LogicalKeyEvent, Modifiers, SourceType};
pub use lifecycle::{ListenerManager, ScopeId};
pub use shortcut::{compute_shortcut_string, ShortcutMap};
