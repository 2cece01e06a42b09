//! Terminal User Interface components

mod app;
mod input;
pub mod theme;
mod widgets;

pub use app::{App, AppState, AppView, LogEntry};
pub use input::to_logical;
pub use theme::ThemeColors;
pub use widgets::*;
