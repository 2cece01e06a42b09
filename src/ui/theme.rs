//! Theme color definitions for the UI
//!
//! Provides dark and light color palettes that can be switched at runtime.

use crate::config::Theme;
use ratatui::style::Color;

/// Complete color palette for the UI
#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    /// Main background
    pub bg: Color,
    /// Primary foreground text
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// Accent color (headings, active tab)
    pub cyan: Color,
    /// Success / OK status
    pub green: Color,
    /// Warning status
    pub yellow: Color,
    /// Error status
    pub red: Color,
    /// Characters typed correctly
    pub typed_ok: Color,
    /// Characters typed wrong
    pub typed_bad: Color,
    /// Characters still to type
    pub untyped: Color,
    /// Log entries produced by synthetic events
    pub synthetic: Color,
}

impl ThemeColors {
    /// Create a color palette for the given theme variant
    pub fn from_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::dark(),
            Theme::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb(22, 22, 30),
            fg: Color::Rgb(200, 200, 210),
            dim: Color::Rgb(90, 90, 110),
            cyan: Color::Rgb(80, 200, 220),
            green: Color::Rgb(80, 200, 120),
            yellow: Color::Rgb(240, 180, 80),
            red: Color::Rgb(240, 90, 100),
            typed_ok: Color::Rgb(80, 200, 120),
            typed_bad: Color::Rgb(240, 90, 100),
            untyped: Color::Rgb(120, 120, 140),
            synthetic: Color::Rgb(190, 140, 240),
        }
    }

    /// High contrast for bright terminals
    pub fn light() -> Self {
        Self {
            bg: Color::Rgb(245, 245, 248),
            fg: Color::Rgb(30, 30, 40),
            dim: Color::Rgb(130, 130, 150),
            cyan: Color::Rgb(0, 130, 160),
            green: Color::Rgb(30, 150, 70),
            yellow: Color::Rgb(180, 120, 0),
            red: Color::Rgb(200, 50, 60),
            typed_ok: Color::Rgb(30, 150, 70),
            typed_bad: Color::Rgb(200, 50, 60),
            untyped: Color::Rgb(150, 150, 165),
            synthetic: Color::Rgb(120, 60, 180),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_theme_creates_palette() {
        let colors = ThemeColors::dark();
        assert_eq!(colors.bg, Color::Rgb(22, 22, 30));
        assert_eq!(colors.typed_ok, colors.green);
    }

    #[test]
    fn light_theme_creates_palette() {
        let colors = ThemeColors::light();
        assert_eq!(colors.bg, Color::Rgb(245, 245, 248));
        assert_eq!(colors.typed_bad, colors.red);
    }

    #[test]
    fn from_theme_selects_correct_palette() {
        let dark = ThemeColors::from_theme(Theme::Dark);
        let light = ThemeColors::from_theme(Theme::Light);
        assert_ne!(dark.bg, light.bg);
        assert_ne!(dark.synthetic, light.synthetic);
    }
}
