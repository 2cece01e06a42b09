//! Custom TUI widgets

use crate::shortcut::ShortcutMap;
use crate::ui::{LogEntry, ThemeColors};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use std::collections::VecDeque;

/// The practice word with the typed input laid over it
pub struct WordPanel<'a> {
    word: &'a str,
    input: &'a str,
    completed: u32,
    colors: ThemeColors,
}

impl<'a> WordPanel<'a> {
    pub fn new(word: &'a str, input: &'a str, completed: u32, colors: ThemeColors) -> Self {
        Self {
            word,
            input,
            completed,
            colors,
        }
    }

    /// One span per character of the word, colored by typing progress
    fn spans(&self) -> Vec<Span<'static>> {
        let typed: Vec<char> = self.input.chars().collect();
        let mut spans: Vec<Span> = self
            .word
            .chars()
            .enumerate()
            .map(|(i, expected)| {
                let (shown, color) = match typed.get(i) {
                    Some(&actual) if actual == expected => (expected, self.colors.typed_ok),
                    Some(&actual) => (if actual == ' ' { '_' } else { actual }, self.colors.typed_bad),
                    None => (expected, self.colors.untyped),
                };
                Span::styled(shown.to_string(), Style::default().fg(color).add_modifier(Modifier::BOLD))
            })
            .collect();
        for &extra in typed.iter().skip(self.word.chars().count()) {
            spans.push(Span::styled(extra.to_string(), Style::default().fg(self.colors.typed_bad)));
        }
        spans
    }
}

impl<'a> Widget for WordPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" Word ({} completed) ", self.completed))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.dim));

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height == 0 {
            return;
        }

        let line = Line::from(self.spans());
        let width = line.width() as u16;
        let x = inner.x + inner.width.saturating_sub(width) / 2;
        let y = inner.y + inner.height / 2;
        buf.set_line(x, y, &line, inner.width);
    }
}

/// Recent bus publications, newest at the bottom
pub struct EventLogPanel<'a> {
    entries: &'a VecDeque<LogEntry>,
    colors: ThemeColors,
}

impl<'a> EventLogPanel<'a> {
    pub fn new(entries: &'a VecDeque<LogEntry>, colors: ThemeColors) -> Self {
        Self { entries, colors }
    }
}

impl<'a> Widget for EventLogPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Publications ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.dim));

        let inner = block.inner(area);
        block.render(area, buf);

        let visible = inner.height as usize;
        let skip = self.entries.len().saturating_sub(visible);
        for (row, entry) in self.entries.iter().skip(skip).enumerate() {
            let topic_color = match entry.topic.as_str() {
                "typing" => self.colors.green,
                "keydown" | "keyup" => self.colors.dim,
                _ => self.colors.yellow,
            };
            let source = if entry.synthetic {
                Span::styled(" synthetic", Style::default().fg(self.colors.synthetic))
            } else {
                Span::raw("")
            };
            let line = Line::from(vec![
                Span::styled(format!("{} ", entry.time), Style::default().fg(self.colors.dim)),
                Span::styled(format!("{:<22}", entry.topic), Style::default().fg(topic_color)),
                Span::styled(format!("{:?}", entry.key), Style::default().fg(self.colors.fg)),
                source,
            ]);
            buf.set_line(inner.x, inner.y + row as u16, &line, inner.width);
        }
    }
}

/// Action bindings in priority order, flagging shadowed ones
pub struct ShortcutsPanel<'a> {
    shortcuts: &'a ShortcutMap,
    colors: ThemeColors,
}

impl<'a> ShortcutsPanel<'a> {
    pub fn new(shortcuts: &'a ShortcutMap, colors: ThemeColors) -> Self {
        Self { shortcuts, colors }
    }
}

impl<'a> Widget for ShortcutsPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Shortcuts ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.cyan));

        let inner = block.inner(area);
        block.render(area, buf);

        let shadowed = self.shortcuts.shadowed();
        for (row, (action, shortcut)) in self.shortcuts.iter().enumerate() {
            if row as u16 >= inner.height {
                break;
            }
            let conflict = shadowed.iter().find(|s| s.action == action);
            let mut spans = vec![
                Span::styled(
                    format!(" {:<16}", shortcut),
                    Style::default().fg(self.colors.cyan).add_modifier(Modifier::BOLD),
                ),
                Span::styled(action.to_string(), Style::default().fg(self.colors.fg)),
            ];
            if let Some(conflict) = conflict {
                spans.push(Span::styled(
                    format!("  (shadowed by {})", conflict.shadowed_by),
                    Style::default().fg(self.colors.red),
                ));
            }
            buf.set_line(inner.x, inner.y + row as u16, &Line::from(spans), inner.width);
        }
    }
}

/// Widget for the help screen
pub struct HelpPanel {
    colors: ThemeColors,
}

impl HelpPanel {
    pub fn new(colors: ThemeColors) -> Self {
        Self { colors }
    }
}

impl Widget for HelpPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title("Help - Typing Input")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.cyan));

        let inner = block.inner(area);
        block.render(area, buf);

        let help_text = [
            "",
            " CONTROLS",
            " -----------",
            " F1               : Switch view",
            " F2               : Enable/disable keyboard listening",
            " Ctrl+C           : Quit",
            "",
            " PRACTICE",
            " -----------",
            " Type the word shown; every other key goes through the shortcut map.",
            " Space is typed when the word expects one, otherwise it may be a shortcut.",
            " Each publication on the bus is listed with its topic and key.",
            "",
            " Bindings are read from config.toml [shortcuts] on startup.",
        ];

        for (i, line) in help_text.iter().enumerate() {
            if i as u16 >= inner.height {
                break;
            }
            let style = if line.contains("---") {
                Style::default().fg(self.colors.dim)
            } else if line.trim().chars().all(|c| c.is_uppercase()) && !line.trim().is_empty() {
                Style::default().fg(self.colors.yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.colors.fg)
            };
            buf.set_string(inner.x, inner.y + i as u16, line, style);
        }
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    listening: bool,
    view: &'a str,
    elapsed: &'a str,
    events: u64,
    message: Option<&'a str>,
    colors: ThemeColors,
}

impl<'a> StatusBar<'a> {
    pub fn new(listening: bool, view: &'a str, elapsed: &'a str, events: u64, colors: ThemeColors) -> Self {
        Self {
            listening,
            view,
            elapsed,
            events,
            message: None,
            colors,
        }
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg_style = Style::default().bg(self.colors.dim).fg(self.colors.bg);
        for x in area.x..area.x + area.width {
            buf.set_string(x, area.y, " ", bg_style);
        }

        let state = if self.listening { "LISTENING" } else { "DISABLED" };
        let left = format!(" {} | {} ", state, self.view);
        buf.set_string(area.x, area.y, &left, bg_style.add_modifier(Modifier::BOLD));

        if let Some(msg) = self.message {
            let msg_style = Style::default().bg(self.colors.dim).fg(self.colors.yellow);
            let msg_x = area.x + (area.width / 2).saturating_sub(msg.len() as u16 / 2);
            buf.set_string(msg_x, area.y, msg, msg_style);
        }

        let right = format!(" {} | Events: {} ", self.elapsed, self.events);
        let right_x = area.x + area.width.saturating_sub(right.len() as u16);
        buf.set_string(right_x, area.y, &right, bg_style);
    }
}

/// Tab bar widget
pub struct TabBar<'a> {
    tabs: &'a [&'a str],
    selected: usize,
    colors: ThemeColors,
}

impl<'a> TabBar<'a> {
    pub fn new(tabs: &'a [&'a str], selected: usize, colors: ThemeColors) -> Self {
        Self { tabs, selected, colors }
    }
}

impl<'a> Widget for TabBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut x = area.x;

        for (i, tab) in self.tabs.iter().enumerate() {
            let style = if i == self.selected {
                Style::default()
                    .fg(self.colors.bg)
                    .bg(self.colors.cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.colors.fg).bg(self.colors.bg)
            };

            let label = format!(" {} ", tab);
            let width = label.len() as u16;

            if x + width <= area.x + area.width {
                buf.set_string(x, area.y, &label, style);
                x += width;

                if i < self.tabs.len() - 1 && x < area.x + area.width {
                    buf.set_string(x, area.y, "|", Style::default().fg(self.colors.dim));
                    x += 1;
                }
            }
        }

        for fill_x in x..area.x + area.width {
            buf.set_string(fill_x, area.y, " ", Style::default().bg(self.colors.bg));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<W: Widget>(widget: W, width: u16, height: u16) -> Buffer {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        buf
    }

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol().to_string()).collect()
    }

    #[test]
    fn word_panel_marks_mistakes() {
        let panel = WordPanel::new("key", "kx", 0, ThemeColors::dark());
        let spans = panel.spans();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].style.fg, Some(ThemeColors::dark().typed_ok));
        assert_eq!(spans[1].content, "x");
        assert_eq!(spans[1].style.fg, Some(ThemeColors::dark().typed_bad));
        assert_eq!(spans[2].style.fg, Some(ThemeColors::dark().untyped));
    }

    #[test]
    fn word_panel_renders_centered() {
        let buf = render(WordPanel::new("abc", "", 2, ThemeColors::dark()), 30, 3);
        assert!(row(&buf, 1).contains("abc"));
        assert!(row(&buf, 0).contains("2 completed"));
    }

    #[test]
    fn shortcuts_panel_flags_shadowed_bindings() {
        let map: ShortcutMap = [("Next", "Ctrl+N"), ("Skip", "Ctrl+N")].into_iter().collect();
        let buf = render(ShortcutsPanel::new(&map, ThemeColors::dark()), 60, 4);
        assert!(row(&buf, 1).contains("Next"));
        assert!(row(&buf, 2).contains("shadowed by Next"));
    }

    #[test]
    fn event_log_shows_newest_entries() {
        let entries: VecDeque<LogEntry> = (0..5)
            .map(|i| LogEntry {
                time: "00:00:00.000".to_string(),
                topic: "typing".to_string(),
                key: i.to_string(),
                synthetic: false,
            })
            .collect();
        let buf = render(EventLogPanel::new(&entries, ThemeColors::dark()), 60, 4);
        assert!(row(&buf, 1).contains("\"3\""));
        assert!(row(&buf, 2).contains("\"4\""));
    }

    #[test]
    fn status_bar_shows_listening_state() {
        let buf = render(StatusBar::new(false, "Practice", "00:01", 3, ThemeColors::dark()), 60, 1);
        assert!(row(&buf, 0).contains("DISABLED"));
        assert!(row(&buf, 0).contains("Events: 3"));
    }
}
