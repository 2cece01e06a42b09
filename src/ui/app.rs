//! Main application state and logic

use crate::bus::BusEvent;
use crate::config::{Config, Theme};
use crate::context::CurrentWord;
use crate::keyboard::LogicalKeyEvent;
use crate::lifecycle::{LifecycleError, ListenerManager, ScopeId};
use crate::ui::ThemeColors;
use chrono::Local;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

/// Entries kept in the publication log
const LOG_CAPACITY: usize = 200;

/// Current view/tab in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Practice,
    Shortcuts,
    Help,
}

impl AppView {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Practice => "Practice",
            Self::Shortcuts => "Shortcuts",
            Self::Help => "Help",
        }
    }

    pub fn all() -> &'static [AppView] {
        &[Self::Practice, Self::Shortcuts, Self::Help]
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Practice => 0,
            Self::Shortcuts => 1,
            Self::Help => 2,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Practice,
            1 => Self::Shortcuts,
            _ => Self::Help,
        }
    }
}

/// Application running state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Running,
    Quitting,
}

/// One bus publication as shown in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Wall-clock time the publication was seen
    pub time: String,
    pub topic: String,
    pub key: String,
    pub synthetic: bool,
}

/// Main application
pub struct App {
    /// Current view
    pub view: AppView,
    /// Application state
    pub state: AppState,
    /// Configuration
    pub config: Config,
    /// Listener scopes, bus and runtime context
    pub manager: ListenerManager,
    scope: ScopeId,
    /// Publications waiting to be applied to the practice state
    inbox: Rc<RefCell<VecDeque<BusEvent>>>,
    words: Vec<String>,
    word_index: usize,
    /// What has been typed for the current word
    pub input: String,
    /// Words completed this session
    pub completed: u32,
    /// Recent publications, newest last
    pub log: VecDeque<LogEntry>,
    /// Application start time
    pub start_time: Instant,
    /// Total publications processed
    pub total_events: u64,
    /// Last status message
    pub status_message: Option<String>,
    /// Status message timestamp
    pub status_time: Option<Instant>,
}

impl App {
    pub fn new(config: Config) -> Result<Self, LifecycleError> {
        let manager = ListenerManager::from_config(&config, "");
        let scope = manager.mount_keyboard("playground")?;

        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        let sink = Rc::clone(&inbox);
        let observer = manager.bus().observe(move |event| sink.borrow_mut().push_back(event.clone()));
        let bus = Rc::clone(manager.bus());
        manager.on_deactivate(scope, move || {
            bus.unobserve(observer);
            Ok(())
        })?;

        let mut words = config.ui.practice_words.clone();
        if words.is_empty() {
            words.push("keyboard".to_string());
        }

        let app = Self {
            view: AppView::Practice,
            state: AppState::Running,
            config,
            manager,
            scope,
            inbox,
            words,
            word_index: 0,
            input: String::new(),
            completed: 0,
            log: VecDeque::new(),
            start_time: Instant::now(),
            total_events: 0,
            status_message: None,
            status_time: None,
        };
        app.sync_word();
        Ok(app)
    }

    pub fn colors(&self) -> ThemeColors {
        ThemeColors::from_theme(self.config.ui.theme)
    }

    /// The word being practised
    pub fn word(&self) -> &str {
        &self.words[self.word_index]
    }

    pub fn is_listening(&self) -> bool {
        self.manager.context().is_listening()
    }

    /// Deliver a native key event and apply whatever it published
    pub fn handle_key(&mut self, event: LogicalKeyEvent) {
        self.manager.deliver_key(event);
        self.drain();
    }

    /// Run deferred work due at `now`
    pub fn tick(&mut self, now: Instant) {
        if self.manager.run_due(now) > 0 {
            self.drain();
        }
    }

    fn drain(&mut self) {
        loop {
            let event = self.inbox.borrow_mut().pop_front();
            match event {
                Some(event) => self.apply(&event),
                None => break,
            }
        }
    }

    fn apply(&mut self, event: &BusEvent) {
        self.total_events += 1;
        let key = event.key_event();
        self.log.push_back(LogEntry {
            time: Local::now().format("%H:%M:%S%.3f").to_string(),
            topic: event.topic().name().to_string(),
            key: key.key.clone(),
            synthetic: key.is_synthetic(),
        });
        while self.log.len() > LOG_CAPACITY {
            self.log.pop_front();
        }

        match event {
            BusEvent::Typing(key) => self.type_key(key),
            BusEvent::KeyDown(key) if key.key == "Backspace" => {
                self.input.pop();
                self.sync_word();
            }
            BusEvent::Shortcut { action, .. } => self.run_action(action),
            _ => {}
        }
    }

    fn type_key(&mut self, key: &LogicalKeyEvent) {
        match key.character() {
            Some(ch) => self.input.push(ch),
            None if key.is_space() => self.input.push(' '),
            None => return,
        }
        if self.input == self.word() {
            self.completed += 1;
            self.set_status(format!("Completed \"{}\"", self.word()));
            self.advance(1);
        } else {
            self.sync_word();
        }
    }

    fn run_action(&mut self, action: &str) {
        match action {
            "Next" => self.advance(1),
            "Previous" => self.advance(self.words.len() - 1),
            "ShowWord" => self.set_status(format!("Word: {}", self.word())),
            "ToggleTheme" => {
                self.config.ui.theme = match self.config.ui.theme {
                    Theme::Dark => Theme::Light,
                    Theme::Light => Theme::Dark,
                };
            }
            other => self.set_status(format!("Shortcut: {}", other)),
        }
    }

    fn advance(&mut self, step: usize) {
        self.word_index = (self.word_index + step) % self.words.len();
        self.input.clear();
        self.sync_word();
    }

    /// Publish the current word so that Space is classified correctly
    fn sync_word(&self) {
        self.manager
            .context()
            .set_current_word(Some(CurrentWord::new(self.word(), self.input.as_str())));
    }

    /// Enable or disable keyboard dispatch
    pub fn toggle_listening(&mut self) {
        let listening = self.is_listening();
        self.manager.context().set_listening_disabled(listening);
        self.set_status(if listening { "Listening disabled" } else { "Listening enabled" }.to_string());
    }

    /// Switch to the next view
    pub fn next_view(&mut self) {
        let next = (self.view.index() + 1) % AppView::all().len();
        self.view = AppView::from_index(next);
    }

    /// Request quit and release every listener
    pub fn quit(&mut self) {
        self.manager.deactivate(self.scope);
        self.state = AppState::Quitting;
    }

    /// Set a status message
    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_time = Some(Instant::now());
    }

    /// Get status message if still valid (within 3 seconds)
    pub fn get_status(&self) -> Option<&str> {
        match (&self.status_message, self.status_time) {
            (Some(msg), Some(time)) if time.elapsed().as_secs() < 3 => Some(msg),
            _ => None,
        }
    }

    /// Get elapsed time formatted
    pub fn elapsed_formatted(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}
