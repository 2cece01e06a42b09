//! Trace replay and report export
//!
//! A trace is a JSON script of host events with millisecond offsets. Replay
//! drives the whole pipeline with a virtual clock, so deferred work and
//! suppression windows behave exactly as they would live, and records every
//! bus publication.
//!
//! ```json
//! {
//!   "touch": true,
//!   "route": "/practice",
//!   "steps": [
//!     { "at_ms": 0, "type": "composition_start" },
//!     { "at_ms": 40, "type": "composition_end", "data": "ni" },
//!     { "at_ms": 60, "type": "key_down", "key": "i" }
//!   ]
//! }
//! ```

use crate::bridge::PointerTarget;
use crate::bus::BusEvent;
use crate::config::Config;
use crate::context::CurrentWord;
use crate::keyboard::{KeyCode, KeyPhase, LogicalKeyEvent, Modifiers, SourceType};
use crate::lifecycle::{LifecycleError, ListenerManager, PointerKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error type for replay operations
#[derive(Debug, Error)]
pub enum ReplayError {
    /// IO error reading a trace or writing a report
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Malformed trace or unserializable report
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Registering the replay scope failed
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// Recorded host event script
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    /// Run as a touch device; ignored when `user_agent` is given
    #[serde(default)]
    pub touch: bool,
    /// User agent to detect the form factor from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Route the host is showing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    pub steps: Vec<Step>,
}

/// One scripted host event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Offset from the start of the trace
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

/// What happens at a step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    KeyDown(KeySpec),
    KeyUp(KeySpec),
    CompositionStart,
    CompositionEnd {
        #[serde(default)]
        data: Option<String>,
    },
    /// Proxy input value change
    Input {
        value: String,
        #[serde(default = "default_input_type")]
        input_type: String,
        #[serde(default)]
        data: Option<String>,
    },
    Pointer {
        #[serde(default)]
        touch: bool,
        /// Class lists from the target element up to the root
        #[serde(default)]
        path: Vec<Vec<String>>,
        /// Classes found below the target
        #[serde(default)]
        contains: Vec<String>,
    },
    SetListening {
        enabled: bool,
    },
    SetWord {
        word: String,
        #[serde(default)]
        input: String,
        #[serde(default)]
        locked: bool,
    },
    ClearWord,
    SetShortcut {
        action: String,
        shortcut: String,
    },
    SetRoute {
        route: String,
    },
    /// Deactivate the replay scope
    Unmount,
}

fn default_input_type() -> String {
    "insertText".to_string()
}

/// Native key event description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeySpec {
    pub key: String,
    /// Physical code; derived from `key` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_code: Option<u32>,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub repeat: bool,
}

impl KeySpec {
    fn modifiers(&self) -> Modifiers {
        Modifiers {
            ctrl: self.ctrl,
            alt: self.alt,
            shift: self.shift,
            meta: self.meta,
        }
    }

    /// Build the physical event, filling in code and key code from the US
    /// layout when they are omitted
    pub fn to_event(&self, phase: KeyPhase, timestamp: Instant) -> LogicalKeyEvent {
        let modifiers = self.modifiers();
        let derived = if self.code.is_none() && self.key_code.is_none() {
            let mut chars = self.key.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => LogicalKeyEvent::physical_char(phase, ch, modifiers, timestamp),
                _ => LogicalKeyEvent::physical_named(phase, &self.key, modifiers, timestamp),
            }
        } else {
            None
        };
        derived
            .unwrap_or_else(|| {
                LogicalKeyEvent::physical(
                    phase,
                    self.key.clone(),
                    self.code.clone().unwrap_or_default(),
                    KeyCode::new(self.key_code.unwrap_or_default()),
                    modifiers,
                    timestamp,
                )
            })
            .with_repeat(self.repeat)
    }
}

impl Trace {
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Single bus publication seen during replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// Offset of the key event from the start of the trace
    pub at_ms: u64,
    /// Topic name ("typing", "keydown", "keyup" or the action name)
    pub topic: String,
    pub key: String,
    pub code: String,
    pub key_code: u32,
    pub synthetic: bool,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report generation timestamp
    pub generated_at: String,
    /// Application version
    pub version: String,
    pub touch: bool,
    pub steps: usize,
}

/// Summary counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub publications: usize,
    pub typing: usize,
    pub shortcuts: usize,
    /// Native keydowns whose default action was prevented
    pub prevented: usize,
    /// Deferred tasks executed
    pub tasks_run: usize,
}

/// Complete replay report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub metadata: ReportMetadata,
    pub summary: ReplaySummary,
    pub publications: Vec<Publication>,
}

impl ReplayReport {
    /// Topic names in publication order
    pub fn topics(&self) -> Vec<&str> {
        self.publications.iter().map(|p| p.topic.as_str()).collect()
    }

    /// Keys published on `topic`, in order
    pub fn keys_on(&self, topic: &str) -> Vec<&str> {
        self.publications
            .iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.key.as_str())
            .collect()
    }

    /// Export report to JSON file
    pub fn export_json(&self, path: &Path) -> Result<(), ReplayError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Export report to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Run `trace` against a fresh pipeline built from `config`
pub fn run(trace: &Trace, config: &Config) -> Result<ReplayReport, ReplayError> {
    let mut config = config.clone();
    if trace.user_agent.is_none() {
        config.mobile.touch_override = Some(trace.touch);
    }
    let manager = ListenerManager::from_config(&config, trace.user_agent.as_deref().unwrap_or_default());
    if let Some(route) = &trace.route {
        manager.context().set_route(route.as_str());
    }

    let start = Instant::now();
    let publications = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&publications);
    manager.bus().observe(move |event| sink.borrow_mut().push(publication(event, start)));

    let scope = manager.mount_keyboard("replay")?;
    let mut summary = ReplaySummary::default();

    for step in &trace.steps {
        let now = start + Duration::from_millis(step.at_ms);
        summary.tasks_run += manager.run_due(now);
        match &step.action {
            Action::KeyDown(spec) => {
                if manager.deliver_key(spec.to_event(KeyPhase::Down, now)) {
                    summary.prevented += 1;
                }
            }
            Action::KeyUp(spec) => {
                manager.deliver_key(spec.to_event(KeyPhase::Up, now));
            }
            Action::CompositionStart => {
                manager.composition_start(now);
            }
            Action::CompositionEnd { data } => {
                manager.composition_end(data.as_deref(), now);
            }
            Action::Input {
                value,
                input_type,
                data,
            } => {
                manager.proxy_input(value, input_type, data.as_deref(), now);
            }
            Action::Pointer { touch, path, contains } => {
                let kind = if *touch { PointerKind::TouchStart } else { PointerKind::PointerDown };
                manager.pointer(kind, pointer_target(path, contains), now);
            }
            Action::SetListening { enabled } => manager.context().set_listening_disabled(!enabled),
            Action::SetWord { word, input, locked } => manager
                .context()
                .set_current_word(Some(CurrentWord::new(word.as_str(), input.as_str()).locked(*locked))),
            Action::ClearWord => manager.context().set_current_word(None),
            Action::SetShortcut { action, shortcut } => manager.context().bind_shortcut(action, shortcut),
            Action::SetRoute { route } => manager.context().set_route(route.as_str()),
            Action::Unmount => {
                manager.deactivate(scope);
            }
        }
    }

    // Drain deferred work left by the last step.
    while let Some(due) = manager.next_due() {
        summary.tasks_run += manager.run_due(due);
    }
    manager.deactivate(scope);

    let publications = publications.take();
    summary.publications = publications.len();
    summary.typing = publications.iter().filter(|p| p.topic == "typing").count();
    summary.shortcuts = publications
        .iter()
        .filter(|p| !matches!(p.topic.as_str(), "typing" | "keydown" | "keyup"))
        .count();

    let now: DateTime<Utc> = Utc::now();
    Ok(ReplayReport {
        metadata: ReportMetadata {
            generated_at: now.to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            touch: manager.context().is_touch(),
            steps: trace.steps.len(),
        },
        summary,
        publications,
    })
}

fn publication(event: &BusEvent, start: Instant) -> Publication {
    let key = event.key_event();
    Publication {
        at_ms: key.timestamp.saturating_duration_since(start).as_millis() as u64,
        topic: event.topic().name().to_string(),
        key: key.key.clone(),
        code: key.code.clone(),
        key_code: key.key_code.as_u32(),
        synthetic: key.source == SourceType::Synthetic,
    }
}

fn as_strs(classes: &[String]) -> Vec<&str> {
    classes.iter().map(String::as_str).collect()
}

fn pointer_target(path: &[Vec<String>], contains: &[String]) -> Option<PointerTarget> {
    let (first, ancestors) = path.split_first()?;
    let mut target = PointerTarget::new(&as_strs(first.as_slice()));
    for classes in ancestors {
        target = target.inside(&as_strs(classes.as_slice()));
    }
    Some(target.containing(&as_strs(contains)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(json: &str) -> ReplayReport {
        let trace = Trace::from_json(json).expect("valid trace");
        run(&trace, &Config::default()).expect("replay")
    }

    #[test]
    fn desktop_typing_and_shortcuts() {
        let report = replay(
            r#"{ "steps": [
                { "at_ms": 0, "type": "key_down", "key": "h" },
                { "at_ms": 5, "type": "key_up", "key": "h" },
                { "at_ms": 10, "type": "key_down", "key": "p", "ctrl": true },
                { "at_ms": 20, "type": "key_down", "key": "ArrowRight" },
                { "at_ms": 30, "type": "key_down", "key": "Backspace" }
            ] }"#,
        );
        assert_eq!(
            report.topics(),
            vec!["typing", "keyup", "PlayWordPronunciation", "Next", "keydown"]
        );
        assert_eq!(report.summary.typing, 1);
        assert_eq!(report.summary.shortcuts, 2);
        assert_eq!(report.summary.prevented, 3);
        assert_eq!(report.publications[2].at_ms, 10);
        assert!(!report.metadata.touch);
    }

    #[test]
    fn touch_composition_with_duplicate_keydown() {
        let report = replay(
            r#"{ "touch": true, "steps": [
                { "at_ms": 0, "type": "key_down", "key": "Unidentified", "code": "", "key_code": 229 },
                { "at_ms": 5, "type": "composition_start" },
                { "at_ms": 40, "type": "composition_end", "data": "ni" },
                { "at_ms": 60, "type": "key_down", "key": "i" },
                { "at_ms": 400, "type": "key_down", "key": "i" }
            ] }"#,
        );
        assert_eq!(report.keys_on("typing"), vec!["n", "i", "i"]);
        assert!(report.publications[0].synthetic);
        assert!(report.publications[1].synthetic);
        assert!(!report.publications[2].synthetic);
        assert_eq!(report.publications[2].at_ms, 400);
    }

    #[test]
    fn soft_keyboard_input_and_backspace() {
        let report = replay(
            r#"{ "user_agent": "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)", "steps": [
                { "at_ms": 0, "type": "input", "value": "a", "data": "a" },
                { "at_ms": 10, "type": "input", "value": "", "input_type": "deleteContentBackward" }
            ] }"#,
        );
        assert!(report.metadata.touch);
        assert_eq!(report.topics(), vec!["typing", "keydown"]);
        assert_eq!(report.publications[1].key, "Backspace");
        assert_eq!(report.summary.tasks_run, 1);
    }

    #[test]
    fn listening_toggle_and_word_state() {
        let report = replay(
            r#"{ "steps": [
                { "at_ms": 0, "type": "set_listening", "enabled": false },
                { "at_ms": 1, "type": "key_down", "key": "a" },
                { "at_ms": 2, "type": "set_listening", "enabled": true },
                { "at_ms": 3, "type": "set_shortcut", "action": "Skip", "shortcut": "" },
                { "at_ms": 4, "type": "key_down", "key": " " },
                { "at_ms": 5, "type": "set_word", "word": "ice cream", "input": "ice" },
                { "at_ms": 6, "type": "key_down", "key": " " }
            ] }"#,
        );
        assert_eq!(report.topics(), vec!["Skip", "typing"]);
    }

    #[test]
    fn unmount_stops_delivery() {
        let report = replay(
            r#"{ "steps": [
                { "at_ms": 0, "type": "key_down", "key": "a" },
                { "at_ms": 1, "type": "unmount" },
                { "at_ms": 2, "type": "key_down", "key": "b" }
            ] }"#,
        );
        assert_eq!(report.keys_on("typing"), vec!["a"]);
    }

    #[test]
    fn pointer_focus_is_reported_as_task() {
        let report = replay(
            r#"{ "touch": true, "route": "/practice", "steps": [
                { "at_ms": 0, "type": "pointer", "touch": true, "path": [["letter"], ["typing-word"]] },
                { "at_ms": 100, "type": "key_up", "key": "a" }
            ] }"#,
        );
        assert_eq!(report.summary.tasks_run, 1);
    }

    #[test]
    fn pointer_target_follows_the_recorded_path() {
        let path = vec![vec!["flex".to_string()], vec!["typing-word".to_string()]];
        let target = pointer_target(&path, &["phrase".to_string()]).expect("non-empty path");
        assert!(target.has_class("flex"));
        assert!(target.closest("typing-word"));
        assert!(target.contains("phrase"));
        assert!(pointer_target(&[], &[]).is_none());

        let report = replay(
            r#"{ "touch": true, "route": "/practice", "steps": [
                { "at_ms": 0, "type": "pointer", "touch": true,
                  "path": [["flex"], ["typing-word"]], "contains": ["phrase"] }
            ] }"#,
        );
        assert_eq!(report.summary.tasks_run, 0);
    }

    #[test]
    fn malformed_trace_is_rejected() {
        assert!(matches!(Trace::from_json("{ \"steps\": 3 }"), Err(ReplayError::Json(_))));
        assert!(matches!(
            Trace::from_json(r#"{ "steps": [ { "at_ms": 0, "type": "teleport" } ] }"#),
            Err(ReplayError::Json(_))
        ));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = replay(r#"{ "steps": [ { "at_ms": 0, "type": "key_down", "key": "a" } ] }"#);
        let json = report.to_json().expect("serialize");
        assert!(json.contains("\"topic\": \"typing\""));
        assert!(json.contains(env!("CARGO_PKG_VERSION")));
    }
}
