//! Composition and soft-keyboard bridge
//!
//! On touch devices the platform's keydown events carry no character (IME
//! sentinel 229 / "Unidentified"). Text arrives instead through a hidden
//! proxy input as composition and input events. The bridge turns that text
//! into synthetic key events, one per character, and filters the native
//! keydowns that duplicate them.

use crate::config::{MobileConfig, TimingConfig};
use crate::context::RuntimeContext;
use crate::keyboard::{KeyPhase, LogicalKeyEvent, SuppressionRegistry, SyntheticKey};
use crate::lifecycle::{EventTarget, HostEvent, KeyListener, ScopeId};
use crate::scheduler::Scheduler;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

/// Element id the host gives the proxy input
pub const PROXY_ELEMENT_ID: &str = "typing-listener";

/// A flex container holding a phrase lays out its own focus targets
const FLEX_CLASS: &str = "flex";
const PHRASE_CLASS: &str = "phrase";

/// Attributes the host applies to the proxy input
pub const PROXY_ATTRIBUTES: &[(&str, &str)] = &[
    ("type", "text"),
    ("autocomplete", "off"),
    ("autocapitalize", "off"),
    ("autocorrect", "off"),
    ("spellcheck", "false"),
    ("tabindex", "-1"),
    ("aria-hidden", "true"),
];

/// Inline style keeping the proxy input off-screen and non-interactive
pub const PROXY_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("opacity", "0"),
    ("pointer-events", "none"),
    ("width", "1px"),
    ("height", "1px"),
    ("top", "0"),
    ("left", "-9999px"),
    ("z-index", "-1"),
];

/// Input type reported for backward deletion
pub const DELETE_BACKWARD: &str = "deleteContentBackward";

/// Hidden text input that captures IME and soft-keyboard text.
///
/// Created once and never destroyed; its value is cleared between uses.
/// The host mirrors this state onto the real element.
pub struct ProxyInput {
    target: EventTarget,
    value: RefCell<String>,
    attached: Cell<bool>,
    focused: Cell<bool>,
    focus_requests: Cell<u32>,
}

impl ProxyInput {
    pub fn new() -> Self {
        Self {
            target: EventTarget::new("proxy-input"),
            value: RefCell::new(String::new()),
            attached: Cell::new(false),
            focused: Cell::new(false),
            focus_requests: Cell::new(0),
        }
    }

    /// Listeners registered on the proxy element
    pub fn target(&self) -> &EventTarget {
        &self.target
    }

    /// Attach to the document body
    pub fn attach(&self) {
        if !self.attached.replace(true) {
            log::debug!("attached #{}", PROXY_ELEMENT_ID);
        }
    }

    /// Record that the host detached the element
    pub fn detach(&self) {
        self.attached.set(false);
        self.focused.set(false);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub fn value(&self) -> String {
        self.value.borrow().clone()
    }

    pub fn set_value(&self, value: &str) {
        value.clone_into(&mut self.value.borrow_mut());
    }

    pub fn clear(&self) {
        self.value.borrow_mut().clear();
    }

    /// Focus the element. Ignored while detached.
    pub fn focus(&self) {
        if !self.attached.get() {
            return;
        }
        self.focused.set(true);
        self.focus_requests.set(self.focus_requests.get() + 1);
    }

    pub fn blur(&self) {
        self.focused.set(false);
    }

    pub fn is_focused(&self) -> bool {
        self.focused.get()
    }

    /// Number of focus requests honoured
    pub fn focus_count(&self) -> u32 {
        self.focus_requests.get()
    }
}

impl Default for ProxyInput {
    fn default() -> Self {
        Self::new()
    }
}

/// The element a pointer or touch interaction landed on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerTarget {
    /// Class lists from the target element up to the root
    path: Vec<Vec<String>>,
    /// Classes present somewhere below the target
    descendant_classes: Vec<String>,
}

impl PointerTarget {
    /// Target element with the given classes
    pub fn new(classes: &[&str]) -> Self {
        Self {
            path: vec![to_strings(classes)],
            descendant_classes: Vec::new(),
        }
    }

    /// Add the next ancestor up the tree
    pub fn inside(mut self, classes: &[&str]) -> Self {
        self.path.push(to_strings(classes));
        self
    }

    /// Record classes found among the target's descendants
    pub fn containing(mut self, classes: &[&str]) -> Self {
        self.descendant_classes.extend(to_strings(classes));
        self
    }

    /// The target itself carries `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.path.first().is_some_and(|classes| classes.iter().any(|c| c == class))
    }

    /// The target or one of its ancestors carries `class`
    pub fn closest(&self, class: &str) -> bool {
        self.path.iter().any(|classes| classes.iter().any(|c| c == class))
    }

    pub fn contains(&self, class: &str) -> bool {
        self.descendant_classes.iter().any(|c| c == class)
    }
}

fn to_strings(classes: &[&str]) -> Vec<String> {
    classes.iter().map(|c| c.to_string()).collect()
}

/// Where a pointer interaction may move focus to the proxy input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusRules {
    pub typing_route: String,
    pub surface_class: String,
    pub excluded_classes: Vec<String>,
}

impl FocusRules {
    pub fn from_config(mobile: &MobileConfig) -> Self {
        Self {
            typing_route: mobile.typing_route.clone(),
            surface_class: mobile.typing_surface_class.clone(),
            excluded_classes: mobile.excluded_classes.clone(),
        }
    }

    /// The proxy should take focus after an interaction with `target`.
    ///
    /// Only on the typing route, only inside the typing surface, never inside
    /// an excluded sub-region, and never on a flex container holding a phrase.
    pub fn should_focus(&self, target: Option<&PointerTarget>, route: &str) -> bool {
        let Some(target) = target else {
            return false;
        };
        if !route.contains(&self.typing_route) {
            return false;
        }
        if !target.closest(&self.surface_class) {
            return false;
        }
        if self.excluded_classes.iter().any(|class| target.closest(class)) {
            return false;
        }
        if target.has_class(FLEX_CLASS) && target.contains(PHRASE_CLASS) {
            return false;
        }
        true
    }
}

impl Default for FocusRules {
    fn default() -> Self {
        Self::from_config(&MobileConfig::default())
    }
}

/// Turns proxy-input activity into synthetic keydowns for one scope
pub struct CompositionBridge {
    scope: ScopeId,
    proxy: Rc<ProxyInput>,
    listener: KeyListener,
    scheduler: Rc<RefCell<Scheduler>>,
    context: Rc<RuntimeContext>,
    timing: TimingConfig,
    rules: FocusRules,
    composing: Cell<bool>,
    suppression: RefCell<SuppressionRegistry>,
}

impl CompositionBridge {
    pub fn new(
        scope: ScopeId,
        proxy: Rc<ProxyInput>,
        listener: KeyListener,
        scheduler: Rc<RefCell<Scheduler>>,
        context: Rc<RuntimeContext>,
        timing: TimingConfig,
        rules: FocusRules,
    ) -> Self {
        Self {
            scope,
            proxy,
            listener,
            scheduler,
            context,
            timing,
            rules,
            composing: Cell::new(false),
            suppression: RefCell::new(SuppressionRegistry::new(timing.suppression_window())),
        }
    }

    /// Route a host event to the matching handler
    pub fn handle(&self, event: &HostEvent, now: Instant) {
        match event {
            HostEvent::CompositionStart => self.on_composition_start(),
            HostEvent::CompositionEnd { data } => self.on_composition_end(data.as_deref(), now),
            HostEvent::Input { input_type, data } => self.on_input(input_type, data.as_deref(), now),
            HostEvent::Pointer { target, .. } => self.on_pointer(target.as_ref(), now),
            HostEvent::Key(key) => self.on_native_key(key),
        }
    }

    pub fn is_composing(&self) -> bool {
        self.composing.get()
    }

    pub fn on_composition_start(&self) {
        self.composing.set(true);
    }

    /// Dispatch every composed character in order, then clear the proxy
    pub fn on_composition_end(&self, data: Option<&str>, now: Instant) {
        self.composing.set(false);
        if let Some(text) = data.filter(|text| !text.is_empty()) {
            for ch in text.chars() {
                self.dispatch_synthetic(SyntheticKey::from_char(ch), now);
            }
        }
        self.proxy.clear();
    }

    /// Handle an input event outside of a composition
    pub fn on_input(&self, input_type: &str, data: Option<&str>, now: Instant) {
        if self.composing.get() {
            return;
        }

        if input_type == DELETE_BACKWARD {
            self.dispatch_synthetic(SyntheticKey::backspace(), now);
            self.proxy.clear();
            return;
        }

        let ch = self
            .proxy
            .value()
            .chars()
            .last()
            .or_else(|| data.and_then(|d| d.chars().last()));
        let Some(ch) = ch else {
            self.proxy.clear();
            return;
        };

        self.dispatch_synthetic(SyntheticKey::from_char(ch), now);

        let proxy = Rc::clone(&self.proxy);
        self.scheduler.borrow_mut().schedule(
            now,
            self.timing.clear_delay(),
            Some(self.scope),
            "clear proxy input",
            move || proxy.clear(),
        );
    }

    /// Request proxy focus shortly after an interaction on the typing surface
    pub fn on_pointer(&self, target: Option<&PointerTarget>, now: Instant) {
        if !self.rules.should_focus(target, &self.context.route()) {
            return;
        }
        let proxy = Rc::clone(&self.proxy);
        self.scheduler.borrow_mut().schedule(
            now,
            self.timing.focus_delay(),
            Some(self.scope),
            "focus proxy input",
            move || proxy.focus(),
        );
    }

    /// Forward a native keydown unless it duplicates a synthetic one
    pub fn on_native_key(&self, event: &LogicalKeyEvent) {
        let suppressed = self
            .suppression
            .borrow_mut()
            .should_suppress(&event.key, event.timestamp);
        if suppressed {
            return;
        }
        (self.listener)(event);
    }

    fn dispatch_synthetic(&self, key: SyntheticKey, now: Instant) {
        {
            let mut suppression = self.suppression.borrow_mut();
            suppression.purge_expired(now);
            suppression.mark(&key.key, now);
        }
        let event = key.build(KeyPhase::Down, now);
        (self.listener)(&event);
    }

    /// Suppressed native keydowns so far
    pub fn suppressed_count(&self) -> u64 {
        self.suppression.borrow().suppressed_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::SourceType;
    use crate::scheduler::run_due;
    use crate::shortcut::ShortcutMap;
    use crate::test_helpers::down_at;
    use std::time::Duration;

    struct Fixture {
        bridge: CompositionBridge,
        proxy: Rc<ProxyInput>,
        scheduler: Rc<RefCell<Scheduler>>,
        context: Rc<RuntimeContext>,
        received: Rc<RefCell<Vec<LogicalKeyEvent>>>,
    }

    fn fixture() -> Fixture {
        let proxy = Rc::new(ProxyInput::new());
        proxy.attach();
        let scheduler = Rc::new(RefCell::new(Scheduler::new()));
        let context = Rc::new(RuntimeContext::new(ShortcutMap::defaults(), true));
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        let listener: KeyListener = Rc::new(move |event: &LogicalKeyEvent| sink.borrow_mut().push(event.clone()));
        let bridge = CompositionBridge::new(
            ScopeId::new(1),
            Rc::clone(&proxy),
            listener,
            Rc::clone(&scheduler),
            Rc::clone(&context),
            TimingConfig::default(),
            FocusRules::default(),
        );
        Fixture {
            bridge,
            proxy,
            scheduler,
            context,
            received,
        }
    }

    fn keys(f: &Fixture) -> Vec<String> {
        f.received.borrow().iter().map(|e| e.key.clone()).collect()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn composition_end_dispatches_each_character_in_order() {
        let f = fixture();
        let now = Instant::now();
        f.bridge.on_composition_start();
        f.proxy.set_value("hello");
        f.bridge.on_composition_end(Some("hello"), now);

        assert_eq!(keys(&f), vec!["h", "e", "l", "l", "o"]);
        assert!(f.received.borrow().iter().all(|e| e.source == SourceType::Synthetic));
        assert_eq!(f.proxy.value(), "");
        assert!(!f.bridge.is_composing());
    }

    #[test]
    fn empty_composition_only_clears() {
        let f = fixture();
        f.proxy.set_value("x");
        f.bridge.on_composition_end(Some(""), Instant::now());
        f.bridge.on_composition_end(None, Instant::now());
        assert!(f.received.borrow().is_empty());
        assert_eq!(f.proxy.value(), "");
    }

    #[test]
    fn input_is_ignored_while_composing() {
        let f = fixture();
        f.bridge.on_composition_start();
        f.proxy.set_value("n");
        f.bridge.on_input("insertCompositionText", Some("n"), Instant::now());
        assert!(f.received.borrow().is_empty());
        assert_eq!(f.proxy.value(), "n");
    }

    #[test]
    fn input_dispatches_last_character_and_clears_later() {
        let f = fixture();
        let now = Instant::now();
        f.proxy.set_value("ab");
        f.bridge.on_input("insertText", Some("b"), now);

        assert_eq!(keys(&f), vec!["b"]);
        assert_eq!(f.proxy.value(), "ab");
        assert_eq!(run_due(&f.scheduler, now), 1);
        assert_eq!(f.proxy.value(), "");
    }

    #[test]
    fn input_falls_back_to_event_data() {
        let f = fixture();
        f.bridge.on_input("insertText", Some("xy"), Instant::now());
        assert_eq!(keys(&f), vec!["y"]);
    }

    #[test]
    fn input_without_character_clears_without_dispatch() {
        let f = fixture();
        f.bridge.on_input("insertText", None, Instant::now());
        assert!(f.received.borrow().is_empty());
        assert_eq!(f.scheduler.borrow().pending(), 0);
    }

    #[test]
    fn delete_backward_always_yields_backspace() {
        let f = fixture();
        for value in ["", "abc"] {
            f.proxy.set_value(value);
            f.bridge.on_input(DELETE_BACKWARD, None, Instant::now());
            assert_eq!(f.proxy.value(), "");
        }
        let received = f.received.borrow();
        assert_eq!(received.len(), 2);
        assert!(received.iter().all(|e| e.key == "Backspace" && e.key_code.as_u32() == 8));
    }

    #[test]
    fn native_duplicate_is_suppressed_once() {
        let f = fixture();
        let t0 = Instant::now();
        f.proxy.set_value("a");
        f.bridge.on_input("insertText", Some("a"), t0);

        f.bridge.on_native_key(&down_at('a', t0 + ms(30)));
        f.bridge.on_native_key(&down_at('a', t0 + ms(40)));

        let received = f.received.borrow();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].source, SourceType::Synthetic);
        assert_eq!(received[1].source, SourceType::Physical);
        assert_eq!(f.bridge.suppressed_count(), 1);
    }

    #[test]
    fn native_key_after_window_is_delivered() {
        let f = fixture();
        let t0 = Instant::now();
        f.bridge.on_composition_end(Some("a"), t0);
        f.bridge.on_native_key(&down_at('a', t0 + ms(150)));
        assert_eq!(f.received.borrow().len(), 2);
        assert_eq!(f.bridge.suppressed_count(), 0);
    }

    #[test]
    fn pointer_on_typing_surface_focuses_after_delay() {
        let f = fixture();
        f.context.set_route("/practice/words");
        let t0 = Instant::now();
        let target = PointerTarget::new(&["letter"]).inside(&["typing-word"]);
        f.bridge.on_pointer(Some(&target), t0);

        assert_eq!(run_due(&f.scheduler, t0 + ms(59)), 0);
        assert!(!f.proxy.is_focused());
        assert_eq!(run_due(&f.scheduler, t0 + ms(60)), 1);
        assert!(f.proxy.is_focused());
    }

    #[test]
    fn focus_rules() {
        let rules = FocusRules::default();
        let surface = PointerTarget::new(&["typing-word"]);
        assert!(rules.should_focus(Some(&surface), "/practice"));
        assert!(!rules.should_focus(Some(&surface), "/dict"));
        assert!(!rules.should_focus(None, "/practice"));
        assert!(!rules.should_focus(Some(&PointerTarget::new(&["other"])), "/practice"));

        let in_sentence = PointerTarget::new(&["word"]).inside(&["sentence"]).inside(&["typing-word"]);
        assert!(!rules.should_focus(Some(&in_sentence), "/practice"));

        let in_phrase = PointerTarget::new(&["phrase"]).inside(&["typing-word"]);
        assert!(!rules.should_focus(Some(&in_phrase), "/practice"));

        let flex_with_phrase = PointerTarget::new(&["flex"]).inside(&["typing-word"]).containing(&["phrase"]);
        assert!(!rules.should_focus(Some(&flex_with_phrase), "/practice"));

        let flex_plain = PointerTarget::new(&["flex"]).inside(&["typing-word"]);
        assert!(rules.should_focus(Some(&flex_plain), "/practice"));

        let flex_with_sentence = PointerTarget::new(&["flex"]).inside(&["typing-word"]).containing(&["sentence"]);
        assert!(rules.should_focus(Some(&flex_with_sentence), "/practice"));
    }

    #[test]
    fn detached_proxy_ignores_focus() {
        let proxy = ProxyInput::new();
        proxy.focus();
        assert!(!proxy.is_focused());
        proxy.attach();
        proxy.focus();
        assert!(proxy.is_focused());
        assert_eq!(proxy.focus_count(), 1);
        proxy.detach();
        assert!(!proxy.is_focused());
    }

    #[test]
    fn space_in_composition_uses_space_code() {
        let f = fixture();
        f.bridge.on_composition_end(Some("a b"), Instant::now());
        let received = f.received.borrow();
        assert_eq!(received[1].code, "Space");
        assert_eq!(received[1].key_code.as_u32(), 32);
    }
}
