//! Scoped listener registration and teardown
//!
//! A scope is one activation of a component. Every listener and
//! subscription added while it is active records a teardown closure;
//! deactivating the scope runs them newest-first and cancels whatever
//! deferred work the scope left pending. Deactivating twice is a no-op.
//!
//! The manager also owns the host-facing event targets: the window, which
//! receives native key and pointer events, and the hidden proxy input,
//! which receives composition and input events on touch devices.

use crate::bridge::{CompositionBridge, FocusRules, PointerTarget, ProxyInput};
use crate::bus::{EventBus, Topic};
use crate::config::{Config, TimingConfig};
use crate::context::RuntimeContext;
use crate::dispatch::DispatchCore;
use crate::keyboard::{KeyPhase, LogicalKeyEvent};
use crate::scheduler::{self, Scheduler};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;
use thiserror::Error;

/// Identifies one activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Handler for logical key events
pub type KeyListener = Rc<dyn Fn(&LogicalKeyEvent)>;

/// Errors from registering against a scope
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// The scope was never activated or has already been deactivated
    #[error("{0} is not active")]
    InactiveScope(ScopeId),
}

/// Errors raised by individual teardown closures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TeardownError {
    /// The listener was removed from its target before teardown ran
    #[error("listener {id} already removed from {target}")]
    ListenerMissing { target: &'static str, id: ListenerId },
    /// The bus subscription was removed before teardown ran
    #[error("subscription on '{topic}' already removed")]
    SubscriptionMissing { topic: String },
}

/// Kinds of host event a listener can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    KeyDown,
    KeyUp,
    CompositionStart,
    CompositionEnd,
    Input,
    PointerDown,
    TouchStart,
}

impl HostEventKind {
    pub fn for_phase(phase: KeyPhase) -> Self {
        match phase {
            KeyPhase::Down => HostEventKind::KeyDown,
            KeyPhase::Up => HostEventKind::KeyUp,
        }
    }
}

/// Pointer interactions that may move focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    PointerDown,
    TouchStart,
}

/// An event delivered by the host
#[derive(Debug, Clone)]
pub enum HostEvent {
    Key(LogicalKeyEvent),
    CompositionStart,
    CompositionEnd { data: Option<String> },
    Input { input_type: String, data: Option<String> },
    Pointer { kind: PointerKind, target: Option<PointerTarget> },
}

impl HostEvent {
    pub fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::Key(event) => HostEventKind::for_phase(event.phase),
            HostEvent::CompositionStart => HostEventKind::CompositionStart,
            HostEvent::CompositionEnd { .. } => HostEventKind::CompositionEnd,
            HostEvent::Input { .. } => HostEventKind::Input,
            HostEvent::Pointer { kind: PointerKind::PointerDown, .. } => HostEventKind::PointerDown,
            HostEvent::Pointer { kind: PointerKind::TouchStart, .. } => HostEventKind::TouchStart,
        }
    }
}

/// Identifies a listener on an [`EventTarget`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handler registered on an [`EventTarget`]
pub type HostListener = Rc<dyn Fn(&HostEvent, Instant)>;

/// Something host events are dispatched to
pub struct EventTarget {
    name: &'static str,
    listeners: RefCell<Vec<(ListenerId, HostEventKind, HostListener)>>,
    next_id: Cell<u64>,
}

impl EventTarget {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn add_listener(&self, kind: HostEventKind, listener: HostListener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, kind, listener));
        id
    }

    /// Returns false if the listener was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _, _)| *existing != id);
        listeners.len() != before
    }

    /// Call every listener for the event's kind, in registration order.
    ///
    /// Listeners may add or remove listeners while running. Added listeners
    /// wait for the next dispatch; removed ones are skipped immediately.
    /// Returns the number of listeners called.
    pub fn dispatch(&self, event: &HostEvent, now: Instant) -> usize {
        let kind = event.kind();
        let snapshot: Vec<(ListenerId, HostListener)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(id, _, listener)| (*id, Rc::clone(listener)))
            .collect();
        let mut called = 0;
        for (id, listener) in &snapshot {
            if !self.is_registered(*id) {
                continue;
            }
            listener(event, now);
            called += 1;
        }
        called
    }

    fn is_registered(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|(existing, _, _)| *existing == id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn listeners_for(&self, kind: HostEventKind) -> usize {
        self.listeners.borrow().iter().filter(|(_, k, _)| *k == kind).count()
    }
}

/// Teardown closure recorded against a scope
pub type Teardown = Box<dyn FnOnce() -> Result<(), TeardownError>>;

/// Outcome of tearing a scope down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Closures executed
    pub ran: usize,
    /// Closures that reported an error
    pub failed: usize,
}

/// Teardown closures owned by one scope
pub struct ListenerRegistration {
    scope: ScopeId,
    label: String,
    teardowns: Vec<Teardown>,
}

impl ListenerRegistration {
    pub fn new(scope: ScopeId, label: impl Into<String>) -> Self {
        Self {
            scope,
            label: label.into(),
            teardowns: Vec::new(),
        }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn push<F>(&mut self, teardown: F)
    where
        F: FnOnce() -> Result<(), TeardownError> + 'static,
    {
        self.teardowns.push(Box::new(teardown));
    }

    pub fn len(&self) -> usize {
        self.teardowns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teardowns.is_empty()
    }

    /// Run every closure, newest first.
    ///
    /// A failing closure is logged and the rest still run. The list is
    /// drained, so a second call does nothing.
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        while let Some(teardown) = self.teardowns.pop() {
            report.ran += 1;
            if let Err(e) = teardown() {
                report.failed += 1;
                log::warn!("teardown for {} ({}) failed: {}", self.scope, self.label, e);
            }
        }
        report
    }
}

fn remove_listener_teardown(target: Rc<EventTarget>, id: ListenerId) -> Teardown {
    Box::new(move || {
        if target.remove_listener(id) {
            Ok(())
        } else {
            Err(TeardownError::ListenerMissing {
                target: target.name(),
                id,
            })
        }
    })
}

/// Owns scopes, the host event targets and the deferred-work queue
pub struct ListenerManager {
    context: Rc<RuntimeContext>,
    bus: Rc<EventBus>,
    scheduler: Rc<RefCell<Scheduler>>,
    window: Rc<EventTarget>,
    proxy: RefCell<Option<Rc<ProxyInput>>>,
    scopes: RefCell<BTreeMap<ScopeId, ListenerRegistration>>,
    next_scope: Cell<u64>,
    timing: TimingConfig,
    focus_rules: FocusRules,
}

impl ListenerManager {
    pub fn new(context: Rc<RuntimeContext>, bus: Rc<EventBus>, config: &Config) -> Self {
        Self {
            context,
            bus,
            scheduler: Rc::new(RefCell::new(Scheduler::new())),
            window: Rc::new(EventTarget::new("window")),
            proxy: RefCell::new(None),
            scopes: RefCell::new(BTreeMap::new()),
            next_scope: Cell::new(1),
            timing: config.timing,
            focus_rules: FocusRules::from_config(&config.mobile),
        }
    }

    /// Build the runtime context and a fresh bus from `config`
    pub fn from_config(config: &Config, user_agent: &str) -> Self {
        let context = Rc::new(RuntimeContext::from_config(config, user_agent));
        Self::new(context, Rc::new(EventBus::new()), config)
    }

    pub fn context(&self) -> &Rc<RuntimeContext> {
        &self.context
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn window(&self) -> &Rc<EventTarget> {
        &self.window
    }

    pub fn scheduler(&self) -> &Rc<RefCell<Scheduler>> {
        &self.scheduler
    }

    /// The proxy input, if a touch listener has created it
    pub fn proxy(&self) -> Option<Rc<ProxyInput>> {
        self.proxy.borrow().clone()
    }

    /// A dispatch core wired to this manager's context and bus
    pub fn dispatch_core(&self) -> Rc<DispatchCore> {
        Rc::new(DispatchCore::new(Rc::clone(&self.context), Rc::clone(&self.bus)))
    }

    /// Start a new scope
    pub fn activate(&self, label: &str) -> ScopeId {
        let scope = ScopeId::new(self.next_scope.get());
        self.next_scope.set(self.next_scope.get() + 1);
        self.scopes
            .borrow_mut()
            .insert(scope, ListenerRegistration::new(scope, label));
        log::debug!("activated {} ({})", scope, label);
        scope
    }

    pub fn is_active(&self, scope: ScopeId) -> bool {
        self.scopes.borrow().contains_key(&scope)
    }

    pub fn active_scopes(&self) -> usize {
        self.scopes.borrow().len()
    }

    /// Teardown closures currently recorded for `scope`
    pub fn teardown_count(&self, scope: ScopeId) -> usize {
        self.scopes.borrow().get(&scope).map_or(0, ListenerRegistration::len)
    }

    /// Record extra teardown work for `scope`
    pub fn on_deactivate<F>(&self, scope: ScopeId, teardown: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Result<(), TeardownError> + 'static,
    {
        self.record(scope, vec![Box::new(teardown) as Teardown])
    }

    fn record(&self, scope: ScopeId, teardowns: Vec<Teardown>) -> Result<(), LifecycleError> {
        let mut scopes = self.scopes.borrow_mut();
        let registration = scopes.get_mut(&scope).ok_or(LifecycleError::InactiveScope(scope))?;
        for teardown in teardowns {
            registration.teardowns.push(teardown);
        }
        Ok(())
    }

    fn ensure_active(&self, scope: ScopeId) -> Result<(), LifecycleError> {
        if self.is_active(scope) {
            Ok(())
        } else {
            Err(LifecycleError::InactiveScope(scope))
        }
    }

    /// Create the proxy input on first use and attach it if detached
    fn ensure_proxy(&self) -> Rc<ProxyInput> {
        let proxy = Rc::clone(
            self.proxy
                .borrow_mut()
                .get_or_insert_with(|| Rc::new(ProxyInput::new())),
        );
        proxy.attach();
        proxy
    }

    /// Register `listener` for key events of `phase` for the life of `scope`.
    ///
    /// On touch devices a keydown listener is wrapped in a composition
    /// bridge fed by the proxy input; otherwise it goes straight on the
    /// window.
    pub fn use_event_listener(&self, scope: ScopeId, phase: KeyPhase, listener: KeyListener) -> Result<(), LifecycleError> {
        self.ensure_active(scope)?;

        if self.context.is_touch() && phase == KeyPhase::Down {
            return self.use_bridge(scope, listener);
        }

        let id = self.window.add_listener(
            HostEventKind::for_phase(phase),
            Rc::new(move |event: &HostEvent, _: Instant| {
                if let HostEvent::Key(key) = event {
                    listener(key);
                }
            }),
        );
        self.record(scope, vec![remove_listener_teardown(Rc::clone(&self.window), id)])
    }

    fn use_bridge(&self, scope: ScopeId, listener: KeyListener) -> Result<(), LifecycleError> {
        let proxy = self.ensure_proxy();
        let bridge = Rc::new(CompositionBridge::new(
            scope,
            Rc::clone(&proxy),
            listener,
            Rc::clone(&self.scheduler),
            Rc::clone(&self.context),
            self.timing,
            self.focus_rules.clone(),
        ));

        let proxy_target = Rc::new(ProxyTarget(Rc::clone(&proxy)));
        let mut teardowns = Vec::new();
        for kind in [
            HostEventKind::CompositionStart,
            HostEventKind::CompositionEnd,
            HostEventKind::Input,
        ] {
            let handler = Rc::clone(&bridge);
            let id = proxy
                .target()
                .add_listener(kind, Rc::new(move |event: &HostEvent, now: Instant| handler.handle(event, now)));
            let target = Rc::clone(&proxy_target);
            teardowns.push(Box::new(move || target.remove(id)) as Teardown);
        }
        for kind in [
            HostEventKind::PointerDown,
            HostEventKind::TouchStart,
            HostEventKind::KeyDown,
        ] {
            let handler = Rc::clone(&bridge);
            let id = self
                .window
                .add_listener(kind, Rc::new(move |event: &HostEvent, now: Instant| handler.handle(event, now)));
            teardowns.push(remove_listener_teardown(Rc::clone(&self.window), id));
        }
        teardowns.push(Box::new(move || {
            proxy.clear();
            Ok::<(), TeardownError>(())
        }));

        log::debug!("composition bridge installed for {}", scope);
        self.record(scope, teardowns)
    }

    /// Feed `core`'s keydown and keyup handlers for the life of `scope`
    pub fn start_keyboard(&self, scope: ScopeId, core: Rc<DispatchCore>) -> Result<(), LifecycleError> {
        let down = Rc::clone(&core);
        self.use_event_listener(
            scope,
            KeyPhase::Down,
            Rc::new(move |event: &LogicalKeyEvent| {
                down.on_keydown(event);
            }),
        )?;
        self.use_event_listener(
            scope,
            KeyPhase::Up,
            Rc::new(move |event: &LogicalKeyEvent| {
                core.on_keyup(event);
            }),
        )
    }

    /// Activate a scope that runs this manager's dispatch core
    pub fn mount_keyboard(&self, label: &str) -> Result<ScopeId, LifecycleError> {
        let scope = self.activate(label);
        self.start_keyboard(scope, self.dispatch_core())?;
        Ok(scope)
    }

    /// Subscribe to a bus topic for the life of `scope`
    pub fn subscribe<F>(&self, scope: ScopeId, topic: Topic, handler: F) -> Result<(), LifecycleError>
    where
        F: Fn(&LogicalKeyEvent) + 'static,
    {
        self.ensure_active(scope)?;
        let id = self.bus.subscribe(topic.clone(), move |event| handler(event.key_event()));
        let bus = Rc::clone(&self.bus);
        self.on_deactivate(scope, move || {
            if bus.unsubscribe(&topic, id) {
                Ok(())
            } else {
                Err(TeardownError::SubscriptionMissing {
                    topic: topic.name().to_string(),
                })
            }
        })
    }

    /// Subscribe to raw keydown and keyup publications for the life of `scope`
    pub fn subscribe_keyboard<D, U>(&self, scope: ScopeId, on_keydown: D, on_keyup: U) -> Result<(), LifecycleError>
    where
        D: Fn(&LogicalKeyEvent) + 'static,
        U: Fn(&LogicalKeyEvent) + 'static,
    {
        self.subscribe(scope, Topic::KeyDown, on_keydown)?;
        self.subscribe(scope, Topic::KeyUp, on_keyup)
    }

    /// End `scope`: run its teardowns newest-first and cancel its pending tasks.
    ///
    /// Unknown or already deactivated scopes are ignored.
    pub fn deactivate(&self, scope: ScopeId) -> TeardownReport {
        let registration = self.scopes.borrow_mut().remove(&scope);
        let Some(mut registration) = registration else {
            log::debug!("{} already deactivated", scope);
            return TeardownReport::default();
        };
        let report = registration.teardown();
        let cancelled = self.scheduler.borrow_mut().cancel_scope(scope);
        log::debug!(
            "deactivated {} ({}): {} teardown(s), {} failed, {} task(s) cancelled",
            scope,
            registration.label(),
            report.ran,
            report.failed,
            cancelled
        );
        report
    }

    /// Deliver a native key event to the window.
    ///
    /// Returns true if a listener prevented the default action.
    pub fn deliver_key(&self, event: LogicalKeyEvent) -> bool {
        let now = event.timestamp;
        let event = HostEvent::Key(event);
        self.window.dispatch(&event, now);
        matches!(&event, HostEvent::Key(key) if key.default_prevented())
    }

    pub fn composition_start(&self, now: Instant) -> usize {
        self.dispatch_to_proxy(&HostEvent::CompositionStart, now)
    }

    pub fn composition_end(&self, data: Option<&str>, now: Instant) -> usize {
        self.dispatch_to_proxy(
            &HostEvent::CompositionEnd {
                data: data.map(str::to_string),
            },
            now,
        )
    }

    /// Update the proxy value and deliver the matching input event
    pub fn proxy_input(&self, value: &str, input_type: &str, data: Option<&str>, now: Instant) -> usize {
        let Some(proxy) = self.proxy() else {
            return 0;
        };
        proxy.set_value(value);
        self.dispatch_to_proxy(
            &HostEvent::Input {
                input_type: input_type.to_string(),
                data: data.map(str::to_string),
            },
            now,
        )
    }

    /// Deliver a pointer or touch interaction to the window
    pub fn pointer(&self, kind: PointerKind, target: Option<PointerTarget>, now: Instant) -> usize {
        self.window.dispatch(&HostEvent::Pointer { kind, target }, now)
    }

    /// Run deferred work that is due at `now`
    pub fn run_due(&self, now: Instant) -> usize {
        scheduler::run_due(&self.scheduler, now)
    }

    /// When the next deferred task becomes due
    pub fn next_due(&self) -> Option<Instant> {
        self.scheduler.borrow().next_due()
    }

    fn dispatch_to_proxy(&self, event: &HostEvent, now: Instant) -> usize {
        match self.proxy() {
            Some(proxy) => proxy.target().dispatch(event, now),
            None => 0,
        }
    }
}

/// Removes listeners from the proxy input's target
struct ProxyTarget(Rc<ProxyInput>);

impl ProxyTarget {
    fn remove(&self, id: ListenerId) -> Result<(), TeardownError> {
        if self.0.target().remove_listener(id) {
            Ok(())
        } else {
            Err(TeardownError::ListenerMissing {
                target: self.0.target().name(),
                id,
            })
        }
    }
}
