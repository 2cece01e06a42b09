//! Deferred task queue
//!
//! Stands in for the event loop's macrotask timers. Tasks are ordered by due
//! time, then by scheduling order, and may be tagged with the scope that
//! owns them so that deactivating the scope cancels whatever it left pending.

use crate::lifecycle::ScopeId;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Identifies a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

type Task = Box<dyn FnOnce()>;

struct Entry {
    id: TaskId,
    scope: Option<ScopeId>,
    label: &'static str,
    run: Task,
}

/// Pending deferred work
#[derive(Default)]
pub struct Scheduler {
    tasks: BTreeMap<(Instant, u64), Entry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to run once `now + delay` has been reached
    pub fn schedule<F>(&mut self, now: Instant, delay: Duration, scope: Option<ScopeId>, label: &'static str, task: F) -> TaskId
    where
        F: FnOnce() + 'static,
    {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = TaskId(seq);
        log::trace!("schedule {} in {:?}", label, delay);
        self.tasks.insert(
            (now + delay, seq),
            Entry {
                id,
                scope,
                label,
                run: Box::new(task),
            },
        );
        id
    }

    /// Cancel one task. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let key = self
            .tasks
            .iter()
            .find(|(_, entry)| entry.id == id)
            .map(|(key, _)| *key);
        match key {
            Some(key) => self.tasks.remove(&key).is_some(),
            None => false,
        }
    }

    /// Cancel every task owned by `scope`, returning how many were dropped
    pub fn cancel_scope(&mut self, scope: ScopeId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, entry| entry.scope != Some(scope));
        let cancelled = before - self.tasks.len();
        if cancelled > 0 {
            log::trace!("cancelled {} pending task(s) for {:?}", cancelled, scope);
        }
        cancelled
    }

    /// Remove and return the earliest task due at `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<Box<dyn FnOnce()>> {
        let key = *self.tasks.keys().next()?;
        if key.0 > now {
            return None;
        }
        let entry = self.tasks.remove(&key)?;
        log::trace!("run {}", entry.label);
        Some(entry.run)
    }

    /// When the next task becomes due
    pub fn next_due(&self) -> Option<Instant> {
        self.tasks.keys().next().map(|(at, _)| *at)
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn pending_for(&self, scope: ScopeId) -> usize {
        self.tasks.values().filter(|entry| entry.scope == Some(scope)).count()
    }
}

/// Run every task due at `now`, including tasks scheduled by tasks that ran.
///
/// The scheduler is not borrowed while a task runs. Returns the number of
/// tasks executed.
pub fn run_due(scheduler: &RefCell<Scheduler>, now: Instant) -> usize {
    let mut ran = 0;
    loop {
        let task = scheduler.borrow_mut().pop_due(now);
        match task {
            Some(task) => {
                task();
                ran += 1;
            }
            None => break,
        }
    }
    ran
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn runs_in_due_order_then_schedule_order() {
        let t0 = Instant::now();
        let scheduler = RefCell::new(Scheduler::new());
        let order = Rc::new(RefCell::new(Vec::new()));

        for (delay, name) in [(60, "focus"), (0, "clear-1"), (0, "clear-2")] {
            let o = Rc::clone(&order);
            scheduler
                .borrow_mut()
                .schedule(t0, ms(delay), None, name, move || o.borrow_mut().push(name));
        }

        assert_eq!(run_due(&scheduler, t0), 2);
        assert_eq!(*order.borrow(), vec!["clear-1", "clear-2"]);
        assert_eq!(run_due(&scheduler, t0 + ms(59)), 0);
        assert_eq!(run_due(&scheduler, t0 + ms(60)), 1);
        assert_eq!(scheduler.borrow().pending(), 0);
    }

    #[test]
    fn cancel_scope_drops_only_that_scope() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let a = ScopeId::new(1);
        let b = ScopeId::new(2);
        scheduler.schedule(t0, ms(0), Some(a), "a", || {});
        scheduler.schedule(t0, ms(10), Some(a), "a", || {});
        scheduler.schedule(t0, ms(0), Some(b), "b", || {});

        assert_eq!(scheduler.cancel_scope(a), 2);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.pending_for(b), 1);
    }

    #[test]
    fn cancel_single_task() {
        let t0 = Instant::now();
        let scheduler = RefCell::new(Scheduler::new());
        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        let id = scheduler.borrow_mut().schedule(t0, ms(5), None, "t", move || r.set(true));

        assert!(scheduler.borrow_mut().cancel(id));
        assert!(!scheduler.borrow_mut().cancel(id));
        run_due(&scheduler, t0 + ms(10));
        assert!(!ran.get());
    }

    #[test]
    fn tasks_can_schedule_more_tasks() {
        let t0 = Instant::now();
        let scheduler = Rc::new(RefCell::new(Scheduler::new()));
        let count = Rc::new(Cell::new(0));

        let inner_sched = Rc::clone(&scheduler);
        let c = Rc::clone(&count);
        scheduler.borrow_mut().schedule(t0, ms(0), None, "outer", move || {
            c.set(c.get() + 1);
            let c2 = Rc::clone(&c);
            inner_sched
                .borrow_mut()
                .schedule(t0, ms(0), None, "inner", move || c2.set(c2.get() + 1));
        });

        assert_eq!(run_due(&scheduler, t0), 2);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn next_due_reports_earliest() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        assert_eq!(scheduler.next_due(), None);
        scheduler.schedule(t0, ms(60), None, "focus", || {});
        scheduler.schedule(t0, ms(0), None, "clear", || {});
        assert_eq!(scheduler.next_due(), Some(t0));
    }
}
