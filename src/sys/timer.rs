//! One-shot timers and user idle tracking.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::common::collections::{BTreeMap, HashMap};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(pub u64);

pub trait TimerService {
    /// Arms a one-shot timer. When it fires the owner is handed the returned
    /// handle back.
    fn after(&mut self, delay: Duration) -> TimerHandle;

    /// Cancelling a handle that already fired or was cancelled is a no-op.
    fn cancel(&mut self, handle: TimerHandle);

    /// How long it has been since the last user input.
    fn idle_time(&self) -> Duration;

    /// Report the next user input once. Replaces an earlier watch.
    fn watch_user_active(&mut self);

    fn unwatch_user_active(&mut self);
}

struct IdleInner {
    last_input: Cell<Instant>,
    watching: Cell<bool>,
    on_active: Box<dyn Fn()>,
}

/// Tracks the time of the last user input and reports the first input after
/// a watch was requested.
#[derive(Clone)]
pub struct IdleClock(Rc<IdleInner>);

impl IdleClock {
    pub fn new(on_active: impl Fn() + 'static) -> Self {
        IdleClock(Rc::new(IdleInner {
            last_input: Cell::new(Instant::now()),
            watching: Cell::new(false),
            on_active: Box::new(on_active),
        }))
    }

    pub fn note_input(&self) {
        self.0.last_input.set(Instant::now());
        if self.0.watching.replace(false) {
            trace!("user became active");
            (self.0.on_active)();
        }
    }

    pub fn idle_time(&self) -> Duration { self.0.last_input.get().elapsed() }

    fn watch(&self, enabled: bool) { self.0.watching.set(enabled) }
}

/// Timers backed by tasks on the current `tokio::task::LocalSet`.
pub struct TokioTimers {
    next: u64,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
    on_fire: Rc<dyn Fn(TimerHandle)>,
    idle: IdleClock,
}

impl TokioTimers {
    pub fn new(idle: IdleClock, on_fire: impl Fn(TimerHandle) + 'static) -> Self {
        TokioTimers {
            next: 1,
            tasks: HashMap::default(),
            on_fire: Rc::new(on_fire),
            idle,
        }
    }
}

impl TimerService for TokioTimers {
    fn after(&mut self, delay: Duration) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());
        let handle = TimerHandle(self.next);
        self.next += 1;
        let on_fire = Rc::clone(&self.on_fire);
        let task = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            on_fire(handle);
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }

    fn idle_time(&self) -> Duration { self.idle.idle_time() }

    fn watch_user_active(&mut self) { self.idle.watch(true) }

    fn unwatch_user_active(&mut self) { self.idle.watch(false) }
}

#[derive(Debug, Default)]
struct ManualState {
    next: u64,
    armed: BTreeMap<TimerHandle, Duration>,
    idle: Duration,
    watching: bool,
}

/// Timers that never fire on their own. Whoever holds a clone decides when a
/// timer fires by feeding its handle back to the reactor. Used for replay and
/// tests.
#[derive(Debug, Clone, Default)]
pub struct ManualTimers(Rc<RefCell<ManualState>>);

impl ManualTimers {
    pub fn new() -> Self { Self::default() }

    /// Armed timers, oldest first, with the delay they were armed for.
    pub fn armed(&self) -> Vec<(TimerHandle, Duration)> {
        self.0.borrow().armed.iter().map(|(h, d)| (*h, *d)).collect()
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool { self.0.borrow().armed.contains_key(&handle) }

    /// Marks `handle` as fired so it is no longer reported as armed.
    pub fn fire(&self, handle: TimerHandle) -> bool { self.0.borrow_mut().armed.remove(&handle).is_some() }

    pub fn set_idle_time(&self, idle: Duration) { self.0.borrow_mut().idle = idle }

    pub fn is_watching(&self) -> bool { self.0.borrow().watching }
}

impl TimerService for ManualTimers {
    fn after(&mut self, delay: Duration) -> TimerHandle {
        let mut state = self.0.borrow_mut();
        state.next += 1;
        let handle = TimerHandle(state.next);
        state.armed.insert(handle, delay);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) { self.0.borrow_mut().armed.remove(&handle); }

    fn idle_time(&self) -> Duration { self.0.borrow().idle }

    fn watch_user_active(&mut self) { self.0.borrow_mut().watching = true }

    fn unwatch_user_active(&mut self) { self.0.borrow_mut().watching = false }
}
