//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects reactive values and
//! subscribers. It owns all mutable scheduling state, so independent runtimes
//! never interfere with each other.
//!
//! # How It Works
//!
//! 1. While a watcher runs, the runtime's [`ReactiveContext`] names it as the
//!    active subscriber; reactive reads register it with their dependency.
//!
//! 2. When a value changes, its dependency notifies subscribers, which hand
//!    themselves to the runtime's [`UpdateScheduler`].
//!
//! 3. The first queued subscriber schedules one flush on the microtask queue.
//!
//! 4. The host calls [`Runtime::run_microtasks`] once the current synchronous
//!    turn is over. That is the only point where deferred work executes.
//!
//! # Threading
//!
//! Runtimes are single-threaded (`Rc`-based, neither `Send` nor `Sync`).

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use tracing::{debug, warn};

use super::context::ReactiveContext;
use super::scheduler::{TickQueue, UpdateScheduler};
use super::subscriber::Subscriber;
use crate::config::RuntimeConfig;
use crate::error::{ConfigError, RuntimeError};

type Microtask = Box<dyn FnOnce(&Runtime)>;

struct RuntimeInner {
    config: RuntimeConfig,
    context: ReactiveContext,
    scheduler: UpdateScheduler,
    ticks: TickQueue,
    microtasks: RefCell<VecDeque<Microtask>>,
    draining: Cell<bool>,
}

/// Handle to one reactive runtime. Cloning shares the same runtime.
#[derive(Clone)]
pub struct Runtime(Rc<RuntimeInner>);

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::from_valid_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: RuntimeConfig) -> Self {
        Self(Rc::new(RuntimeInner {
            config,
            context: ReactiveContext::new(),
            scheduler: UpdateScheduler::new(),
            ticks: TickQueue::new(),
            microtasks: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
        }))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.0.config
    }

    /// The active-subscriber slot.
    pub fn context(&self) -> &ReactiveContext {
        &self.0.context
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.0.scheduler
    }

    /// Check if a subscriber is currently collecting dependencies.
    pub fn is_tracking(&self) -> bool {
        self.0.context.is_active()
    }

    /// Queue `subscriber` for the next flush, scheduling the flush if needed.
    pub fn queue_subscriber(&self, subscriber: Rc<dyn Subscriber>) {
        if self.0.scheduler.enqueue(subscriber) {
            self.queue_microtask(|runtime| {
                runtime.0.scheduler.flush();
            });
        }
    }

    /// Defer `callback` to the next microtask checkpoint.
    pub fn next_tick<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        if self.0.ticks.push(Box::new(callback)) {
            self.queue_microtask(|runtime| {
                runtime.0.ticks.drain();
            });
        }
    }

    /// Future that resolves to `value` once the current next-tick callbacks
    /// have all run.
    pub fn next_tick_value<T: 'static>(&self, value: T) -> NextTick<T> {
        let state = Rc::new(RefCell::new(TickState {
            value: Some(value),
            ready: None,
            waker: None,
        }));

        let fired = state.clone();
        self.next_tick(move || {
            let mut state = fired.borrow_mut();
            state.ready = state.value.take();
            if let Some(waker) = state.waker.take() {
                waker.wake();
            }
        });

        NextTick { state }
    }

    /// Future that resolves after the next flush point.
    pub fn tick(&self) -> NextTick<()> {
        self.next_tick_value(())
    }

    /// Append a task to the microtask queue.
    pub fn queue_microtask<F>(&self, task: F)
    where
        F: FnOnce(&Runtime) + 'static,
    {
        self.0.microtasks.borrow_mut().push_back(Box::new(task));
    }

    pub fn has_pending_microtasks(&self) -> bool {
        !self.0.microtasks.borrow().is_empty()
    }

    /// Microtask checkpoint: run queued microtasks until none are left.
    ///
    /// Microtasks queued while draining run in the same checkpoint. Returns
    /// the number of microtasks executed. A nested call made from inside a
    /// microtask returns `Ok(0)` and leaves the work to the outer drain.
    pub fn run_microtasks(&self) -> Result<usize, RuntimeError> {
        if self.0.draining.replace(true) {
            warn!("run_microtasks called re-entrantly; ignoring");
            return Ok(0);
        }
        let _reset = DrainReset(&self.0.draining);

        let limit = self.0.config.max_microtask_turns;
        let mut turns = 0;

        loop {
            let task = self.0.microtasks.borrow_mut().pop_front();
            let Some(task) = task else { break };

            if turns == limit {
                // Put it back so the caller can inspect or retry.
                self.0.microtasks.borrow_mut().push_front(task);
                return Err(RuntimeError::UpdateLoop { turns });
            }

            task(self);
            turns += 1;
        }

        if turns > 0 {
            debug!(turns, "microtask checkpoint complete");
        }
        Ok(turns)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.0.config)
            .field("tracking", &self.is_tracking())
            .field("queued_subscribers", &self.0.scheduler.len())
            .field("pending_microtasks", &self.0.microtasks.borrow().len())
            .finish()
    }
}

struct DrainReset<'a>(&'a Cell<bool>);

impl Drop for DrainReset<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct TickState<T> {
    value: Option<T>,
    ready: Option<T>,
    waker: Option<Waker>,
}

/// Future returned by [`Runtime::next_tick_value`].
///
/// Resolves only after the runtime's microtask checkpoint has run the
/// callback queued for it.
pub struct NextTick<T> {
    state: Rc<RefCell<TickState<T>>>,
}

impl<T> NextTick<T> {
    /// Whether the value is available without waiting.
    pub fn is_ready(&self) -> bool {
        self.state.borrow().ready.is_some()
    }
}

impl<T> Future for NextTick<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut state = self.state.borrow_mut();
        match state.ready.take() {
            Some(value) => Poll::Ready(value),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
