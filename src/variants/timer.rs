//! `Timer`: a repeating source of `()` values driven by an injected `TimerFactory`.
//! Grounded on `enso-frp`'s weak-reference scheduling idiom (`stream::WeakNode`, `stream.rs`) —
//! the same technique `crate::ops::lifetime`'s `using`/`life_of` use — so a scheduled tick never
//! keeps the `Timer` itself alive past its last strong reference.

use crate::event::{StreamType, Termination};
use crate::node::{Label, Stream};
use crate::prelude::*;
use crate::services::{SharedTimerFactory, TimerFactory};
use std::time::Duration;

struct TimerState {
    stream: Stream<()>,
    factory: SharedTimerFactory,
    interval: Cell<Duration>,
    token: RefCell<Option<crate::services::TimerToken>>,
    is_timer_active: Cell<bool>,
}

impl Debug for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerState")
            .field("stream", &self.stream)
            .field("is_timer_active", &self.is_timer_active.get())
            .finish()
    }
}

impl Drop for TimerState {
    fn drop(&mut self) {
        if let Some(token) = self.token.borrow_mut().take() {
            self.factory.cancel(token);
        }
    }
}

/// A repeating `()` source. Cheap to clone — every clone shares the same schedule and
/// underlying stream.
#[derive(Debug)]
pub struct Timer {
    inner: Rc<TimerState>,
}

impl Clone for Timer {
    fn clone(&self) -> Self {
        self.clone_ref()
    }
}

impl CloneRef for Timer {
    fn clone_ref(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl std::ops::Deref for Timer {
    type Target = Stream<()>;
    fn deref(&self) -> &Self::Target {
        &self.inner.stream
    }
}

impl Timer {
    /// A fresh, not-yet-started Timer ticking every `interval` once started, using `factory` to
    /// schedule.
    pub fn new(label: impl Into<Label>, interval: Duration, factory: SharedTimerFactory) -> Self {
        let stream = Stream::new_root(label, default());
        stream.set_stream_type(StreamType::Hot);
        stream.persist();
        Self {
            inner: Rc::new(TimerState {
                stream,
                factory,
                interval: Cell::new(interval),
                token: RefCell::new(None),
                is_timer_active: Cell::new(false),
            }),
        }
    }

    /// A view onto the underlying `Stream<()>`.
    pub fn as_stream(&self) -> &Stream<()> {
        &self.inner.stream
    }

    /// `isTimerActive`: true iff a tick is currently scheduled (distinct from `is_active()`,
    /// which only reflects whether the stream itself has terminated — `stop()` leaves
    /// `is_active() == true`, `is_timer_active() == false`).
    pub fn is_timer_active(&self) -> bool {
        self.inner.is_timer_active.get()
    }

    fn fire_once(&self) {
        if self.inner.stream.is_active() {
            self.inner.stream.emit(());
        }
    }

    /// `start(delay_first=true)`: idempotent; a no-op if already running. If `delay_first` is
    /// false, one tick fires synchronously before the recurring schedule begins.
    pub fn start(&self, delay_first: bool) {
        if self.inner.token.borrow().is_some() {
            return;
        }
        if !delay_first {
            self.fire_once();
        }
        let weak = Rc::downgrade(&self.inner);
        let token = self.inner.factory.schedule(
            self.inner.interval.get(),
            true,
            Rc::new(move || {
                if let Some(state) = weak.upgrade() {
                    if state.stream.is_active() {
                        state.stream.emit(());
                    }
                }
            }),
        );
        *self.inner.token.borrow_mut() = Some(token);
        self.inner.is_timer_active.set(true);
    }

    /// `stop()`: cancels the schedule; the stream stays active and resumable via `start`.
    pub fn stop(&self) {
        if let Some(token) = self.inner.token.borrow_mut().take() {
            self.inner.factory.cancel(token);
        }
        self.inner.is_timer_active.set(false);
    }

    /// `restart(interval)`: `stop()`, adopt the new interval, `start(true)`.
    pub fn restart(&self, interval: Duration) {
        self.stop();
        self.inner.interval.set(interval);
        self.start(true);
    }

    /// `terminate(reason)`: stops the schedule and terminates the underlying stream.
    pub fn terminate(&self, reason: Termination) {
        self.stop();
        self.inner.stream.terminate(reason);
    }

    /// `count()` convenience: `as_stream().count(label)`.
    pub fn count(&self, label: impl Into<Label>) -> Stream<usize> {
        self.inner.stream.count(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::StreamOps as _;
    use crate::services::ManualTimerFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn start_is_idempotent_across_repeated_calls() {
        let factory = Rc::new(ManualTimerFactory::new());
        let timer = Timer::new("t", Duration::from_millis(100), factory.clone());
        let counts = timer.count("count");
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        counts.on("collect", move |n| log2.borrow_mut().push(*n));

        timer.start(true);
        timer.start(true);
        timer.start(true);
        factory.fire_all();

        assert_eq!(*log.borrow(), vec![1]);
        assert!(timer.is_timer_active());
    }

    #[test]
    fn stop_cancels_schedule_but_keeps_stream_active() {
        let factory = Rc::new(ManualTimerFactory::new());
        let timer = Timer::new("t", Duration::from_millis(100), factory.clone());
        timer.start(true);
        timer.stop();
        factory.fire_all();

        assert!(timer.is_active());
        assert!(!timer.is_timer_active());
    }

    #[test]
    fn terminate_stops_and_terminates() {
        let factory = Rc::new(ManualTimerFactory::new());
        let timer = Timer::new("t", Duration::from_millis(100), factory.clone());
        timer.start(true);
        timer.terminate(Termination::Cancelled);

        assert!(timer.is_terminated());
        assert!(!timer.is_timer_active());
    }

    #[test]
    fn delay_first_false_fires_synchronously_before_schedule() {
        let factory = Rc::new(ManualTimerFactory::new());
        let timer = Timer::new("t", Duration::from_millis(100), factory.clone());
        let counts = timer.count("count");
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        counts.on("collect", move |n| log2.borrow_mut().push(*n));

        timer.start(false);
        assert_eq!(*log.borrow(), vec![1]);
        factory.fire_all();
        assert_eq!(*log.borrow(), vec![1, 2]);
    }
}
