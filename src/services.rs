//! The injected services the core calls out to: `Dispatcher`, `Clock`,
//! `TimerFactory`, `UuidGen`. The core and operator library only ever depend on these traits;
//! everything in this module past the trait definitions is a concrete implementation usable out
//! of the box, analogous to how `enso-frp`'s FRP network is handed a concrete `web::Closure`-based
//! scheduler by its embedding application (`io/mouse.rs`, `io/keyboard.rs`) while staying generic
//! over the scheduling mechanism in its core.

use crate::prelude::*;
use shrinkwraprs::Shrinkwrap;
use std::time::Duration;
use std::time::Instant;

// ==================
// === Dispatcher ===
// ==================

/// Executes work items, optionally after a delay. All mutation of a stream graph's state happens
/// only on its dispatcher.
pub trait Dispatcher: Debug {
    /// Schedules `f` to run as soon as possible.
    fn execute(&self, f: Box<dyn FnOnce()>);
    /// Schedules `f` to run after `delay`.
    fn after(&self, delay: Duration, f: Box<dyn FnOnce()>);
}

/// A dispatcher that runs everything synchronously and immediately, ignoring any requested delay.
/// This is the crate's default dispatcher and the one used throughout its own test suite, since it
/// makes dispatcher-dependent behavior (delay, async map) deterministic without a real executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateDispatcher;

impl Dispatcher for ImmediateDispatcher {
    fn execute(&self, f: Box<dyn FnOnce()>) {
        f()
    }

    fn after(&self, _delay: Duration, f: Box<dyn FnOnce()>) {
        f()
    }
}

/// A cloneable handle to any `Dispatcher` implementation, inherited by every node from its parent
/// at attach time.
pub type SharedDispatcher = Rc<dyn Dispatcher>;

/// Constructs the default `SharedDispatcher` (an `ImmediateDispatcher`).
pub fn default_dispatcher() -> SharedDispatcher {
    Rc::new(ImmediateDispatcher)
}

// =============
// === Clock ===
// =============

/// The wall-clock provider used by `timeStamp()` and the duration-based `window` operator.
pub trait Clock: Debug {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// `Clock` backed by `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A `Clock` test double whose time only advances when explicitly told to, so
/// `window(duration)`/`timeStamp()` tests are deterministic.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self { base: Instant::now(), offset: Rc::new(Cell::new(Duration::default())) }
    }
}

impl ManualClock {
    /// A fresh manual clock starting at "time zero".
    pub fn new() -> Self {
        default()
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.offset.set(self.offset.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

/// A cloneable handle to any `Clock` implementation.
pub type SharedClock = Rc<dyn Clock>;

// ====================
// === TimerFactory ===
// ====================

/// A token identifying a scheduled, cancellable timer. Derives `Shrinkwrap` so
/// `TimerFactory` implementations can key their own maps by the raw `u64` without this crate
/// exposing a separate accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Shrinkwrap, derive_more::Display)]
pub struct TimerToken(u64);

/// Schedules and cancels periodic or one-shot callbacks. Out of scope, beyond this
/// injectable interface and a couple of concrete implementations.
pub trait TimerFactory: Debug {
    /// Schedules `fire` to run every `interval` (if `repeating`) or once (if not), returning a
    /// token that can later be passed to `cancel`.
    fn schedule(&self, interval: Duration, repeating: bool, fire: Rc<dyn Fn()>) -> TimerToken;
    /// Cancels a previously scheduled timer. A no-op if the token is unknown or already cancelled.
    fn cancel(&self, token: TimerToken);
}

/// A cloneable handle to any `TimerFactory` implementation.
pub type SharedTimerFactory = Rc<dyn TimerFactory>;

/// A `TimerFactory` test double: nothing fires on its own. Tests call `fire_all` (or `fire`)
/// explicitly to simulate a tick, which keeps `Timer` tests deterministic and independent of wall
/// time.
#[derive(Debug, Default)]
pub struct ManualTimerFactory {
    next_token: Cell<u64>,
    timers: RefCell<HashMap<u64, ManualTimerEntry>>,
}

struct ManualTimerEntry {
    repeating: bool,
    cancelled: bool,
    fire: Rc<dyn Fn()>,
}

impl Debug for ManualTimerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTimerEntry")
            .field("repeating", &self.repeating)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

impl ManualTimerFactory {
    /// A fresh manual timer factory with no scheduled timers.
    pub fn new() -> Self {
        default()
    }

    /// Simulates one tick of every still-scheduled, non-repeating-exhausted timer.
    pub fn fire_all(&self) {
        let tokens: Vec<u64> = self.timers.borrow().keys().copied().collect();
        for token in tokens {
            self.fire(TimerToken(token));
        }
    }

    /// Simulates one tick of the timer identified by `token`, if it is still scheduled.
    pub fn fire(&self, token: TimerToken) {
        let (fire, repeating, cancelled) = match self.timers.borrow().get(&token.0) {
            Some(entry) => (entry.fire.clone(), entry.repeating, entry.cancelled),
            None => return,
        };
        if cancelled {
            return;
        }
        if !repeating {
            self.timers.borrow_mut().remove(&token.0);
        }
        fire();
    }
}

impl TimerFactory for ManualTimerFactory {
    fn schedule(&self, _interval: Duration, repeating: bool, fire: Rc<dyn Fn()>) -> TimerToken {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        self.timers.borrow_mut().insert(token, ManualTimerEntry { repeating, cancelled: false, fire });
        TimerToken(token)
    }

    fn cancel(&self, token: TimerToken) {
        if let Some(entry) = self.timers.borrow_mut().get_mut(&token.0) {
            entry.cancelled = true;
        }
    }
}

/// A real, thread-backed `TimerFactory`: each scheduled timer owns a background thread that
/// sleeps for `interval` and re-posts `fire` until cancelled. No external scheduling crate is
/// needed for this; `std::thread`/`std::sync::mpsc` are sufficient for a thin injected interface
/// with a small default implementation.
#[derive(Debug, Default)]
pub struct ThreadTimerFactory {
    next_token: Cell<u64>,
    cancels: RefCell<HashMap<u64, std::sync::mpsc::Sender<()>>>,
}

impl ThreadTimerFactory {
    /// A fresh thread-backed timer factory.
    pub fn new() -> Self {
        default()
    }
}

impl TimerFactory for ThreadTimerFactory {
    fn schedule(&self, interval: Duration, repeating: bool, fire: Rc<dyn Fn()>) -> TimerToken {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        self.cancels.borrow_mut().insert(token, tx);
        std::thread::spawn(move || loop {
            match rx.recv_timeout(interval) {
                Ok(()) | Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => return,
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    fire();
                    if !repeating {
                        return;
                    }
                }
            }
        });
        TimerToken(token)
    }

    fn cancel(&self, token: TimerToken) {
        if let Some(tx) = self.cancels.borrow_mut().remove(&token.0) {
            let _ = tx.send(());
        }
    }
}

// ===============
// === UuidGen ===
// ===============

use crate::event::RequestId;

/// Generates fresh request identifiers for Cold requests.
pub trait UuidGen: Debug {
    /// A freshly generated id, guaranteed unique for the lifetime of the process (modulo UUID
    /// collision, which this crate treats as negligible).
    fn new_id(&self) -> RequestId;
}

/// `UuidGen` backed by `uuid::Uuid::new_v4()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomUuidGen;

impl UuidGen for RandomUuidGen {
    fn new_id(&self) -> RequestId {
        RequestId::from_uuid(uuid::Uuid::new_v4())
    }
}

/// A cloneable handle to any `UuidGen` implementation.
pub type SharedUuidGen = Rc<dyn UuidGen>;

/// Constructs the default `SharedUuidGen` (`RandomUuidGen`).
pub fn default_uuid_gen() -> SharedUuidGen {
    Rc::new(RandomUuidGen)
}

/// A `UuidGen` test double producing deterministic, incrementing ids.
#[derive(Debug, Default)]
pub struct SequentialUuidGen {
    next: Cell<u128>,
}

impl SequentialUuidGen {
    /// A fresh generator starting from id 0.
    pub fn new() -> Self {
        default()
    }
}

impl UuidGen for SequentialUuidGen {
    fn new_id(&self) -> RequestId {
        let n = self.next.get();
        self.next.set(n + 1);
        RequestId::from_uuid(uuid::Uuid::from_u128(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn manual_timer_fires_only_when_told() {
        let factory = ManualTimerFactory::new();
        let fired = Rc::new(Cell::new(0));
        let f2 = fired.clone();
        let token = factory.schedule(Duration::from_secs(1), true, Rc::new(move || f2.set(f2.get() + 1)));
        assert_eq!(fired.get(), 0);
        factory.fire(token);
        factory.fire(token);
        assert_eq!(fired.get(), 2);
        factory.cancel(token);
        factory.fire(token);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn manual_clock_only_advances_explicitly() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);
        clock.advance(Duration::from_secs(1));
        assert!(clock.now() > t0);
    }

    #[test]
    fn sequential_uuid_gen_never_repeats() {
        let gen = SequentialUuidGen::new();
        let a = gen.new_id();
        let b = gen.new_id();
        assert_ne!(a, b);
    }
}
