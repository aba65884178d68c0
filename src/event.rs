//! The sum types carried through every stream graph. Grounded on `enso-frp`'s
//! `EventData`/`BehaviorData` tagging (`node/class.rs`), generalized from the event/behavior split
//! to the richer active/terminated state machine this engine needs.

use crate::prelude::*;
use shrinkwraprs::Shrinkwrap;
use uuid::Uuid;

// ===========
// === Value ===
// ===========

/// Anything that can travel through the graph as a payload. Grounded on `enso-frp`'s `Data`/
/// `Value` marker traits (`node/class.rs`, `data.rs`): any `'static + Clone + Debug` type qualifies,
/// since events are fanned out to an arbitrary number of children and so must be cheaply
/// shareable.
pub trait Value: Clone + Debug + 'static {}
impl<T: Clone + Debug + 'static> Value for T {}

// ===========
// === Error ===
// ===========

/// The erased error type carried by `Termination::Error`. Generic over every possible user error
/// type would thread an extra type parameter through every node and operator in the crate for a
/// case that, in practice, is always immediately boxed by callers anyway (the same trade-off
/// `Box<dyn Error>`/`anyhow::Error` make) — see DESIGN.md.
pub type Error = Rc<dyn std::error::Error>;

/// Boxes any `std::error::Error` into this crate's erased `Error` type.
pub fn box_error<E: std::error::Error + 'static>(err: E) -> Error {
    Rc::new(err)
}

// =================
// === RequestId ===
// =================

/// A UUID naming a single in-flight Cold request. See `UuidGen` in `crate::services`. Derives
/// `Shrinkwrap` so call sites that just need the raw `Uuid` (e.g. to key a `HashMap`) can deref
/// straight through rather than this crate growing a `.uuid()` accessor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Shrinkwrap, derive_more::Display)]
pub struct RequestId(pub(crate) Uuid);

impl RequestId {
    /// Wraps a raw UUID value (used by `UuidGen` implementations).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

// ================
// === EventKey ===
// ================

/// The routing token carried alongside every event.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// Broadcast: every active child processes the event.
    None,
    /// Routes only to children that inserted `id` into their expected-key set.
    Keyed(RequestId),
    /// Routes to all children, but originally carried an id (a shared Cold response).
    Shared(RequestId),
}

impl Default for EventKey {
    fn default() -> Self {
        EventKey::None
    }
}

// ===================
// === Termination ===
// ===================

/// The absorbing outcome of every stream.
#[derive(Clone, Debug)]
pub enum Termination {
    /// Natural finish.
    Completed,
    /// Explicit external cancellation.
    Cancelled,
    /// Fatal abort with an attached error value.
    Error(Error),
}

impl Termination {
    /// Shorthand constructor for `Termination::Error`.
    pub fn error<E: std::error::Error + 'static>(err: E) -> Self {
        Termination::Error(box_error(err))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Completed => write!(f, "completed"),
            Termination::Cancelled => write!(f, "cancelled"),
            Termination::Error(e) => write!(f, "error({})", e),
        }
    }
}

// ===============
// === Event<T> ===
// ===============

/// A tagged event flowing through the graph.
#[derive(Derivative)]
#[derivative(Clone(bound = "T: Clone"))]
#[derivative(Debug(bound = "T: Debug"))]
pub enum Event<T> {
    /// A produced value.
    Next(T),
    /// An end-of-stream marker.
    Terminate(Termination),
}

impl<T> Event<T> {
    /// True iff this is a `Next` event.
    pub fn is_next(&self) -> bool {
        matches!(self, Event::Next(_))
    }

    /// True iff this is a `Terminate` event.
    pub fn is_terminate(&self) -> bool {
        matches!(self, Event::Terminate(_))
    }

    /// The payload, if this is a `Next` event.
    pub fn next_value(&self) -> Option<&T> {
        match self {
            Event::Next(v) => Some(v),
            Event::Terminate(_) => None,
        }
    }

    /// Maps the payload of a `Next` event, passing `Terminate` through unchanged.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Event<U> {
        match self {
            Event::Next(v) => Event::Next(f(v)),
            Event::Terminate(t) => Event::Terminate(t),
        }
    }
}

// ===================
// === StreamState ===
// ===================

/// The node state machine. Terminal states are absorbing.
#[derive(Clone, Debug)]
pub enum StreamState {
    /// Accepting and forwarding events normally.
    Active,
    /// Temporarily not forwarding events (but not yet terminated).
    Paused,
    /// Absorbing: no further events are accepted or forwarded.
    Terminated(Termination),
}

impl StreamState {
    /// True iff this state is `Terminated`.
    pub fn is_terminated(&self) -> bool {
        matches!(self, StreamState::Terminated(_))
    }

    /// True iff this state is `Active`.
    pub fn is_active(&self) -> bool {
        matches!(self, StreamState::Active)
    }
}

impl Default for StreamState {
    fn default() -> Self {
        StreamState::Active
    }
}

// ==================
// === StreamType ===
// ==================

/// Behavioral category tag. Used by pruning policy and for observability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamType {
    /// Produces events regardless of subscribers.
    Hot,
    /// Produces values only in response to a request.
    Cold,
    /// Emits at most one value before terminating.
    Future,
    /// A plain operator/intermediate node with no variant-specific behavior.
    Base,
}

// ====================
// === ReplayPolicy ===
// ====================

/// Controls what a newly attached child receives synchronously.
#[derive(Clone, Copy, Debug)]
pub enum ReplayPolicy {
    /// Nothing is replayed; the buffer never grows.
    None,
    /// Retain the `n` most recent `Next` events plus a possible terminal event.
    Last(usize),
    /// Retain everything ever emitted.
    All,
}

impl Default for ReplayPolicy {
    fn default() -> Self {
        ReplayPolicy::None
    }
}

// =================
// === ShareMode ===
// =================

/// Per-node Cold response-routing policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareMode {
    /// Responses route only to the branch that originated the request (default).
    Keyed,
    /// Responses broadcast to every child regardless of origination.
    Shared,
    /// Derived substreams inherit the parent's routing verbatim.
    Inherit,
}

impl Default for ShareMode {
    fn default() -> Self {
        ShareMode::Keyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn event_map_passes_terminate_through() {
        let e: Event<i32> = Event::Terminate(Termination::Cancelled);
        let mapped = e.map(|n| n.to_string());
        assert!(mapped.is_terminate());
    }

    #[test]
    fn event_map_transforms_next() {
        let e: Event<i32> = Event::Next(41);
        let mapped = e.map(|n| n + 1);
        assert_eq!(mapped.next_value(), Some(&42));
    }

    #[test]
    fn stream_state_defaults_active() {
        assert!(StreamState::default().is_active());
    }
}
