//! `Hot<T>` / `HotInput<T>`: a source that produces
//! events regardless of subscribers; late subscribers miss prior events (modulo replay). Grounded
//! on `enso-frp`'s `Source<Out>` (`nodes.rs`): a root node with no parent, constructed once and
//! then driven externally — here split into a read-only `Hot<T>` (for handing to consumers who
//! should only attach operators) and a `HotInput<T>` (for the owner who drives it).

use crate::event::{ReplayPolicy, StreamType, Termination, Value};
use crate::node::{Label, Stream};
use crate::services::SharedDispatcher;
use crate::support::CloneRef;

/// A Hot source, handed to consumers that should only chain operators off it, never push
/// values directly. Produces events regardless of whether anyone is attached; a Hot source is
/// marked `persistent` so an empty downstream list never self-terminates it.
#[derive(Debug)]
pub struct Hot<T: Value> {
    stream: Stream<T>,
}

impl<T: Value> Clone for Hot<T> {
    fn clone(&self) -> Self {
        self.clone_ref()
    }
}

impl<T: Value> CloneRef for Hot<T> {
    fn clone_ref(&self) -> Self {
        Self { stream: self.stream.clone_ref() }
    }
}

impl<T: Value> std::ops::Deref for Hot<T> {
    type Target = Stream<T>;
    fn deref(&self) -> &Self::Target {
        &self.stream
    }
}

impl<T: Value> Hot<T> {
    /// A fresh Hot source with no replay: late subscribers observe nothing already emitted.
    pub fn new(label: impl Into<Label>) -> Self {
        Self::new_with_replay(label, ReplayPolicy::None)
    }

    /// A Hot source with an explicit replay policy (e.g. `Last(n)` to give late subscribers a
    /// recent-history catch-up).
    pub fn new_with_replay(label: impl Into<Label>, replay_policy: ReplayPolicy) -> Self {
        let stream = Stream::new_root(label, replay_policy);
        stream.persist();
        stream.set_stream_type(StreamType::Hot);
        Self { stream }
    }

    /// A view onto the underlying `Stream<T>`, for code that needs the bare handle (e.g. to pass
    /// to `merge`/`zip`/`combine`, which take `&Stream<T>`).
    pub fn as_stream(&self) -> &Stream<T> {
        &self.stream
    }
}

/// The owner-side handle to a Hot source: same underlying node as the `Hot<T>` handed to
/// consumers, but additionally exposing `push`/`terminate`.
#[derive(Debug)]
pub struct HotInput<T: Value> {
    stream: Stream<T>,
}

impl<T: Value> Clone for HotInput<T> {
    fn clone(&self) -> Self {
        self.clone_ref()
    }
}

impl<T: Value> CloneRef for HotInput<T> {
    fn clone_ref(&self) -> Self {
        Self { stream: self.stream.clone_ref() }
    }
}

impl<T: Value> std::ops::Deref for HotInput<T> {
    type Target = Stream<T>;
    fn deref(&self) -> &Self::Target {
        &self.stream
    }
}

impl<T: Value> HotInput<T> {
    /// A fresh Hot source together with its push handle.
    pub fn new(label: impl Into<Label>) -> Self {
        Self::new_with_replay(label, ReplayPolicy::None)
    }

    /// Same as `new`, with an explicit replay policy.
    pub fn new_with_replay(label: impl Into<Label>, replay_policy: ReplayPolicy) -> Self {
        let stream = Stream::new_root(label, replay_policy);
        stream.persist();
        stream.set_stream_type(StreamType::Hot);
        Self { stream }
    }

    /// Same as `new`, with an explicit dispatcher (used by tests and by callers wiring in their
    /// own executor).
    pub fn new_with_dispatch(label: impl Into<Label>, replay_policy: ReplayPolicy, dispatch: SharedDispatcher) -> Self {
        let stream = Stream::new_root_with_dispatch(label, replay_policy, dispatch);
        stream.persist();
        stream.set_stream_type(StreamType::Hot);
        Self { stream }
    }

    /// Pushes a value into the source.
    pub fn push(&self, value: T) {
        self.stream.emit(value);
    }

    /// Terminates the source (idempotent, "terminate(reason)").
    pub fn terminate(&self, reason: Termination) {
        self.stream.terminate(reason);
    }

    /// A read-only `Hot<T>` handle sharing the same underlying node, to hand to consumers that
    /// should only attach operators.
    pub fn reader(&self) -> Hot<T> {
        Hot { stream: self.stream.clone_ref() }
    }

    /// A view onto the underlying `Stream<T>`.
    pub fn as_stream(&self) -> &Stream<T> {
        &self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::StreamOps as _;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn hot_reports_its_stream_type() {
        let input = HotInput::<i32>::new("input");
        assert_eq!(input.stream_type(), StreamType::Hot);
        assert_eq!(input.reader().stream_type(), StreamType::Hot);
        assert_eq!(Hot::<i32>::new("plain").stream_type(), StreamType::Hot);
    }

    #[test]
    fn hot_input_drives_its_reader() {
        let input = HotInput::<i32>::new("input");
        let reader = input.reader();
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        reader.on("collect", move |v| log2.borrow_mut().push(*v));
        input.push(1);
        input.push(2);
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn hot_survives_its_last_child_terminating() {
        let input = HotInput::<i32>::new("input");
        let reader = input.reader();
        let sink = reader.on("sink", |_| {});
        sink.terminate(crate::event::Termination::Completed);
        assert!(input.is_active());
        input.push(1);
        assert!(input.is_active());
    }
}
