//! `Future<T>` / `FutureInput<T>`: a stream that emits at most one value before terminating.
//! Grounded on `enso-frp`'s one-shot `Source` construction (`nodes.rs`) layered with this crate's
//! `Result`-carrying completion and `Last(1)` replay so a subscriber attaching after completion
//! still observes the value. Replay here runs synchronously at attach time, the way every other
//! replay-policy consumer in this crate works (`Stream::new_root`'s `connect`-time replay) — a
//! simplification of the more literal "asynchronously, on the next tick" phrasing some reactive
//! designs use for Future delivery; see DESIGN.md.

use crate::event::{Error, ReplayPolicy, StreamType, Termination, Value};
use crate::node::{Label, Stream};
use crate::prelude::*;
use crate::services::{default_dispatcher, SharedDispatcher};

/// A Future source, handed to consumers that should only chain operators off it, never complete it
/// directly.
#[derive(Debug)]
pub struct Future<T: Value> {
    stream: Stream<T>,
}

impl<T: Value> Clone for Future<T> {
    fn clone(&self) -> Self {
        self.clone_ref()
    }
}

impl<T: Value> CloneRef for Future<T> {
    fn clone_ref(&self) -> Self {
        Self { stream: self.stream.clone_ref() }
    }
}

impl<T: Value> std::ops::Deref for Future<T> {
    type Target = Stream<T>;
    fn deref(&self) -> &Self::Target {
        &self.stream
    }
}

fn complete_future<T: Value>(stream: &Stream<T>, result: Result<T, Error>) {
    match result {
        Ok(v) => {
            stream.emit(v);
            stream.terminate(Termination::Completed);
        }
        Err(e) => stream.terminate(Termination::Error(e)),
    }
}

fn run_task<T: Value>(
    stream: Stream<T>,
    dispatch: &SharedDispatcher,
    task: impl FnOnce(Box<dyn FnOnce(Result<T, Error>)>) + 'static,
) {
    dispatch.execute(Box::new(move || {
        let fired = Rc::new(Cell::new(false));
        task(Box::new(move |result| {
            if fired.replace(true) {
                return;
            }
            complete_future(&stream, result);
        }));
    }));
}

impl<T: Value> Future<T> {
    /// Runs `task` (via the default dispatcher), completing the Future with whatever `task` hands
    /// its completion callback. The completion MUST be invoked at most once; further invocations
    /// are ignored.
    pub fn new(
        label: impl Into<Label>,
        task: impl FnOnce(Box<dyn FnOnce(Result<T, Error>)>) + 'static,
    ) -> Self {
        Self::new_with_dispatch(label, default_dispatcher(), task)
    }

    /// Same as `new`, with an explicit dispatcher.
    pub fn new_with_dispatch(
        label: impl Into<Label>,
        dispatch: SharedDispatcher,
        task: impl FnOnce(Box<dyn FnOnce(Result<T, Error>)>) + 'static,
    ) -> Self {
        let stream = Stream::new_root_with_dispatch(label, ReplayPolicy::Last(1), dispatch.clone());
        stream.set_stream_type(StreamType::Future);
        run_task(stream.clone_ref(), &dispatch, task);
        Self { stream }
    }

    /// A Future that is already resolved with `value` by the time it is constructed.
    pub fn completed(label: impl Into<Label>, value: T) -> Self {
        Self::new(label, move |complete| complete(Ok(value)))
    }

    /// A Future that is already failed with `err` by the time it is constructed.
    pub fn failed(label: impl Into<Label>, err: Error) -> Self {
        Self::new(label, move |complete| complete(Err(err)))
    }

    /// A view onto the underlying `Stream<T>`.
    pub fn as_stream(&self) -> &Stream<T> {
        &self.stream
    }
}

/// The owner-side handle to a Future: same underlying node as the `Future<T>` handed to consumers,
/// additionally exposing imperative `complete`/`complete_value`/`complete_error`.
#[derive(Debug)]
pub struct FutureInput<T: Value> {
    stream: Stream<T>,
    fired: Rc<Cell<bool>>,
}

impl<T: Value> Clone for FutureInput<T> {
    fn clone(&self) -> Self {
        self.clone_ref()
    }
}

impl<T: Value> CloneRef for FutureInput<T> {
    fn clone_ref(&self) -> Self {
        Self { stream: self.stream.clone_ref(), fired: self.fired.clone() }
    }
}

impl<T: Value> std::ops::Deref for FutureInput<T> {
    type Target = Stream<T>;
    fn deref(&self) -> &Self::Target {
        &self.stream
    }
}

impl<T: Value> FutureInput<T> {
    /// A fresh, not-yet-completed Future together with its completion handle. Marked `persistent`
    /// so it is never pruned while waiting for its owner to call `complete`.
    pub fn new(label: impl Into<Label>) -> Self {
        Self::new_with_dispatch(label, default_dispatcher())
    }

    /// Same as `new`, with an explicit dispatcher.
    pub fn new_with_dispatch(label: impl Into<Label>, dispatch: SharedDispatcher) -> Self {
        let stream = Stream::new_root_with_dispatch(label, ReplayPolicy::Last(1), dispatch);
        stream.set_stream_type(StreamType::Future);
        stream.persist();
        Self { stream, fired: Rc::new(Cell::new(false)) }
    }

    /// Completes the Future with a raw `Result`. A no-op past the first call.
    pub fn complete(&self, result: Result<T, Error>) {
        if self.fired.replace(true) {
            return;
        }
        complete_future(&self.stream, result);
    }

    /// Completes the Future successfully.
    pub fn complete_value(&self, value: T) {
        self.complete(Ok(value));
    }

    /// Completes the Future with an error.
    pub fn complete_error(&self, err: Error) {
        self.complete(Err(err));
    }

    /// A read-only `Future<T>` handle sharing the same underlying node.
    pub fn reader(&self) -> Future<T> {
        Future { stream: self.stream.clone_ref() }
    }

    /// A view onto the underlying `Stream<T>`.
    pub fn as_stream(&self) -> &Stream<T> {
        &self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::ops::StreamOps as _;
    use pretty_assertions::assert_eq;

    fn collect<U: Value>(stream: &Stream<U>) -> Rc<RefCell<Vec<Event<U>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        stream.on_transition("collect", move |e| log2.borrow_mut().push(e.clone()));
        log
    }

    #[test]
    fn completed_future_replays_value_to_late_subscriber() {
        let future = Future::completed("ready", 7);
        let log = collect(future.as_stream());
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![7]);
        assert!(log.borrow().last().unwrap().is_terminate());
    }

    #[test]
    fn future_input_completes_exactly_once() {
        let input = FutureInput::<i32>::new("slot");
        let reader = input.reader();
        let log = collect(reader.as_stream());
        input.complete_value(1);
        input.complete_value(2);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![1]);
    }

    #[test]
    fn future_input_survives_until_completed() {
        let input = FutureInput::<i32>::new("slot");
        assert!(input.is_active());
        input.complete_value(1);
        assert!(input.is_terminated());
    }

    #[test]
    fn failed_future_terminates_with_error() {
        #[derive(Debug, thiserror::Error)]
        #[error("nope")]
        struct Nope;

        let future = Future::<i32>::failed("bad", crate::event::box_error(Nope));
        let log = collect(future.as_stream());
        assert_eq!(log.borrow().len(), 1);
        assert!(log.borrow()[0].is_terminate());
    }
}
