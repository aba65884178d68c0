//! The operator library: roughly 35 combinators, every one of them a thin closure plugged
//! into the single `append(parent, label, op)` primitive (`crate::node::append`). Grounded on
//! `enso-frp`'s `nodes.rs`, which takes the same "one node shape per behavior, built from a single
//! `on_event` hook" approach; here the hook is a plain closure rather than a trait impl per
//! operator struct, since this crate has one node shape (`Stream<T>`) rather than one per operator.
//!
//! Operators are inherent methods on `Stream<T>` so chains read left to right:
//! `source.filter(|x| x % 2 == 0).count().on(|n|...)`.

mod arithmetic;
mod buffering;
mod combine;
mod lifetime;

pub use combine::{combine, merge, zip};

use crate::event::{Error, Event, Termination, Value};
use crate::node::{append, Emit, Stream};
use crate::prelude::*;

/// Marker trait gathering every operator impl block below under one name, so
/// `use reactive_streams::StreamOps;` (or `use streams::ops::StreamOps;`) is enough to bring every
/// combinator into scope for generic code written against `Stream<T>` without naming each
/// sub-module. The methods themselves are inherent, so this trait has no members of its own.
pub trait StreamOps<T: Value> {}
impl<T: Value> StreamOps<T> for Stream<T> {}

// =======================
// === Emit convenience ===
// =======================

fn emit_next<T: Value>(emit: &Emit<T>, value: T) {
    emit(Some(vec![Event::Next(value)]));
}

fn emit_many<T: Value>(emit: &Emit<T>, values: Vec<T>) {
    emit(Some(values.into_iter().map(Event::Next).collect()));
}

fn emit_terminate<T: Value>(emit: &Emit<T>, reason: Termination) {
    emit(Some(vec![Event::Terminate(reason)]));
}

fn emit_value_then_terminate<T: Value>(emit: &Emit<T>, value: T, reason: Termination) {
    emit(Some(vec![Event::Next(value), Event::Terminate(reason)]));
}

fn pass_through<T: Value>(emit: &Emit<T>, event: &Event<T>) {
    emit(Some(vec![event.clone()]));
}

impl<T: Value> Stream<T> {
    // ==============
    // === on*() ===
    // ==============

    /// `on(h)`: invokes `h` on every `Next` value, passes every event through unchanged.
    pub fn on(&self, label: impl Into<crate::node::Label>, h: impl Fn(&T) + 'static) -> Stream<T> {
        append(self, label, move |_prior, event, emit| {
            if let Event::Next(value) = event {
                h(value);
            }
            pass_through(&emit, event);
        })
    }

    /// `onTransition(h)`: invokes `h` on every event (both `Next` and `Terminate`), passes
    /// it through unchanged.
    pub fn on_transition(
        &self,
        label: impl Into<crate::node::Label>,
        h: impl Fn(&Event<T>) + 'static,
    ) -> Stream<T> {
        append(self, label, move |_prior, event, emit| {
            h(event);
            pass_through(&emit, event);
        })
    }

    /// `onTerminate(h)`: invokes `h` only when the stream terminates, passes the event
    /// through unchanged.
    pub fn on_terminate(
        &self,
        label: impl Into<crate::node::Label>,
        h: impl Fn(&Termination) + 'static,
    ) -> Stream<T> {
        append(self, label, move |_prior, event, emit| {
            if let Event::Terminate(reason) = event {
                h(reason);
            }
            pass_through(&emit, event);
        })
    }

    /// `trace(label)`: logs every incoming event at `debug` level
    /// and passes it through unchanged. Grounded on `enso-frp`'s `Trace` node (`nodes.rs`), ported
    /// to `tracing::debug!` from its raw `println!`.
    pub fn trace(&self, label: impl Into<crate::node::Label>) -> Stream<T> {
        let label = label.into();
        append(self, label.clone(), move |_prior, event, emit| {
            tracing::debug!(trace = %label, ?event);
            pass_through(&emit, event);
        })
    }

    // =============
    // === map() ===
    // =============

    /// `map(T→U?)`: emits the mapped value iff `f` returns `Some`.
    pub fn map<U: Value>(
        &self,
        label: impl Into<crate::node::Label>,
        f: impl Fn(&T) -> Option<U> + 'static,
    ) -> Stream<U> {
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                if let Some(out) = f(v) {
                    emit_next(&emit, out);
                }
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `map(T→Result<U>)`: success emits `next(U)`; failure terminates with the error.
    pub fn map_result<U: Value>(
        &self,
        label: impl Into<crate::node::Label>,
        f: impl Fn(&T) -> Result<U, Error> + 'static,
    ) -> Stream<U> {
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => match f(v) {
                Ok(out) => emit_next(&emit, out),
                Err(e) => emit_terminate(&emit, Termination::Error(e)),
            },
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `map(T, (Result<U>?)→void)`: an async map. `f` is handed the value and a completion
    /// callback; the completion MUST be invoked at most once (a second invocation is silently
    /// ignored) and may be invoked later than the call to `f` itself — a genuine suspension
    /// point. Passing `None` to the completion suppresses emission for that input.
    pub fn map_async<U: Value>(
        &self,
        label: impl Into<crate::node::Label>,
        f: impl Fn(&T, Box<dyn FnOnce(Option<Result<U, Error>>)>) + 'static,
    ) -> Stream<U> {
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                let emit = emit.clone();
                let completed = Rc::new(Cell::new(false));
                let v = v.clone();
                f(
                    &v,
                    Box::new(move |result| {
                        if completed.replace(true) {
                            return;
                        }
                        match result {
                            None => {}
                            Some(Ok(out)) => emit_next(&emit, out),
                            Some(Err(e)) => emit_terminate(&emit, Termination::Error(e)),
                        }
                    }),
                );
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `flatMap(T→[U])`: emits each element of the mapped sequence, in order.
    pub fn flat_map<U: Value>(
        &self,
        label: impl Into<crate::node::Label>,
        f: impl Fn(&T) -> Vec<U> + 'static,
    ) -> Stream<U> {
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => emit_many(&emit, f(v)),
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `flatten()`, for sequence-valued streams: `flat_map(identity)`.
    pub fn flatten<U: Value>(&self, label: impl Into<crate::node::Label>) -> Stream<U>
    where
        T: IntoIterator<Item = U> + Clone,
    {
        self.flat_map(label, |v| v.clone().into_iter().collect())
    }

    /// `scan(initial, (acc,T)→U)`: emits the updated accumulator for every value.
    pub fn scan<U: Value>(
        &self,
        label: impl Into<crate::node::Label>,
        initial: U,
        f: impl Fn(&U, &T) -> U + 'static,
    ) -> Stream<U> {
        let acc = RefCell::new(initial);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                let next = f(&acc.borrow(), v);
                *acc.borrow_mut() = next.clone();
                emit_next(&emit, next);
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `filter(pred)`: passes a value through iff `pred` is true.
    pub fn filter(
        &self,
        label: impl Into<crate::node::Label>,
        pred: impl Fn(&T) -> bool + 'static,
    ) -> Stream<T> {
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                if pred(v) {
                    pass_through(&emit, event);
                }
            }
            Event::Terminate(_) => pass_through(&emit, event),
        })
    }
}

impl<U: Value> Stream<Result<U, Error>> {
    /// `onError`: converts a Cold response stream's non-terminating error events into a
    /// plain `Stream<U>`. `handle` is given the error and decides whether it should terminate the
    /// stream (`Some(reason)`) or be swallowed, leaving the stream active for the next response
    /// (`None`) — mirroring how Cold keeps running after an error by default.
    pub fn on_error(
        &self,
        label: impl Into<crate::node::Label>,
        handle: impl Fn(&Error) -> Option<Termination> + 'static,
    ) -> Stream<U> {
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(Ok(v)) => emit_next(&emit, v.clone()),
            Event::Next(Err(e)) => {
                if let Some(reason) = handle(e) {
                    emit_terminate(&emit, reason);
                }
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ReplayPolicy;
    use pretty_assertions::assert_eq;

    fn collect<U: Value>(stream: &Stream<U>) -> Rc<RefCell<Vec<Event<U>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        stream.on_transition("collect", move |e| log2.borrow_mut().push(e.clone()));
        log
    }

    #[test]
    fn filter_count_scenario() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let counted = source.filter("even", |x| x % 2 == 0).count("count");
        let log = collect(&counted);
        for i in 1..=5 {
            source.emit(i);
        }
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn map_suppresses_none() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let mapped = source.map("evens", |x| if x % 2 == 0 { Some(*x) } else { None });
        let log = collect(&mapped);
        source.emit(1);
        source.emit(2);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![2]);
    }

    #[test]
    fn scan_produces_running_fold() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let running = source.scan("sum", 0, |acc, x| acc + x);
        let log = collect(&running);
        source.emit(1);
        source.emit(2);
        source.emit(3);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![1, 3, 6]);
    }

    #[test]
    fn map_result_failure_terminates() {
        #[derive(Debug, thiserror::Error)]
        #[error("bad")]
        struct Bad;

        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let mapped = source.map_result("check", |x| {
            if *x < 0 {
                Err(crate::event::box_error(Bad))
            } else {
                Ok(*x)
            }
        });
        let log = collect(&mapped);
        source.emit(-1);
        assert!(log.borrow().last().unwrap().is_terminate());
    }

    #[test]
    fn map_async_ignores_double_completion() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let mapped = source.map_async("double", |v, complete| {
            complete(Some(Ok(*v * 2)));
            complete(Some(Ok(9999)));
        });
        let log = collect(&mapped);
        source.emit(1);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![2]);
    }
}
