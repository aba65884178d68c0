//! `first`/`last`/`reduce`/`buffer`/`window`/`skip`/`stride`/`startWith`/`concat`/`defaultValue`.
//! Grounded on the general shape of `enso-frp`'s stateful nodes (`Toggle`/`Count` in
//! `nodes.rs`), which keep one small `Cell`/`RefCell` of running state per node; these operators
//! do the same with a `CircularBuffer`/`VecDeque` where those nodes use a bare `Cell`.

use super::{emit_next, emit_terminate, emit_value_then_terminate, pass_through};
use crate::event::{Event, Termination, Value};
use crate::node::{append, Stream};
use crate::prelude::*;
use crate::services::SharedClock;
use crate::support::CircularBuffer;
use itertools::Itertools;
use std::time::{Duration, Instant};

impl<T: Value> Stream<T> {
    /// `first()`: emits the first value, then terminates with `Termination::Completed`.
    pub fn first(&self, label: impl Into<crate::node::Label>) -> Stream<T> {
        self.first_n(label, 1, Termination::Completed)
    }

    /// `first(n, then)`: emits the first `n` values, then terminates with `then`.
    pub fn first_n(&self, label: impl Into<crate::node::Label>, n: usize, then: Termination) -> Stream<T> {
        let seen = Cell::new(0usize);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                let count = seen.get() + 1;
                seen.set(count);
                if count >= n {
                    emit_value_then_terminate(&emit, v.clone(), then.clone());
                } else {
                    emit_next(&emit, v.clone());
                }
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `last()`: buffers everything, emits the single final value (if any) on termination.
    pub fn last(&self, label: impl Into<crate::node::Label>) -> Stream<T> {
        let held: RefCell<Option<T>> = RefCell::new(None);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => *held.borrow_mut() = Some(v.clone()),
            Event::Terminate(reason) => {
                if let Some(v) = held.borrow_mut().take() {
                    emit_value_then_terminate(&emit, v, reason.clone());
                } else {
                    emit_terminate(&emit, reason.clone());
                }
            }
        })
    }

    /// `last(n, partial)`: buffers the last `n` values, emits them as a list on
    /// termination; if `partial` is false and fewer than `n` values were ever seen, nothing is
    /// emitted before the terminate event.
    pub fn last_n(&self, label: impl Into<crate::node::Label>, n: usize, partial: bool) -> Stream<Vec<T>> {
        let buf = RefCell::new(CircularBuffer::new(n));
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => buf.borrow_mut().push(v.clone()),
            Event::Terminate(reason) => {
                let snapshot = buf.borrow().to_vec();
                if partial || buf.borrow().is_full() {
                    emit(Some(vec![Event::Next(snapshot), Event::Terminate(reason.clone())]));
                } else {
                    emit_terminate(&emit, reason.clone());
                }
            }
        })
    }

    /// `reduce(initial, r)`: `scan(initial, r).last()`.
    pub fn reduce(
        &self,
        label: impl Into<crate::node::Label>,
        initial: T,
        r: impl Fn(&T, &T) -> T + 'static,
    ) -> Stream<T> {
        let label = label.into();
        self.scan(format!("{}-scan", label), initial, r).last(format!("{}-last", label))
    }

    /// `buffer(size, partial)`: emits every `size` values as a list; on terminate, emits
    /// the partial (under-`size`) remainder iff `partial`.
    pub fn buffer(&self, label: impl Into<crate::node::Label>, size: usize, partial: bool) -> Stream<Vec<T>> {
        assert!(size > 0, "buffer size must be positive");
        let pending: RefCell<Vec<T>> = RefCell::new(Vec::with_capacity(size));
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                pending.borrow_mut().push(v.clone());
                if pending.borrow().len() == size {
                    let batch = pending.replace(Vec::with_capacity(size));
                    emit_next(&emit, batch);
                }
            }
            Event::Terminate(reason) => {
                let remainder = pending.take();
                if partial && !remainder.is_empty() {
                    emit(Some(vec![Event::Next(remainder), Event::Terminate(reason.clone())]));
                } else {
                    emit_terminate(&emit, reason.clone());
                }
            }
        })
    }

    /// `window(size:int, partial)`: emits the sliding window of the last `size` values for
    /// every incoming value. If `partial` is false, nothing is emitted until the window fills.
    pub fn window(&self, label: impl Into<crate::node::Label>, size: usize, partial: bool) -> Stream<Vec<T>> {
        assert!(size > 0, "window size must be positive");
        let buf = RefCell::new(CircularBuffer::new(size));
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                buf.borrow_mut().push(v.clone());
                if partial || buf.borrow().is_full() {
                    emit_next(&emit, buf.borrow().to_vec());
                }
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `window(size:duration, limit?)`: emits every value received in the last `size`
    /// wall-clock seconds, truncated to the most recent `limit` entries if given. Needs a `Clock`
    /// to stamp and expire entries.
    pub fn window_duration(
        &self,
        label: impl Into<crate::node::Label>,
        size: Duration,
        limit: Option<usize>,
        clock: SharedClock,
    ) -> Stream<Vec<T>> {
        let buf: RefCell<std::collections::VecDeque<(Instant, T)>> = RefCell::new(default());
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                let now = clock.now();
                let mut buf = buf.borrow_mut();
                buf.push_back((now, v.clone()));
                while let Some((ts, _)) = buf.front() {
                    if now.saturating_duration_since(*ts) > size {
                        buf.pop_front();
                    } else {
                        break;
                    }
                }
                let values = buf.iter().map(|(_, v)| v.clone());
                let snapshot: Vec<T> = match limit {
                    Some(limit) => values.tail(limit).collect(),
                    None => values.collect(),
                };
                drop(buf);
                emit_next(&emit, snapshot);
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `skip(n)`: drops the first `n` values, passes the rest through unchanged.
    pub fn skip(&self, label: impl Into<crate::node::Label>, n: usize) -> Stream<T> {
        let seen = Cell::new(0usize);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(_) => {
                let count = seen.get();
                seen.set(count + 1);
                if count >= n {
                    pass_through(&emit, event);
                }
            }
            Event::Terminate(_) => pass_through(&emit, event),
        })
    }

    /// `next(n, then)`: passes the first `n` values through, then terminates with `then`.
    pub fn take_n(&self, label: impl Into<crate::node::Label>, n: usize, then: Termination) -> Stream<T> {
        let seen = Cell::new(0usize);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                let count = seen.get() + 1;
                seen.set(count);
                if count > n {
                    return;
                }
                if count == n {
                    emit_value_then_terminate(&emit, v.clone(), then.clone());
                } else {
                    emit_next(&emit, v.clone());
                }
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `stride(n)`: emits every nth value (`n >= 1`).
    pub fn stride(&self, label: impl Into<crate::node::Label>, n: usize) -> Stream<T> {
        assert!(n >= 1, "stride must be at least 1");
        let seen = Cell::new(0usize);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(_) => {
                let count = seen.get() + 1;
                seen.set(count);
                if count % n == 0 {
                    pass_through(&emit, event);
                }
            }
            Event::Terminate(_) => pass_through(&emit, event),
        })
    }

    /// `start(with:[T])`: the first incoming value causes the prefix to be emitted (once),
    /// followed by the value itself; every later value passes through unchanged.
    pub fn start_with(&self, label: impl Into<crate::node::Label>, prefix: Vec<T>) -> Stream<T> {
        let prefix = RefCell::new(Some(prefix));
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                let mut out: Vec<Event<T>> = prefix.take().unwrap_or_default().into_iter().map(Event::Next).collect();
                out.push(Event::Next(v.clone()));
                emit(Some(out));
            }
            Event::Terminate(_) => pass_through(&emit, event),
        })
    }

    /// `concat([T])`: on termination, emits the listed values before forwarding the
    /// terminate event.
    pub fn concat(&self, label: impl Into<crate::node::Label>, tail: Vec<T>) -> Stream<T> {
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(_) => pass_through(&emit, event),
            Event::Terminate(reason) => {
                let mut out: Vec<Event<T>> = tail.clone().into_iter().map(Event::Next).collect();
                out.push(Event::Terminate(reason.clone()));
                emit(Some(out));
            }
        })
    }

    /// `defaultValue(v)`: if the stream terminates having never emitted a value, emits `v`
    /// first.
    pub fn default_value(&self, label: impl Into<crate::node::Label>, v: T) -> Stream<T> {
        let emitted = Cell::new(false);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(_) => {
                emitted.set(true);
                pass_through(&emit, event);
            }
            Event::Terminate(reason) => {
                if emitted.get() {
                    emit_terminate(&emit, reason.clone());
                } else {
                    emit_value_then_terminate(&emit, v.clone(), reason.clone());
                }
            }
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
    fn buffer_emits_full_chunks_and_drops_partial() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let bufs = source.buffer("buf", 2, false);
        let log = collect(&bufs);
        for i in 1..=5 {
            source.emit(i);
        }
        source.terminate(Termination::Completed);
        let chunks: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().cloned()).collect();
        assert_eq!(chunks, vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn buffer_emits_partial_remainder_when_requested() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let bufs = source.buffer("buf", 2, true);
        let log = collect(&bufs);
        source.emit(1);
        source.emit(2);
        source.emit(3);
        source.terminate(Termination::Completed);
        let chunks: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().cloned()).collect();
        assert_eq!(chunks, vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn window_sliding_emits_every_value() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let windows = source.window("w", 2, true);
        let log = collect(&windows);
        source.emit(1);
        source.emit(2);
        source.emit(3);
        let snapshots: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().cloned()).collect();
        assert_eq!(snapshots, vec![vec![1], vec![1, 2], vec![2, 3]]);
    }

    #[test]
    fn first_n_terminates_after_n_values() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let firsts = source.first_n("first2", 2, Termination::Completed);
        let log = collect(&firsts);
        source.emit(1);
        source.emit(2);
        source.emit(3);
        assert_eq!(log.borrow().len(), 3);
        assert!(log.borrow()[2].is_terminate());
    }

    #[test]
    fn skip_drops_first_n() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let skipped = source.skip("skip2", 2);
        let log = collect(&skipped);
        source.emit(1);
        source.emit(2);
        source.emit(3);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![3]);
    }

    #[test]
    fn default_value_fires_only_when_nothing_was_emitted() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let defaulted = source.default_value("def", -1);
        let log = collect(&defaulted);
        source.terminate(Termination::Completed);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![-1]);
    }

    #[test]
    fn start_with_prefixes_only_once() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let prefixed = source.start_with("start", vec![0, -1]);
        let log = collect(&prefixed);
        source.emit(1);
        source.emit(2);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![0, -1, 1, 2]);
    }
}
