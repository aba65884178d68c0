//! `stamp`/`timeStamp`/`distinct`/`min`/`max`/`count`/`countStamp`/`sum`/`average`.
//! Grounded on `enso-frp`'s `Count`/`Toggle` nodes (`nodes.rs`): small, single-`Cell`-of-state
//! operators, generalized here to arbitrary accumulator/comparator closures instead of one
//! hard-coded behavior per node type.

use super::{emit_next, emit_terminate, pass_through};
use crate::event::{Event, Value};
use crate::node::{append, Stream};
use crate::prelude::*;
use crate::services::SharedClock;
use std::time::Instant;

impl<T: Value> Stream<T> {
    /// `stamp(T→U)`: emits `(T, U)` for every value.
    pub fn stamp<U: Value>(
        &self,
        label: impl Into<crate::node::Label>,
        f: impl Fn(&T) -> U + 'static,
    ) -> Stream<(T, U)> {
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => emit_next(&emit, (v.clone(), f(v))),
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `timeStamp()`: `stamp(_ => clock.now())`.
    pub fn time_stamp(&self, label: impl Into<crate::node::Label>, clock: SharedClock) -> Stream<(T, Instant)> {
        self.stamp(label, move |_| clock.now())
    }

    /// `distinct(prior,next → bool)`: the first value always passes; every later value
    /// passes iff `pred(prior, next)` is true.
    pub fn distinct(
        &self,
        label: impl Into<crate::node::Label>,
        pred: impl Fn(&T, &T) -> bool + 'static,
    ) -> Stream<T> {
        let last: RefCell<Option<T>> = RefCell::new(None);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                let passes = match &*last.borrow() {
                    None => true,
                    Some(prev) => pred(prev, v),
                };
                if passes {
                    *last.borrow_mut() = Some(v.clone());
                    pass_through(&emit, event);
                }
            }
            Event::Terminate(_) => pass_through(&emit, event),
        })
    }

    /// `min/max(cmp)`: emits only when a new extremum (per `cmp`) is observed; the first
    /// value is always an extremum. `is_new_extremum(cmp, candidate, current) = true` when
    /// `candidate` should replace `current`.
    fn extremum(
        &self,
        label: impl Into<crate::node::Label>,
        is_new_extremum: impl Fn(&T, &T) -> bool + 'static,
    ) -> Stream<T> {
        let best: RefCell<Option<T>> = RefCell::new(None);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                let replace = match &*best.borrow() {
                    None => true,
                    Some(cur) => is_new_extremum(v, cur),
                };
                if replace {
                    *best.borrow_mut() = Some(v.clone());
                    emit_next(&emit, v.clone());
                }
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `min(cmp)`: emits only when a new minimum (per `cmp`) is observed.
    pub fn min_by(
        &self,
        label: impl Into<crate::node::Label>,
        cmp: impl Fn(&T, &T) -> std::cmp::Ordering + 'static,
    ) -> Stream<T> {
        self.extremum(label, move |candidate, current| cmp(candidate, current) == std::cmp::Ordering::Less)
    }

    /// `max(cmp)`: emits only when a new maximum (per `cmp`) is observed.
    pub fn max_by(
        &self,
        label: impl Into<crate::node::Label>,
        cmp: impl Fn(&T, &T) -> std::cmp::Ordering + 'static,
    ) -> Stream<T> {
        self.extremum(label, move |candidate, current| cmp(candidate, current) == std::cmp::Ordering::Greater)
    }

    /// `count()`: emits a 1-indexed counter per incoming value, not the value itself.
    pub fn count(&self, label: impl Into<crate::node::Label>) -> Stream<usize> {
        let n = Cell::new(0usize);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(_) => {
                n.set(n.get() + 1);
                emit_next(&emit, n.get());
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `countStamp()`: emits `(T, counter)`.
    pub fn count_stamp(&self, label: impl Into<crate::node::Label>) -> Stream<(T, usize)> {
        let n = Cell::new(0usize);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                n.set(n.get() + 1);
                emit_next(&emit, (v.clone(), n.get()));
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }
}

impl<T> Stream<T>
where
    T: Value + std::ops::Add<Output = T> + Default,
{
    /// `sum()`, for arithmetic-typed values: running sum.
    pub fn sum(&self, label: impl Into<crate::node::Label>) -> Stream<T> {
        self.scan(label, T::default(), |acc, v| acc.clone() + v.clone())
    }
}

impl<T> Stream<T>
where
    T: Value + Into<f64>,
{
    /// `average()`, for arithmetic-typed values: running mean, as `f64`.
    pub fn average(&self, label: impl Into<crate::node::Label>) -> Stream<f64> {
        let sum = Cell::new(0.0f64);
        let n = Cell::new(0u64);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                sum.set(sum.get() + (v.clone().into()));
                n.set(n.get() + 1);
                emit_next(&emit, sum.get() / (n.get() as f64));
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }
}

impl<T> Stream<T>
where
    T: Value + PartialOrd,
{
    /// `min()` shortcut over `min_by` for naturally-ordered values.
    pub fn min(&self, label: impl Into<crate::node::Label>) -> Stream<T> {
        self.min_by(label, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// `max()` shortcut over `max_by` for naturally-ordered values.
    pub fn max(&self, label: impl Into<crate::node::Label>) -> Stream<T> {
        self.max_by(label, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ReplayPolicy;
    use pretty_assertions::assert_eq;

    fn values<U: Value>(stream: &Stream<U>) -> Rc<RefCell<Vec<U>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        stream.on("collect", move |v| log2.borrow_mut().push(v.clone()));
        log
    }

    #[test]
    fn distinct_always_passes_first_value() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let distinct = source.distinct("d", |a, b| a != b);
        let log = values(&distinct);
        source.emit(1);
        source.emit(1);
        source.emit(2);
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn max_emits_only_on_new_extremum() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let maxes = source.max("max");
        let log = values(&maxes);
        for v in [3, 1, 5, 2, 9, 4] {
            source.emit(v);
        }
        assert_eq!(*log.borrow(), vec![3, 5, 9]);
    }

    #[test]
    fn sum_accumulates() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let sums = source.sum("sum");
        let log = values(&sums);
        source.emit(1);
        source.emit(2);
        source.emit(3);
        assert_eq!(*log.borrow(), vec![1, 3, 6]);
    }

    #[test]
    fn average_tracks_running_mean() {
        let source: Stream<f64> = Stream::new_root("source", ReplayPolicy::None);
        let avgs = source.average("avg");
        let log = values(&avgs);
        source.emit(2.0);
        source.emit(4.0);
        assert_eq!(*log.borrow(), vec![2.0, 3.0]);
    }

    #[test]
    fn count_emits_index_not_value() {
        let source: Stream<&'static str> = Stream::new_root("source", ReplayPolicy::None);
        let counts = source.count("count");
        let log = values(&counts);
        source.emit("a");
        source.emit("b");
        assert_eq!(*log.borrow(), vec![1, 2]);
    }
}
