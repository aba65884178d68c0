//! `doWhile`/`until`/`using`/`lifeOf`/`delay`: the lifetime-sensitive operators — the ones
//! whose termination is driven by a predicate, an external object's liveness, or wall-clock time
//! rather than purely by what the upstream parent does. Grounded on `enso-frp`'s weak-reference
//! handling in `stream::WeakNode` (`stream.rs`) for `using`/`lifeOf`, and on its dispatcher-style
//! deferred execution (`network.rs`) for `delay`.

use super::{emit_next, emit_terminate, emit_value_then_terminate, pass_through};
use crate::event::{Event, Termination, Value};
use crate::node::{append, Stream};
use crate::prelude::*;
use std::time::Duration;

impl<T: Value> Stream<T> {
    /// `doWhile(pred, then)`: passes values through while `pred` holds, then terminates
    /// with `then` as soon as it returns false (the triggering value is NOT forwarded).
    pub fn do_while(
        &self,
        label: impl Into<crate::node::Label>,
        pred: impl Fn(&T) -> bool + 'static,
        then: Termination,
    ) -> Stream<T> {
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                if pred(v) {
                    pass_through(&emit, event);
                } else {
                    emit_terminate(&emit, then.clone());
                }
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `until(pred, then)`: the mirror of `do_while` — passes values through until `pred`
    /// becomes true, then terminates with `then` (the triggering value is forwarded first).
    pub fn until(
        &self,
        label: impl Into<crate::node::Label>,
        pred: impl Fn(&T) -> bool + 'static,
        then: Termination,
    ) -> Stream<T> {
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                if pred(v) {
                    emit_value_then_terminate(&emit, v.clone(), then.clone());
                } else {
                    pass_through(&emit, event);
                }
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `using(obj, then)`: maintains a weak reference to `obj`; emits `(obj, value)` while
    /// it is still alive, and terminates with `then` the first time a `Next` event finds it gone.
    pub fn using<O: 'static>(
        &self,
        label: impl Into<crate::node::Label>,
        obj: &Rc<O>,
        then: Termination,
    ) -> Stream<(Rc<O>, T)> {
        let weak = Rc::downgrade(obj);
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => match weak.upgrade() {
                Some(obj) => emit_next(&emit, (obj, v.clone())),
                None => emit_terminate(&emit, then.clone()),
            },
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        })
    }

    /// `lifeOf(obj, then)`: `using(obj, then).map(_.1)` — the value stream that terminates
    /// when `obj` is dropped, without carrying `obj` itself downstream.
    pub fn life_of<O: 'static>(
        &self,
        label: impl Into<crate::node::Label>,
        obj: &Rc<O>,
        then: Termination,
    ) -> Stream<T> {
        let label = label.into();
        self.using(format!("{}-using", label), obj, then)
            .map(format!("{}-map", label), |(_, v)| Some(v.clone()))
    }

    /// `delay(d)`: schedules each value's emission at `now + d` via the node's dispatcher.
    /// Delayed emissions are tracked so the terminate event — itself deferred by the same amount —
    /// is never observed downstream before a `Next` event pushed earlier. With the crate's
    /// `ImmediateDispatcher`, everything still resolves synchronously in call order; with a real
    /// executor, `d` is honored as a lower bound, not an exact schedule.
    pub fn delay(&self, label: impl Into<crate::node::Label>, d: Duration) -> Stream<T> {
        let dispatch = self.dispatch();
        append(self, label, move |_prior, event, emit| match event {
            Event::Next(v) => {
                let emit = emit.clone();
                let v = v.clone();
                dispatch.after(d, Box::new(move || emit_next(&emit, v)));
            }
            Event::Terminate(reason) => {
                let emit = emit.clone();
                let reason = reason.clone();
                dispatch.after(d, Box::new(move || emit_terminate(&emit, reason)));
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
    fn do_while_drops_triggering_value() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let limited = source.do_while("positive", |v| *v > 0, Termination::Cancelled);
        let log = collect(&limited);
        source.emit(1);
        source.emit(2);
        source.emit(-1);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![1, 2]);
        assert!(log.borrow().last().unwrap().is_terminate());
    }

    #[test]
    fn until_forwards_triggering_value_then_terminates() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let limited = source.until("hit-zero", |v| *v == 0, Termination::Completed);
        let log = collect(&limited);
        source.emit(1);
        source.emit(0);
        source.emit(5);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![1, 0]);
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn using_terminates_once_object_is_dropped() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let obj = Rc::new(42i32);
        let observed = source.life_of("life", &obj, Termination::Cancelled);
        let log = collect(&observed);
        source.emit(1);
        drop(obj);
        source.emit(2);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![1]);
        assert!(log.borrow().last().unwrap().is_terminate());
    }

    #[test]
    fn delay_runs_synchronously_under_immediate_dispatcher() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::None);
        let delayed = source.delay("delay", Duration::from_secs(1));
        let log = collect(&delayed);
        source.emit(7);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![7]);
    }
}
