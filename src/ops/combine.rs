//! `merge`/`zip`/`combine`: the three multi-parent operators. Each wires two upstream edges
//! into one shared child via `crate::node::append2`, since the single-parent `append` primitive
//! only has room for one upstream weak back-reference. Grounded on `enso-frp`'s multi-input nodes
//! (`nodes.rs`'s `Merge`/`Gate`-style constructors, which likewise take more than one
//! `EventOutput` and `construct_and_connect` each into a shared node), generalized from the
//! teacher's fixed arity-2 event/behavior split to this crate's uniform `Event<T>` shape.

use crate::event::{Event, Value};
use crate::node::{append2, Label, Stream};
use crate::prelude::*;

use super::{emit_next, emit_terminate, pass_through};

/// Tracks which of two parents have terminated so a combining child can apply the "terminates iff
/// both parents have terminated" rule.
struct BothDone {
    a: Cell<bool>,
    b: Cell<bool>,
}

impl BothDone {
    fn new() -> Rc<Self> {
        Rc::new(Self { a: Cell::new(false), b: Cell::new(false) })
    }
}

/// `merge(Stream<U>)`: unions two parents of the *same* payload type into one child.
/// Values are interleaved as received; the child terminates once BOTH parents have terminated.
pub fn merge<T: Value>(a: &Stream<T>, b: &Stream<T>, label: impl Into<Label>) -> Stream<T> {
    let done = BothDone::new();
    let (done_a, done_b) = (done.clone(), done.clone());

    append2(
        a,
        b,
        label,
        move |_prior, event, emit| match event {
            Event::Next(_) => pass_through(&emit, event),
            Event::Terminate(reason) => {
                done_a.a.set(true);
                if done_a.b.get() {
                    emit_terminate(&emit, reason.clone());
                }
            }
        },
        move |_prior, event, emit| match event {
            Event::Next(_) => pass_through(&emit, event),
            Event::Terminate(reason) => {
                done_b.b.set(true);
                if done_b.a.get() {
                    emit_terminate(&emit, reason.clone());
                }
            }
        },
    )
}

impl<T: Value> Stream<T> {
    /// Method form of [`merge`].
    pub fn merge(&self, other: &Stream<T>, label: impl Into<Label>) -> Stream<T> {
        merge(self, other, label)
    }
}

/// `zip(Stream<U>, buffer?)`: pairs values by arrival order, one from each side per output
/// tuple. Unbounded queues unless `buffer` caps them, in which case the longer side drops its
/// oldest entry on overflow. The child terminates as soon as EITHER parent terminates,
/// since no further pair can ever complete once one side stops producing (see DESIGN.md).
pub fn zip<A: Value, B: Value>(
    a: &Stream<A>,
    b: &Stream<B>,
    label: impl Into<Label>,
    buffer: Option<usize>,
) -> Stream<(A, B)> {
    let queue_a: Rc<RefCell<std::collections::VecDeque<A>>> = Rc::new(default());
    let queue_b: Rc<RefCell<std::collections::VecDeque<B>>> = Rc::new(default());
    let (qa1, qa2) = (queue_a.clone(), queue_a);
    let (qb1, qb2) = (queue_b.clone(), queue_b);

    fn push_capped<X>(queue: &RefCell<std::collections::VecDeque<X>>, value: X, cap: Option<usize>) {
        let mut q = queue.borrow_mut();
        q.push_back(value);
        if let Some(cap) = cap {
            while q.len() > cap {
                q.pop_front();
            }
        }
    }

    fn try_pair<A, B>(
        qa: &RefCell<std::collections::VecDeque<A>>,
        qb: &RefCell<std::collections::VecDeque<B>>,
    ) -> Option<(A, B)> {
        let both_ready = !qa.borrow().is_empty() && !qb.borrow().is_empty();
        if !both_ready {
            return None;
        }
        Some((qa.borrow_mut().pop_front().unwrap(), qb.borrow_mut().pop_front().unwrap()))
    }

    append2(
        a,
        b,
        label,
        move |_prior, event, emit| match event {
            Event::Next(v) => {
                push_capped(&qa1, v.clone(), buffer);
                if let Some(pair) = try_pair(&qa1, &qb1) {
                    emit_next(&emit, pair);
                }
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        },
        move |_prior, event, emit| match event {
            Event::Next(v) => {
                push_capped(&qb2, v.clone(), buffer);
                if let Some(pair) = try_pair(&qa2, &qb2) {
                    emit_next(&emit, pair);
                }
            }
            Event::Terminate(reason) => emit_terminate(&emit, reason.clone()),
        },
    )
}

impl<A: Value> Stream<A> {
    /// Method form of [`zip`].
    pub fn zip<B: Value>(&self, other: &Stream<B>, label: impl Into<Label>, buffer: Option<usize>) -> Stream<(A, B)> {
        zip(self, other, label, buffer)
    }
}

/// Shared state backing `combine`'s two shapes.
struct CombineState<A, B> {
    latest_a: RefCell<Option<A>>,
    latest_b: RefCell<Option<B>>,
    pending_a: RefCell<std::collections::VecDeque<A>>,
    pending_b: RefCell<std::collections::VecDeque<B>>,
}

/// `combine(Stream<U>, latest)`: emits a tuple whenever either side produces a value.
///
/// - `latest = true`: reuse the other side's latest value (no emission until both sides have
///   produced at least once).
/// - `latest = false`: consume one value from each side per emission, one-for-one, dropping
///   excess on the side that is ahead (so each output tuple is pristine, never-reused data from
///   both sides, paired strictly by arrival order — see DESIGN.md for this resolution).
///
/// The child terminates once BOTH parents have terminated, mirroring `merge`.
pub fn combine<A: Value, B: Value>(a: &Stream<A>, b: &Stream<B>, label: impl Into<Label>, latest: bool) -> Stream<(A, B)> {
    let state = Rc::new(CombineState::<A, B> {
        latest_a: RefCell::new(None),
        latest_b: RefCell::new(None),
        pending_a: RefCell::new(default()),
        pending_b: RefCell::new(default()),
    });
    let done = BothDone::new();
    let (state_a, state_b) = (state.clone(), state);
    let (done_a, done_b) = (done.clone(), done);

    append2(
        a,
        b,
        label,
        move |_prior, event, emit| match event {
            Event::Next(v) => {
                if latest {
                    *state_a.latest_a.borrow_mut() = Some(v.clone());
                    if let Some(bv) = &*state_a.latest_b.borrow() {
                        emit_next(&emit, (v.clone(), bv.clone()));
                    }
                } else {
                    state_a.pending_a.borrow_mut().push_back(v.clone());
                    try_emit_pending(&state_a, &emit);
                }
            }
            Event::Terminate(reason) => {
                done_a.a.set(true);
                if done_a.b.get() {
                    emit_terminate(&emit, reason.clone());
                }
            }
        },
        move |_prior, event, emit| match event {
            Event::Next(v) => {
                if latest {
                    *state_b.latest_b.borrow_mut() = Some(v.clone());
                    if let Some(av) = &*state_b.latest_a.borrow() {
                        emit_next(&emit, (av.clone(), v.clone()));
                    }
                } else {
                    state_b.pending_b.borrow_mut().push_back(v.clone());
                    try_emit_pending(&state_b, &emit);
                }
            }
            Event::Terminate(reason) => {
                done_b.b.set(true);
                if done_b.a.get() {
                    emit_terminate(&emit, reason.clone());
                }
            }
        },
    )
}

fn try_emit_pending<A: Value, B: Value>(state: &CombineState<A, B>, emit: &crate::node::Emit<(A, B)>) {
    loop {
        let paired = {
            let mut pa = state.pending_a.borrow_mut();
            let mut pb = state.pending_b.borrow_mut();
            match (pa.front(), pb.front()) {
                (Some(_), Some(_)) => Some((pa.pop_front().unwrap(), pb.pop_front().unwrap())),
                _ => None,
            }
        };
        match paired {
            Some(pair) => emit_next(emit, pair),
            None => break,
        }
    }
}

impl<A: Value> Stream<A> {
    /// Method form of [`combine`].
    pub fn combine<B: Value>(&self, other: &Stream<B>, label: impl Into<Label>, latest: bool) -> Stream<(A, B)> {
        combine(self, other, label, latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ReplayPolicy, Termination};
    use pretty_assertions::assert_eq;

    fn collect<U: Value>(stream: &Stream<U>) -> Rc<RefCell<Vec<Event<U>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        stream.on_transition("collect", move |e| log2.borrow_mut().push(e.clone()));
        log
    }

    #[test]
    fn merge_emits_iff_one_parent_did_and_terminates_when_both_do() {
        let a: Stream<i32> = Stream::new_root("a", ReplayPolicy::None);
        let b: Stream<i32> = Stream::new_root("b", ReplayPolicy::None);
        let merged = a.merge(&b, "merged");
        let log = collect(&merged);
        a.emit(1);
        b.emit(2);
        a.terminate(Termination::Completed);
        assert!(!log.borrow().last().unwrap().is_terminate());
        b.terminate(Termination::Completed);
        assert!(log.borrow().last().unwrap().is_terminate());
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn zip_pairs_by_arrival_order() {
        let a: Stream<i32> = Stream::new_root("a", ReplayPolicy::None);
        let b: Stream<&'static str> = Stream::new_root("b", ReplayPolicy::None);
        let zipped = a.zip(&b, "zipped", None);
        let log = collect(&zipped);
        a.emit(1);
        a.emit(2);
        b.emit("x");
        b.emit("y");
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().cloned()).collect();
        assert_eq!(values, vec![(1, "x"), (2, "y")]);
    }

    #[test]
    fn combine_latest_waits_for_both_sides_once() {
        let a: Stream<i32> = Stream::new_root("a", ReplayPolicy::None);
        let b: Stream<&'static str> = Stream::new_root("b", ReplayPolicy::None);
        let combined = a.combine(&b, "combined", true);
        let log = collect(&combined);
        a.emit(1);
        assert!(log.borrow().is_empty());
        b.emit("x");
        assert_eq!(log.borrow().len(), 1);
        a.emit(2);
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().cloned()).collect();
        assert_eq!(values, vec![(1, "x"), (2, "x")]);
    }
}
