//! A single parent→child wire. Type-erased on the parent's
//! side so a node can hold children of arbitrarily many different payload types in one `Vec`,
//! mirroring how `enso-frp`'s `stream::Stream` trait erases a node's output type behind
//! `EventEmitter`/`EventConsumer` so `network.rs` can hold heterogeneous node lists.

use super::{NodeId, Stream};
use crate::event::{Event, EventKey, Value};
use crate::prelude::*;

/// The callback an operator closure uses to push zero or more output events to the child. `None`
/// means "nothing to emit this call" (the common synchronous case collapses to `Some(vec![...])`,
/// but an async operator like `delay` captures this and calls it later, possibly after the
/// invocation that received it has already returned).
pub type Emit<Out> = Rc<dyn Fn(Option<Vec<Event<Out>>>)>;

/// A stateful operator function: given the edge's running "prior" value (the last `Next` payload
/// that passed through, if any — used by operators like `pairwise`/`skipRepeats`), the incoming
/// event, and an `emit` callback, does whatever the operator does. `enso-frp`'s per-operator
/// `Xxx::on_event` methods (`nodes.rs`) play the same role, one impl per operator shape; here a
/// single boxed closure plays that role for every operator, since the graph uses one node shape.
pub trait OperatorFn<In: Value, Out: Value>: Fn(&Option<In>, &Event<In>, Emit<Out>) {}
impl<In: Value, Out: Value, F: Fn(&Option<In>, &Event<In>, Emit<Out>)> OperatorFn<In, Out> for F {}

/// Type-erased downstream edge, held in a parent node's `downstream: Vec<Rc<dyn DownstreamEdge<T>>>`.
pub(crate) trait DownstreamEdge<In: Value>: Debug {
    fn deliver(&self, key: EventKey, event: &Event<In>);
    fn child_id(&self) -> NodeId;
    fn child_is_terminated(&self) -> bool;
}

pub(crate) struct Edge<In: Value, Out: Value> {
    child: Stream<Out>,
    op: Rc<dyn Fn(&Option<In>, &Event<In>, Emit<Out>)>,
    prior: RefCell<Option<In>>,
}

impl<In: Value, Out: Value> Edge<In, Out> {
    pub(crate) fn new(child: Stream<Out>, op: Rc<dyn Fn(&Option<In>, &Event<In>, Emit<Out>)>) -> Self {
        Self { child, op, prior: RefCell::new(None) }
    }
}

impl<In: Value, Out: Value> Debug for Edge<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge").field("child", &self.child.id()).finish()
    }
}

impl<In: Value, Out: Value> DownstreamEdge<In> for Edge<In, Out> {
    fn deliver(&self, key: EventKey, event: &Event<In>) {
        let child = self.child.clone_ref();
        let emit: Emit<Out> = Rc::new(move |events| {
            if let Some(events) = events {
                for event in events {
                    child.push(event, key.clone());
                }
            }
        });
        let prior = self.prior.borrow().clone();
        (self.op)(&prior, event, emit);
        if let Event::Next(value) = event {
            *self.prior.borrow_mut() = Some(value.clone());
        }
    }

    fn child_id(&self) -> NodeId {
        self.child.id()
    }

    fn child_is_terminated(&self) -> bool {
        self.child.is_terminated()
    }
}
