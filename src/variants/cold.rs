//! `Cold<Req, Resp>`: a source that produces exactly one response per explicit `request`.
//! Grounded on `enso-frp`'s lazily-evaluated `Lambda`/`LambdaX` nodes (`nodes.rs`), which likewise
//! run a closure on demand rather than reacting to upstream pushes — generalized here to a request
//! identity (`RequestId`), the keyed/shared/inherit routing this crate layers on top, and an
//! injected `StateObservable` in place of `enso-frp`'s captured-by-closure network state.

use crate::event::{box_error, Error, RequestId, ShareMode, StreamType, Termination, Value};
use crate::node::{append, Label, Stream};
use crate::observable::StateObservable;
use crate::prelude::*;
use crate::services::SharedUuidGen;

/// A Cold node's response type as it travels through the graph: `Ok` carries the response value,
/// `Err` carries a non-terminating error. Consumers reach for `Stream::on_error` (`crate::ops`) to
/// turn this into a terminating stream where that is the desired behavior.
pub type ColdResponse<Resp> = Result<Resp, Error>;

/// The task a `Cold` node runs on every `request`: handed the shared ambient state, the
/// request value, and a completion callback that MUST be invoked at most once. A second
/// invocation is silently ignored.
pub type ColdTask<Req, Resp, S> = Rc<dyn Fn(StateObservable<S>, Req, Box<dyn FnOnce(ColdResponse<Resp>)>)>;

struct ColdCore<Req, Resp, S> {
    task: ColdTask<Req, Resp, S>,
    state: StateObservable<S>,
    uuid_gen: SharedUuidGen,
    root: Stream<ColdResponse<Resp>>,
}

/// A handle onto a Cold node or one of its request-capable branches. `Cold::branch` creates
/// additional handles wired downstream of this one that are independently `request`-able and whose
/// responses are routed only back to themselves (or to every branch, once `share(true)` is called
/// anywhere upstream of it) — see the routing discussion in DESIGN.md for why `request` lives on
/// `Cold` itself rather than on arbitrary `.map()`/`.filter()` chains built from [`Cold::as_stream`].
pub struct Cold<Req: Value, Resp: Value, S = ()> {
    core: Rc<ColdCore<Req, Resp, S>>,
    node: Stream<ColdResponse<Resp>>,
    /// Every node from the root down to and including `node`, in order. Used by
    /// `dispatch_request` to insert the request id at each hop on the path, so a response keyed
    /// to a deeply-nested branch is accepted all the way down rather than only at the root and
    /// the leaf — see DESIGN.md for why a flat two-point insert is not enough once `branch()` is
    /// chained more than one level deep.
    path: Rc<Vec<Stream<ColdResponse<Resp>>>>,
}

impl<Req: Value, Resp: Value, S> Clone for Cold<Req, Resp, S> {
    fn clone(&self) -> Self {
        self.clone_ref()
    }
}

impl<Req: Value, Resp: Value, S> Debug for Cold<Req, Resp, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cold").field("node", &self.node).finish()
    }
}

impl<Req: Value, Resp: Value, S> CloneRef for Cold<Req, Resp, S> {
    fn clone_ref(&self) -> Self {
        Self { core: self.core.clone(), node: self.node.clone_ref(), path: self.path.clone() }
    }
}

impl<Req: Value, Resp: Value, S> std::ops::Deref for Cold<Req, Resp, S> {
    type Target = Stream<ColdResponse<Resp>>;
    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

impl<Req: Value, Resp: Value, S: 'static> Cold<Req, Resp, S> {
    /// Constructs a Cold root with the given ambient state and request-id generator. The root is
    /// `persist`ed and starts in `keyed` mode.
    pub fn new(
        label: impl Into<Label>,
        state: S,
        uuid_gen: SharedUuidGen,
        task: impl Fn(StateObservable<S>, Req, Box<dyn FnOnce(ColdResponse<Resp>)>) + 'static,
    ) -> Self {
        let root: Stream<ColdResponse<Resp>> = Stream::new_root(label, default());
        root.set_stream_type(StreamType::Cold);
        root.persist();
        let core = Rc::new(ColdCore { task: Rc::new(task), state: StateObservable::new(state), uuid_gen, root: root.clone_ref() });
        Self { core, path: Rc::new(vec![root.clone_ref()]), node: root }
    }

    /// A view onto the underlying response stream, for chaining ordinary operators
    /// (`.map()`, `.filter()`, `.on_error()`, …) to build out what a request's consumers observe.
    pub fn as_stream(&self) -> &Stream<ColdResponse<Resp>> {
        &self.node
    }

    /// Creates a new request-capable branch downstream of this handle. The branch's routing mode
    /// is `inherit`: it defers to whatever its ancestor decided (keyed acceptance by id, or
    /// broadcast once `share(true)` is called anywhere upstream of it).
    pub fn branch(&self, label: impl Into<Label>) -> Self {
        let node = append(&self.node, label, |_prior, event, emit| {
            emit(Some(vec![event.clone()]));
        });
        node.set_stream_type(StreamType::Cold);
        node.set_share_mode(ShareMode::Inherit);
        let mut path = (*self.path).clone();
        path.push(node.clone_ref());
        Self { core: self.core.clone(), node, path: Rc::new(path) }
    }

    /// `share(true)`: upgrades this handle's own node to broadcast mode, so its next
    /// response (and every one after) reaches every child regardless of which branch requested it.
    /// `share(false)` restores the default keyed routing.
    pub fn share(&self, shared: bool) {
        self.node.set_share_mode(if shared { ShareMode::Shared } else { ShareMode::Keyed });
    }

    /// Runs `task` for `req`, registering a fresh request id so the eventual response is routed
    /// back along the path from the task to this handle. Shared by `request` and
    /// `new_mapped_request_stream`; the callback receives the id so callers that need to push the
    /// response themselves (`request`) can, while callers that just want the raw result
    /// (`new_mapped_request_stream`) can ignore it.
    fn dispatch_request(&self, req: Req, on_response: impl FnOnce(RequestId, ColdResponse<Resp>) + 'static) {
        let id = self.core.uuid_gen.new_id();
        for hop in self.path.iter() {
            hop.insert_key(id);
        }
        tracing::debug!(node = %self.node.label(), ?id, "cold request dispatched");

        let fired = Rc::new(Cell::new(false));
        (self.core.task)(
            self.core.state.clone_ref(),
            req,
            Box::new(move |result| {
                if fired.replace(true) {
                    return;
                }
                on_response(id, result);
            }),
        )
    }

    /// `request(r)`: generates a fresh id, invokes the task, and pushes the eventual
    /// response onto the root with `key = keyed(id)` so only this handle's path observes it
    /// (unless some ancestor has called `share(true)`).
    pub fn request(&self, req: Req) {
        let root = self.core.root.clone_ref();
        self.dispatch_request(req, move |id, result| {
            root.push(crate::event::Event::Next(result), crate::event::EventKey::Keyed(id));
        });
    }

    /// `newMappedRequestStream(f)`: a new upstream `Cold<U, Resp>` that forwards `f(u)` to
    /// this handle's task and relays the raw result back to whoever requests from the new handle,
    /// without itself appearing on the response graph this handle's branches observe.
    pub fn new_mapped_request_stream<U: Value>(
        &self,
        label: impl Into<Label>,
        f: impl Fn(&U) -> Req + 'static,
    ) -> Cold<U, Resp, S>
    where
        S: Clone,
    {
        let inner = self.clone_ref();
        Cold::new(label, self.core.state.get(), self.core.uuid_gen.clone(), move |_state, u: U, cb| {
            let req = f(&u);
            inner.dispatch_request(req, move |_id, result| cb(result));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::services::SequentialUuidGen;
    use pretty_assertions::assert_eq;

    fn collect<U: Value>(stream: &Stream<U>) -> Rc<RefCell<Vec<Event<U>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        stream.on_transition("collect", move |e| log2.borrow_mut().push(e.clone()));
        log
    }

    fn doubling_cold() -> Cold<i32, i32, ()> {
        Cold::new("double", (), Rc::new(SequentialUuidGen::new()), |_state, req, cb| {
            cb(Ok(req * 2));
        })
    }

    #[test]
    fn request_delivers_only_to_requesting_branch() {
        let cold = doubling_cold();
        let branch_a = cold.branch("a");
        let branch_b = cold.branch("b");
        let a_sink = branch_a.as_stream().map("unwrap", |r: &ColdResponse<i32>| r.as_ref().ok().copied());
        let b_sink = branch_b.as_stream().map("unwrap", |r: &ColdResponse<i32>| r.as_ref().ok().copied());
        let log_a = collect(&a_sink);
        let log_b = collect(&b_sink);

        branch_a.request(3);

        let values_a: Vec<_> = log_a.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        let values_b: Vec<_> = log_b.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values_a, vec![6]);
        assert!(values_b.is_empty());
    }

    #[test]
    fn request_delivers_through_a_nested_branch() {
        let cold = doubling_cold();
        let branch_a = cold.branch("a");
        let nested = branch_a.branch("a-nested");
        let other = cold.branch("b");
        let nested_sink = nested.as_stream().map("unwrap", |r: &ColdResponse<i32>| r.as_ref().ok().copied());
        let other_sink = other.as_stream().map("unwrap", |r: &ColdResponse<i32>| r.as_ref().ok().copied());
        let log_nested = collect(&nested_sink);
        let log_other = collect(&other_sink);

        nested.request(4);

        let values_nested: Vec<_> = log_nested.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        let values_other: Vec<_> = log_other.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values_nested, vec![8]);
        assert!(values_other.is_empty());
    }

    #[test]
    fn share_broadcasts_response_to_every_branch() {
        let cold = doubling_cold();
        let branch_a = cold.branch("a");
        let branch_b = cold.branch("b");
        let a_sink = branch_a.as_stream().map("unwrap", |r: &ColdResponse<i32>| r.as_ref().ok().copied());
        let b_sink = branch_b.as_stream().map("unwrap", |r: &ColdResponse<i32>| r.as_ref().ok().copied());
        let log_a = collect(&a_sink);
        let log_b = collect(&b_sink);

        cold.share(true);
        branch_a.request(5);

        let values_a: Vec<_> = log_a.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        let values_b: Vec<_> = log_b.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values_a, vec![10]);
        assert_eq!(values_b, vec![10]);
    }

    #[test]
    fn on_error_terminates_on_failure() {
        #[derive(Debug, thiserror::Error)]
        #[error("boom")]
        struct Boom;

        let cold: Cold<i32, i32, ()> = Cold::new("failing", (), Rc::new(SequentialUuidGen::new()), |_state, _req, cb| {
            cb(Err(box_error(Boom)));
        });
        let terminating = cold.as_stream().on_error("to-terminate", |_e| Some(Termination::Cancelled));
        let log = collect(&terminating);
        cold.request(1);
        assert!(log.borrow().last().unwrap().is_terminate());
    }

    #[test]
    fn new_mapped_request_stream_forwards_translated_request() {
        let cold = doubling_cold();
        let mapped = cold.new_mapped_request_stream("from-string", |s: &String| s.len() as i32);
        let sink = mapped.as_stream().map("unwrap", |r: &ColdResponse<i32>| r.as_ref().ok().copied());
        let log = collect(&sink);
        mapped.request("abcd".to_string());
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![8]);
    }
}
