//! The stream core: state machine, child list, event dispatch, replay buffer, termination
//! and pruning. Grounded on `enso-frp`'s `stream::NodeData`/`stream::Node`/`stream::WeakNode`
//! triad (`stream.rs`): an `Rc`-backed data block behind a thin, `CloneRef`-able handle type, with
//! a weak upstream back-reference and a bounded internal cache — generalized here from the
//! event/behavior split to the active/terminated state machine, replay buffer, key routing and
//! pruning this engine needs.

mod edge;

pub use edge::Emit;
pub(crate) use edge::{DownstreamEdge, Edge};

use crate::errors::GraphError;
use crate::event::{
    Event, EventKey, ReplayPolicy, RequestId, ShareMode, StreamState, StreamType, Termination, Value,
};
use crate::prelude::*;
use crate::services::{default_dispatcher, SharedDispatcher};
use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A process-unique node identifier, used to find a terminated child in its parent's downstream
/// list. A plain monotonic counter, not a memory address: simpler than the raw-pointer trick
/// `enso-frp` uses (`stream::Stream::id`) and just as stable for the node's lifetime.
pub type NodeId = usize;

fn next_node_id() -> NodeId {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// A node's debugging/logging label. Cheap to carry around, the way `enso-frp`'s
/// `CowString`/`Label` is.
pub type Label = Cow<'static, str>;

// ================
// === Prunable ===
// ================

/// Type-erased upstream pruning target: whatever a node's parent is, regardless of the parent's
/// own payload type. Implemented by every `Inner<T>`.
pub(crate) trait Prunable: Debug {
    fn child_terminated(&self, child: NodeId);
}

// ===============
// === Inner<T> ===
// ===============

/// The shared, `Rc`-held state of a single stream node.
pub struct Inner<T: Value> {
    id: NodeId,
    label: Label,
    stream_type: Cell<StreamType>,
    state: RefCell<StreamState>,
    downstream: RefCell<Vec<Rc<dyn DownstreamEdge<T>>>>,
    parent: WeakBox<dyn Prunable>,
    replay_policy: ReplayPolicy,
    pending_replay: RefCell<std::collections::VecDeque<Event<T>>>,
    dispatch: SharedDispatcher,
    should_prune: Cell<bool>,
    persistent: Cell<bool>,
    keys: RefCell<HashSet<RequestId>>,
    share_mode: Cell<ShareMode>,
    terminate_hooks: RefCell<Vec<Box<dyn Fn(&Termination)>>>,
}

impl<T: Value> Debug for Inner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("stream_type", &self.stream_type.get())
            .field("state", &*self.state.borrow())
            .field("children", &self.downstream.borrow().len())
            .finish()
    }
}

impl<T: Value> Inner<T> {
    fn new(label: Label, dispatch: SharedDispatcher, replay_policy: ReplayPolicy) -> Self {
        Self {
            id: next_node_id(),
            label,
            stream_type: Cell::new(StreamType::Base),
            state: RefCell::new(StreamState::Active),
            downstream: RefCell::new(Vec::new()),
            parent: WeakBox::new(),
            replay_policy,
            pending_replay: RefCell::new(default()),
            dispatch,
            should_prune: Cell::new(true),
            persistent: Cell::new(false),
            keys: RefCell::new(default()),
            share_mode: Cell::new(ShareMode::Keyed),
            terminate_hooks: RefCell::new(Vec::new()),
        }
    }

    // === Accessors ===

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> StreamState {
        self.state.borrow().clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.state.borrow().is_terminated()
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().is_active()
    }

    pub fn stream_type(&self) -> StreamType {
        self.stream_type.get()
    }

    pub(crate) fn set_stream_type(&self, ty: StreamType) {
        self.stream_type.set(ty);
    }

    pub fn dispatch(&self) -> SharedDispatcher {
        self.dispatch.clone()
    }

    pub fn replay_policy(&self) -> ReplayPolicy {
        self.replay_policy
    }

    /// Marks this node so that an empty downstream list will NOT cause it to self-terminate.
    /// Hot sources call this at construction; any node can opt in explicitly.
    pub fn persist(&self) {
        self.persistent.set(true);
    }

    /// Marks this node so that its own termination is never reported to its parent as upstream
    /// pressure.
    pub fn detach(&self) {
        self.should_prune.set(false);
    }

    pub(crate) fn set_parent(&self, parent: &Rc<dyn Prunable>) {
        self.parent.set(parent);
    }

    // === Cold plumbing ===

    pub(crate) fn share_mode(&self) -> ShareMode {
        self.share_mode.get()
    }

    pub(crate) fn set_share_mode(&self, mode: ShareMode) {
        self.share_mode.set(mode);
    }

    pub(crate) fn insert_key(&self, id: RequestId) {
        self.keys.borrow_mut().insert(id);
    }

    /// Cold pre-processor. Returns the key to use for the node's own
    /// downstream fan-out if the event is accepted, or `None` if it should be silently dropped.
    fn cold_preprocess(&self, incoming: &EventKey) -> Option<EventKey> {
        let accept_keyed = |id: &RequestId| self.keys.borrow_mut().remove(id);
        match (self.share_mode.get(), incoming) {
            (_, EventKey::None) => Some(EventKey::None),
            (ShareMode::Keyed, EventKey::Keyed(id)) | (ShareMode::Keyed, EventKey::Shared(id)) => {
                if accept_keyed(id) { Some(EventKey::Keyed(*id)) } else { None }
            }
            (ShareMode::Shared, EventKey::Keyed(id)) | (ShareMode::Shared, EventKey::Shared(id)) => {
                self.keys.borrow_mut().remove(id);
                Some(EventKey::Shared(*id))
            }
            (ShareMode::Inherit, EventKey::Keyed(id)) => {
                if accept_keyed(id) { Some(EventKey::Keyed(*id)) } else { None }
            }
            (ShareMode::Inherit, EventKey::Shared(id)) => {
                self.keys.borrow_mut().remove(id);
                Some(EventKey::Shared(*id))
            }
        }
    }

    // === Replay ===

    fn record_replay(&self, event: &Event<T>) {
        match self.replay_policy {
            ReplayPolicy::None => {}
            ReplayPolicy::All => {
                self.pending_replay.borrow_mut().push_back(event.clone());
            }
            ReplayPolicy::Last(n) => {
                let mut buf = self.pending_replay.borrow_mut();
                buf.push_back(event.clone());
                let cap = if event.is_terminate() { n + 1 } else { n };
                while buf.len() > cap {
                    buf.pop_front();
                }
            }
        }
    }

    /// Re-emits the replay buffer to every current child. Used by `Future`'s
    /// scheduled post-completion replay and exposed for manual re-broadcast.
    pub fn replay(&self) {
        let edges: Vec<_> = self.downstream.borrow().iter().cloned().collect();
        let events: Vec<_> = self.pending_replay.borrow().iter().cloned().collect();
        for edge in &edges {
            for event in &events {
                edge.deliver(EventKey::None, event);
            }
        }
    }

    fn replay_to(&self, edge: &Rc<dyn DownstreamEdge<T>>) {
        for event in self.pending_replay.borrow().iter() {
            edge.deliver(EventKey::None, event);
        }
    }

    // === Terminate hooks ===

    /// Registers a hook invoked exactly once, when this node transitions to `Terminated` (either
    /// because it was pushed a `Terminate` event, or because `append`'s internal wiring ran the
    /// edge operator one last time with a synthetic terminate).
    pub fn on_terminate_internal(&self, hook: Box<dyn Fn(&Termination)>) {
        self.terminate_hooks.borrow_mut().push(hook);
    }

    fn run_terminate_hooks(&self, reason: &Termination) {
        for hook in self.terminate_hooks.borrow().iter() {
            hook(reason);
        }
    }

    // === Core push ===

    /// Entry point for parent → child event injection.
    pub fn push(&self, event: Event<T>, key: EventKey) {
        if self.is_terminated() {
            return;
        }
        let key = if self.stream_type.get() == StreamType::Cold {
            match self.cold_preprocess(&key) {
                Some(k) => k,
                None => return,
            }
        } else {
            key
        };
        if let StreamState::Paused = *self.state.borrow() {
            // Paused nodes still observe termination (it is absorbing) but otherwise drop events.
            if !event.is_terminate() {
                return;
            }
        }

        tracing::trace!(node = %self.label, id = self.id, ?event, "push");

        if let Event::Terminate(ref reason) = event {
            *self.state.borrow_mut() = StreamState::Terminated(reason.clone());
        }
        self.record_replay(&event);

        let edges: Vec<_> = self.downstream.borrow().iter().cloned().collect();
        for edge in &edges {
            if edge.child_is_terminated() {
                continue;
            }
            edge.deliver(key.clone(), &event);
        }

        if let Event::Terminate(reason) = event {
            tracing::debug!(node = %self.label, id = self.id, %reason, "terminated");
            self.run_terminate_hooks(&reason);
            self.downstream.borrow_mut().clear();
            self.keys.borrow_mut().clear();
            if self.should_prune.get() {
                if let Some(parent) = self.parent.upgrade() {
                    parent.child_terminated(self.id);
                }
            }
        }
    }

    /// Idempotent: emits `terminate(reason)` to self if still active.
    pub fn terminate(&self, reason: Termination) {
        if self.is_terminated() {
            return;
        }
        self.push(Event::Terminate(reason), EventKey::None);
    }

    /// Convenience for emitting a plain value with no routing key.
    pub fn emit(&self, value: T) {
        self.push(Event::Next(value), EventKey::None);
    }

    /// Pauses event forwarding without terminating the node. A no-op once terminated.
    pub fn pause(&self) {
        if !self.is_terminated() {
            *self.state.borrow_mut() = StreamState::Paused;
        }
    }

    /// Resumes event forwarding after `pause`. A no-op once terminated.
    pub fn resume(&self) {
        if !self.is_terminated() {
            *self.state.borrow_mut() = StreamState::Active;
        }
    }
}

impl<T: Value> Prunable for Inner<T> {
    fn child_terminated(&self, child: NodeId) {
        self.downstream.borrow_mut().retain(|edge| edge.child_id() != child);
        let empty = self.downstream.borrow().is_empty();
        if empty && !self.persistent.get() && !self.is_terminated() {
            tracing::trace!(node = %self.label, id = self.id, "pruned: last child terminated");
            self.terminate(Termination::Cancelled);
        }
    }
}

// ================
// === Stream<T> ===
// ================

/// Strong, `CloneRef`-able reference to a stream node. This is the handle
/// every public API (`Hot`, `Cold`, `Future`, `Timer`, and every operator result) is built from —
/// analogous to `enso-frp`'s `stream::Node<Def>`, generalized since this engine has a single node
/// shape rather than one monomorphic shape per operator.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Stream<T: Value> {
    inner: Rc<Inner<T>>,
}

impl<T: Value> Clone for Stream<T> {
    fn clone(&self) -> Self {
        self.clone_ref()
    }
}

impl<T: Value> CloneRef for Stream<T> {
    fn clone_ref(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Value> std::ops::Deref for Stream<T> {
    type Target = Inner<T>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: Value> Stream<T> {
    /// Constructs a root node (no parent) with its own dispatcher and replay policy. Sources
    /// (`Hot`, `Cold`, `Future`, `Timer`) go through this.
    pub fn new_root(label: impl Into<Label>, replay_policy: ReplayPolicy) -> Self {
        Self::new_root_with_dispatch(label, replay_policy, default_dispatcher())
    }

    /// Same as `new_root`, with an explicit dispatcher (used by tests and by callers wiring in
    /// their own executor).
    pub fn new_root_with_dispatch(
        label: impl Into<Label>,
        replay_policy: ReplayPolicy,
        dispatch: SharedDispatcher,
    ) -> Self {
        Self { inner: Rc::new(Inner::new(label.into(), dispatch, replay_policy)) }
    }

    /// Constructs a freestanding child-shaped node: same dispatcher/replay-policy plumbing an
    /// `append`ed node gets, but not yet wired to any parent. Used by multi-parent operators
    /// (`merge`, `zip`, `combine`) which wire more than one `connect` call into one child.
    pub(crate) fn new_child(label: Label, dispatch: SharedDispatcher, replay_policy: ReplayPolicy) -> Self {
        Self { inner: Rc::new(Inner::new(label, dispatch, replay_policy)) }
    }

    /// A weak back-reference usable across payload types, e.g. for `using`/`lifeOf` or manual
    /// parent bookkeeping outside of `append`.
    pub fn downgrade_any(&self) -> Weak<dyn Prunable> {
        let rc: Rc<dyn Prunable> = self.inner.clone();
        Rc::downgrade(&rc)
    }

    /// Type-erased strong reference to this node, usable as another node's `Prunable` parent.
    pub(crate) fn as_prunable(&self) -> Rc<dyn Prunable> {
        self.inner.clone()
    }
}

// ================
// === connect() ===
// ================

/// Wires one edge running `op` from `parent` into an already-constructed `child`. `append` is
/// the single-parent case of this; `merge`/`zip`/`combine` call this twice, once per parent,
/// into one shared child. Rejects at attach-time: a `parent` that has already terminated never
/// gets the edge registered, and `child` is immediately terminated with `Cancelled` instead,
/// since it has no live upstream to ever deliver it an event.
pub(crate) fn connect<In, Out>(
    parent: &Stream<In>,
    child: &Stream<Out>,
    op: Rc<dyn Fn(&Option<In>, &Event<In>, Emit<Out>)>,
) where
    In: Value,
    Out: Value,
{
    if parent.is_terminated() {
        tracing::warn!(parent = %parent.label(), "{}", GraphError::AppendToTerminated);
        child.terminate(Termination::Cancelled);
        return;
    }

    let edge: Rc<dyn DownstreamEdge<In>> = Rc::new(Edge::new(child.clone_ref(), op));
    parent.replay_to(&edge);
    parent.downstream.borrow_mut().push(edge);
}

// ================
// === append() ===
// ================

/// The single operator primitive: allocates a child node, wires an edge running `op`
/// between `parent` and the child, replays any buffered events to the new child, and registers
/// the parent↔child relationship (strong child-list, weak parent back-reference) that pruning
/// relies on.
pub fn append<In, Out>(
    parent: &Stream<In>,
    label: impl Into<Label>,
    op: impl Fn(&Option<In>, &Event<In>, Emit<Out>) + 'static,
) -> Stream<Out>
where
    In: Value,
    Out: Value,
{
    let child = Stream::new_child(label.into(), parent.dispatch(), parent.replay_policy());
    let op: Rc<dyn Fn(&Option<In>, &Event<In>, Emit<Out>)> = Rc::new(op);

    let hook_op = op.clone();
    child.on_terminate_internal(Box::new(move |reason| {
        let discard: Emit<Out> = Rc::new(|_| {});
        hook_op(&None, &Event::Terminate(reason.clone()), discard);
    }));

    connect(parent, &child, op);
    child.set_parent(&parent.as_prunable());
    child
}

/// Wires two parents into one freshly-constructed child. The child
/// inherits dispatcher/replay policy from `a` and is `detach`ed from pruning, since it has two
/// upstream parents and the single-parent pruning model has no well-defined notion of "the"
/// parent to report upstream pressure to — see DESIGN.md.
pub(crate) fn append2<A, B, Out>(
    a: &Stream<A>,
    b: &Stream<B>,
    label: impl Into<Label>,
    op_a: impl Fn(&Option<A>, &Event<A>, Emit<Out>) + 'static,
    op_b: impl Fn(&Option<B>, &Event<B>, Emit<Out>) + 'static,
) -> Stream<Out>
where
    A: Value,
    B: Value,
    Out: Value,
{
    let child = Stream::new_child(label.into(), a.dispatch(), a.replay_policy());
    child.detach();
    let op_a: Rc<dyn Fn(&Option<A>, &Event<A>, Emit<Out>)> = Rc::new(op_a);
    let op_b: Rc<dyn Fn(&Option<B>, &Event<B>, Emit<Out>)> = Rc::new(op_b);

    let hook_a = op_a.clone();
    let hook_b = op_b.clone();
    child.on_terminate_internal(Box::new(move |reason| {
        let discard: Emit<Out> = Rc::new(|_| {});
        hook_a(&None, &Event::Terminate(reason.clone()), discard.clone());
        hook_b(&None, &Event::Terminate(reason.clone()), discard);
    }));

    connect(a, &child, op_a);
    connect(b, &child, op_b);
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ReplayPolicy;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell as StdRefCell;

    fn collector<T: Value>() -> (Stream<T>, Rc<StdRefCell<Vec<Event<T>>>>) {
        let log = Rc::new(StdRefCell::new(Vec::new()));
        let source: Stream<T> = Stream::new_root("source", ReplayPolicy::None);
        let log2 = log.clone();
        let _sink = append(&source, "sink", move |_prior, event, _emit: Emit<()>| {
            log2.borrow_mut().push(event.clone());
        });
        (source, log)
    }

    #[test]
    fn push_fans_out_in_order() {
        let (source, log) = collector::<i32>();
        source.emit(1);
        source.emit(2);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn terminated_node_rejects_further_events() {
        let (source, log) = collector::<i32>();
        source.terminate(Termination::Completed);
        source.emit(1);
        assert_eq!(log.borrow().len(), 1); // only the terminate event
        assert!(log.borrow()[0].is_terminate());
    }

    #[test]
    fn pruning_cascades_when_last_child_terminates() {
        let parent: Stream<i32> = Stream::new_root("parent", ReplayPolicy::None);
        let child = append(&parent, "child", |_p, e: &Event<i32>, emit: Emit<i32>| {
            emit(Some(vec![e.clone()]));
        });
        assert!(parent.is_active());
        child.terminate(Termination::Completed);
        assert!(parent.is_terminated());
    }

    #[test]
    fn persistent_node_survives_orphaning() {
        let parent: Stream<i32> = Stream::new_root("parent", ReplayPolicy::None);
        parent.persist();
        let child = append(&parent, "child", |_p, e: &Event<i32>, emit: Emit<i32>| {
            emit(Some(vec![e.clone()]));
        });
        child.terminate(Termination::Completed);
        assert!(parent.is_active());
    }

    #[test]
    fn append_to_terminated_parent_rejects_at_attach_time() {
        let parent: Stream<i32> = Stream::new_root("parent", ReplayPolicy::None);
        parent.terminate(Termination::Cancelled);
        let child = append(&parent, "late-child", |_p, e: &Event<i32>, emit: Emit<i32>| {
            emit(Some(vec![e.clone()]));
        });
        assert!(child.is_terminated());
        assert_eq!(parent.downstream.borrow().len(), 0);
    }

    #[test]
    fn replay_last_n_delivers_buffered_events_to_late_subscriber() {
        let source: Stream<i32> = Stream::new_root("source", ReplayPolicy::Last(2));
        source.emit(1);
        source.emit(2);
        source.emit(3);
        let log = Rc::new(StdRefCell::new(Vec::new()));
        let log2 = log.clone();
        let _late = append(&source, "late", move |_p, e: &Event<i32>, _emit: Emit<()>| {
            log2.borrow_mut().push(e.clone());
        });
        let values: Vec<_> = log.borrow().iter().filter_map(|e| e.next_value().copied()).collect();
        assert_eq!(values, vec![2, 3]);
    }
}
