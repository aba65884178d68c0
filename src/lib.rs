//! A composable reactive-streams dataflow engine: Hot/Cold/Future/Timer streams built on a single
//! `append(parent, op) -> child` operator primitive (see the crate-level `SPEC_FULL.md` in the
//! repository root for the full design). Grounded throughout on `enso-frp`
//! (`examples/enso-org-ide/src/rust/lib/frp`), generalized from its event/behavior network to the
//! active/terminated state machine, keyed Cold routing, and upstream pruning this crate adds.

#![warn(missing_debug_implementations)]

pub mod errors;
pub mod event;
pub mod node;
pub mod observable;
pub mod ops;
pub mod prelude;
pub mod services;
pub mod support;
pub mod variants;

pub use errors::GraphError;
pub use event::{Error, Event, EventKey, ReplayPolicy, RequestId, ShareMode, StreamState, StreamType, Value};
pub use node::{append, Stream};
pub use observable::StateObservable;
pub use ops::StreamOps;
pub use services::{
    Clock, Dispatcher, ImmediateDispatcher, ManualClock, ManualTimerFactory, RandomUuidGen, SequentialUuidGen,
    SharedClock, SharedDispatcher, SharedTimerFactory, SharedUuidGen, SystemClock, ThreadTimerFactory,
    TimerFactory, TimerToken, UuidGen,
};
pub use support::{CircularBuffer, CloneRef, Either, WeakBox};
pub use variants::cold::{Cold, ColdResponse, ColdTask};
pub use variants::future::{Future, FutureInput};
pub use variants::hot::{Hot, HotInput};
pub use variants::timer::Timer;
