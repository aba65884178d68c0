//! Construction-time misuse errors, distinct from the per-stream, user-supplied
//! `Error` that flows through `Termination::Error` (`crate::event::Error`). `enso-frp`'s own era
//! reaches for `failure::Fail` for this sort of thing; `thiserror` is the direct, maintained
//! successor and the convention the wider retrieval pack uses (see DESIGN.md).

use thiserror::Error as ThisError;

/// Misuse detectable at graph-construction time.
#[derive(Debug, ThisError)]
pub enum GraphError {
    /// An operator was appended to a node that has already terminated.
    #[error("cannot append an operator to a terminated stream")]
    AppendToTerminated,

    /// A Cold response arrived for a request id that is not (or is no longer) outstanding.
    #[error("no outstanding Cold request for id {0}")]
    UnknownRequest(crate::event::RequestId),

    /// A Cold task's completion callback was invoked more than once for the same request.
    #[error("Cold task completion invoked more than once for request {0}")]
    DuplicateCompletion(crate::event::RequestId),
}
