//! Stream variants: `Hot`, `Cold`, `Future`, `Timer` — specializations of the
//! shared `Stream<T>` core (`crate::node`) with per-variant construction rules and, for `Cold`,
//! extra request-routing surface. Grounded on `enso-frp`'s per-source constructors (`Source`,
//! the timer-driven `io::mouse`/`io::keyboard` sources) layered on one shared node shape
//! (`stream::Node<Def>`), generalized here to the richer Hot/Cold/Future taxonomy this crate adds.

pub mod cold;
pub mod future;
pub mod hot;
pub mod timer;
