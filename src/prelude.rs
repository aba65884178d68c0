//! Internal prelude shared by every module in this crate. Grounded on `enso-prelude`
//! (`examples/enso-org-ide/lib/prelude/src/lib.rs`): a small re-export surface plus a couple of
//! genuinely-useful free functions, rather than a grab-bag of unrelated utilities.

pub(crate) use std::cell::Cell;
pub(crate) use std::cell::Ref;
pub(crate) use std::cell::RefCell;
pub(crate) use std::collections::HashMap;
pub(crate) use std::collections::HashSet;
pub(crate) use std::fmt;
pub(crate) use std::fmt::Debug;
pub(crate) use std::rc::Rc;
pub(crate) use std::rc::Weak;

pub(crate) use derivative::Derivative;

/// Equivalent of Haskell's `mempty` / Scala's `apply()` for any `Default` type. Lets call sites
/// avoid spelling out the type of a `Default::default()` call.
pub(crate) fn default<T: Default>() -> T {
    Default::default()
}

pub use crate::support::clone_ref::CloneRef;
