//! Grounded on `enso-prelude`'s `clone.rs`: a `Clone` for internally-mutable, `Rc`-backed handles.
//! Implementing `CloneRef` instead of relying on `#[derive(Clone)]` documents, at every call site,
//! that cloning a stream handle shares state rather than copying it.

/// Clone for internally-mutable structures: mutating one clone is observable through every other
/// clone. Every public stream handle in this crate (`Stream<T>`, `Hot<T>`, `Cold<Req,Resp>`,...)
/// implements this instead of `Clone` to make that sharing explicit at call sites.
pub trait CloneRef: Sized {
    /// Clone this handle. The result refers to the same underlying node.
    fn clone_ref(&self) -> Self;
}

/// Implements `CloneRef` for a type whose `Clone` impl already has reference semantics (i.e. it
/// is a thin wrapper around `Rc`/`Weak`).
macro_rules! impl_clone_ref_as_clone {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CloneRef for $ty {
                fn clone_ref(&self) -> Self {
                    self.clone()
                }
            }
        )*
    };
}

impl_clone_ref_as_clone!(());
