//! `WeakBox<T>` is a settable weak back-reference. It is used for the node→parent back-reference
//! and for the `using`/`lifeOf` operator's weak reference to an external
//! object. Grounded on `enso-frp`'s weak/strong handle pairing (`stream::Node`/`stream::WeakNode`
//! in `stream.rs`), generalized to hold an arbitrary `Weak<T>` rather than only a stream node.

use crate::prelude::*;

/// A cell holding an optional weak reference, settable after construction (a node's parent is
/// not known until `append` runs).
#[derive(Debug)]
pub struct WeakBox<T: ?Sized> {
    slot: RefCell<Option<Weak<T>>>,
}

impl<T: ?Sized> Default for WeakBox<T> {
    fn default() -> Self {
        Self { slot: RefCell::new(None) }
    }
}

impl<T: ?Sized> WeakBox<T> {
    /// An empty box.
    pub fn new() -> Self {
        default()
    }

    /// A box already pointing at `value`.
    pub fn from_strong(value: &Rc<T>) -> Self {
        Self { slot: RefCell::new(Some(Rc::downgrade(value))) }
    }

    /// Replaces the held reference.
    pub fn set(&self, value: &Rc<T>) {
        *self.slot.borrow_mut() = Some(Rc::downgrade(value));
    }

    /// Clears the held reference.
    pub fn clear(&self) {
        *self.slot.borrow_mut() = None;
    }

    /// Attempts to upgrade the held reference to a strong one.
    pub fn upgrade(&self) -> Option<Rc<T>> {
        self.slot.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// True iff the referent is still alive.
    pub fn is_alive(&self) -> bool {
        self.upgrade().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrade_fails_after_drop() {
        let rc = Rc::new(42);
        let weak = WeakBox::from_strong(&rc);
        assert!(weak.is_alive());
        drop(rc);
        assert!(!weak.is_alive());
        assert_eq!(weak.upgrade(), None);
    }

    #[test]
    fn empty_box_never_upgrades() {
        let weak: WeakBox<i32> = WeakBox::new();
        assert!(!weak.is_alive());
    }
}
