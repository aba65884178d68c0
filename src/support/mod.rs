//! Leaf support utilities with no dependency on the rest of the crate.
//! Grounded on `enso-prelude`'s small, focused modules (`reference.rs`, `clone.rs`, `macros.rs`).

pub mod circular_buffer;
pub mod clone_ref;
pub mod either;
pub mod weak_box;

pub use circular_buffer::CircularBuffer;
pub use either::Either;
pub use weak_box::WeakBox;
