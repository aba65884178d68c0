//! A minimal `Either`, for payloads that are genuinely one of two shapes rather than a single
//! reconciled type.

use crate::prelude::*;

/// A value that is one of two possible types.
#[derive(Derivative)]
#[derivative(Clone(bound = "L: Clone, R: Clone"))]
#[derivative(Debug(bound = "L: Debug, R: Debug"))]
pub enum Either<L, R> {
    /// The left variant.
    Left(L),
    /// The right variant.
    Right(R),
}

impl<L, R> Either<L, R> {
    /// True if this is the left variant.
    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    /// True if this is the right variant.
    pub fn is_right(&self) -> bool {
        matches!(self, Either::Right(_))
    }

    /// Maps both variants into a common type.
    pub fn either<T>(self, on_left: impl FnOnce(L) -> T, on_right: impl FnOnce(R) -> T) -> T {
        match self {
            Either::Left(l) => on_left(l),
            Either::Right(r) => on_right(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn either_reconciles_both_variants() {
        let l: Either<i32, &str> = Either::Left(1);
        let r: Either<i32, &str> = Either::Right("two");
        assert_eq!(l.either(|n| n.to_string(), |s| s.to_string()), "1");
        assert_eq!(r.either(|n| n.to_string(), |s| s.to_string()), "two");
    }
}
