//! Reversible edits.

use std::fmt;

/// A directed edit operation over an externally owned model.
///
/// The history core never looks inside a delta. It only stores deltas,
/// hands them to the model and batches them for upload.
pub trait Delta: Clone + fmt::Debug {
    /// The model this delta mutates.
    type Model: ?Sized;

    /// Reason the model refused the delta.
    type Error: std::error::Error;

    /// Applies the delta to the model.
    ///
    /// Implementations must leave the model untouched when they fail.
    fn apply(&self, model: &mut Self::Model) -> Result<(), Self::Error>;
}

/// One undoable unit of edit: a pair of opposite deltas.
///
/// `forward` and `backward` are inverse operations. A change is immutable
/// once created and is owned by the history list thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct Change<D> {
    forward: D,
    backward: D,
}

impl<D> Change<D> {
    /// Creates a change from its forward and backward deltas.
    pub fn new(forward: D, backward: D) -> Self {
        Self { forward, backward }
    }

    /// The delta that (re)applies this change.
    pub fn forward(&self) -> &D {
        &self.forward
    }

    /// The delta that rolls this change back.
    pub fn backward(&self) -> &D {
        &self.backward
    }

    /// Splits the change into `(forward, backward)`.
    pub fn into_parts(self) -> (D, D) {
        (self.forward, self.backward)
    }
}

impl<D: Delta> Change<D> {
    /// Applies the forward delta.
    pub fn apply_forward(&self, model: &mut D::Model) -> Result<(), D::Error> {
        self.forward.apply(model)
    }

    /// Applies the backward delta.
    pub fn apply_backward(&self, model: &mut D::Model) -> Result<(), D::Error> {
        self.backward.apply(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{adjust, Tally};

    #[test]
    fn forward_then_backward_restores_model() {
        let mut tally = Tally::default();
        let change = adjust(1, 5);

        change.apply_forward(&mut tally).unwrap();
        assert_eq!(tally.value, 5);

        change.apply_backward(&mut tally).unwrap();
        assert_eq!(tally.value, 0);
    }

    #[test]
    fn rejected_delta_leaves_model_unchanged() {
        let mut tally = Tally {
            locked: true,
            ..Tally::default()
        };

        let change = adjust(1, 5);
        assert!(change.apply_forward(&mut tally).is_err());
        assert_eq!(tally.value, 0);
        assert!(tally.log.is_empty());
    }

    #[test]
    fn into_parts() {
        let change = adjust(7, 3);
        let (forward, backward) = change.clone().into_parts();
        assert_eq!(&forward, change.forward());
        assert_eq!(&backward, change.backward());
        assert_eq!(forward.amount, 3);
        assert_eq!(backward.amount, -3);
    }
}
