//! FILENAME: selection-engine/src/error.rs

use thiserror::Error;

/// Explicit "cannot synthesize" outcomes. Callers branch on these routinely;
/// no best-guess condition is ever returned in their place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Cannot synthesize a condition: {binding} is bound to a derived formula")]
    DerivedFormula { binding: String },

    #[error("No bound cell at ({row}, {col})")]
    UnknownCell { row: usize, col: usize },
}
