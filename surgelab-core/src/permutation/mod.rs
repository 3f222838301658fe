//! Grid-search permutation engine.
//!
//! A search space is a list of [`ParamDescriptor`]s, one per permutable
//! configuration field. Each point of the grid is an index vector; the
//! odometer in [`shift`] walks every vector exactly once and then wraps back
//! to all-zero, and [`PermutationEngine::value_for`] turns a vector into a
//! concrete configuration.

pub mod engine;
pub mod param;
pub mod shift;

pub use engine::{GridIter, Permutable, PermutationEngine};
pub use param::{ParamDescriptor, ParamKind, ParamRange, ParamValue};
pub use shift::{grid_size, shift_indices};

use thiserror::Error;

/// Errors from descriptor validation and index materialization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PermutationError {
    #[error("invalid descriptor {id}: {reason}")]
    InvalidDescriptor { id: String, reason: String },
    #[error("duplicate parameter id: {0}")]
    DuplicateId(String),
    #[error("index vector is empty")]
    EmptyIndices,
    #[error("expected {expected} indices, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("index {index} out of range for {id} (max index {max})")]
    IndexOutOfRange { id: String, index: usize, max: usize },
    #[error("value of {id} at index {index} exceeds max {max}")]
    ValueOutOfRange { id: String, index: usize, max: String },
    #[error("unknown parameter: {0}")]
    UnknownParam(String),
    #[error("parameter {id} takes a {expected} value")]
    KindMismatch { id: String, expected: ParamKind },
}
