//! # glint-types
//!
//! Core data model for the Glint acquisition engine: hyperparameter
//! constraints and task contexts, configuration tables, observation
//! snapshots, generation results, and the shared error taxonomy.

mod errors;
mod result;
mod space;
mod table;

pub use errors::{GlintError, GlintResult, TransportError};
pub use result::{Candidate, GenerationResult};
pub use space::{Direction, ParamConstraint, ParamDomain, ParamKind, ParamTransform, TaskContext};
pub use table::{ConfigTable, ObservationSet};
