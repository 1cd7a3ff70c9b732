//! AI operations exposed by the gateway.
//!
//! [`transforms`] holds the operation catalog over the completion and
//! relay engines; [`periodic`] adds the storage-backed todo reviews.

pub mod periodic;
pub mod transforms;

pub use periodic::{PeriodKind, PeriodicReview};
pub use transforms::{TransformKind, TransformOutput, TransformService};
