//! Resource identifiers and identifier generation.
//!
//! Every resource placed in a prescription document is addressed by its logical id, and
//! references between resources are written as `Type/id`. This crate provides:
//! - A wrapper type ([`ResourceId`]) that *guarantees* a valid FHIR logical id once
//!   constructed.
//! - An injectable generation capability ([`IdGenerator`]) so the random parts of a document
//!   (the composition id) can be made deterministic in tests.
//!
//! ## Logical id form
//! - Length: 1 to 64
//! - Characters: `A-Z`, `a-z`, `0-9`, `-` and `.` only
//! - Example: `550e8400-e29b-41d4-a716-446655440000`
//!
//! Ids coming from the EMR (patient, provider, encounter, drug and order uuids) are validated
//! with [`ResourceId::parse`]; nothing is normalised.

mod service;

// Re-export public types
pub use service::{IdGenerator, RandomIdGenerator, ResourceId, SequentialIdGenerator};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
