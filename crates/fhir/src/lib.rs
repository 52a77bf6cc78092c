//! FHIR wire support for HIP prescription documents.
//!
//! This crate provides **wire models** and **integrity helpers** for FHIR R4 document bundles:
//! - resources that make up a prescription (Composition, Practitioner, Patient, Encounter,
//!   Medication, MedicationRequest)
//! - intra-document `Type/id` references
//! - the `document` Bundle with JSON/YAML rendering
//!
//! This crate focuses on:
//! - FHIR semantic alignment (no REST transport, no profile validation)
//! - serialisation/deserialisation
//! - checking that a bundle's references resolve inside the bundle
//!
//! It knows nothing about EMR records; translation from native records lives in `hip-core`.

pub mod bundle;
pub mod datatypes;
pub mod reference;
pub mod resources;

// Re-export facades
pub use bundle::{Bundle, BundleEntry, BundleType, UnresolvedReference};
pub use reference::{Reference, ResourceType};
pub use resources::{
    AdministrativeGender, Composition, CompositionStatus, Encounter, EncounterStatus,
    Medication, MedicationRequest, MedicationRequestIntent, MedicationRequestStatus, Patient,
    Practitioner, Resource, Section,
};

// Re-export ResourceId from hip_uuid crate
pub use hip_uuid::ResourceId;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
