//! # HIP Core
//!
//! Core business logic for the health information provider (HIP) prescription service.
//!
//! This crate turns the drug orders recorded during one EMR encounter into a FHIR R4
//! prescription document:
//! - EMR records and export loading ([`emr`])
//! - record-to-resource mapping ([`mapper`])
//! - organisation context and care context resolution ([`organization`], [`care_context`])
//! - document assembly ([`prescription`])
//!
//! **No API concerns**: HTTP exposure and persistence are not part of this crate. Configuration
//! is resolved by the caller and passed in as an [`OrgConfig`].

pub mod care_context;
pub mod config;
pub mod constants;
pub mod emr;
pub mod error;
pub mod mapper;
pub mod organization;
pub mod prescription;
pub mod validation;

pub use care_context::{
    CareContext, CareContextError, CareContextRepository, CareContextResolver,
    CareContextService, CareContextType, InMemoryCareContextRepository,
};
pub use config::OrgConfig;
pub use emr::{load_drug_orders, parse_drug_orders, DrugOrder, EmrEncounter};
pub use error::{PrescriptionError, PrescriptionResult};
pub use mapper::{FhirResourceMapper, MappingError, ResourceMapper};
pub use organization::{ConfigOrganizationResolver, OrganizationContext, OrganizationResolver};
pub use prescription::{requesting_author, Prescription, PrescriptionGenerator};
