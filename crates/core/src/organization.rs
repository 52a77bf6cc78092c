//! Organisation context resolution.
//!
//! The organisation context tells the assembler which facility it is producing documents for
//! and under which base URL their identifiers live. It is resolved from an injected
//! [`OrgConfig`], never from process-wide state.

use crate::care_context::CareContextType;
use crate::config::OrgConfig;
use crate::{PrescriptionError, PrescriptionResult};

/// Facility identity, base URL and care context type for one assembly call.
///
/// Absent values stay absent until a consumer reads them through an accessor, which then
/// fails with [`PrescriptionError::ConfigurationMissing`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrganizationContext {
    facility_id: Option<String>,
    facility_name: Option<String>,
    facility_system: Option<String>,
    base_url: Option<String>,
    care_context_type: CareContextType,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> PrescriptionResult<&'a str> {
    value
        .as_deref()
        .ok_or(PrescriptionError::ConfigurationMissing(field))
}

impl OrganizationContext {
    pub fn from_config(config: &OrgConfig) -> Self {
        Self {
            facility_id: config.facility_id().map(str::to_owned),
            facility_name: config.facility_name().map(str::to_owned),
            facility_system: config.facility_system().map(str::to_owned),
            base_url: config.base_url().map(str::to_owned),
            care_context_type: config.care_context_type(),
        }
    }

    pub fn facility_id(&self) -> PrescriptionResult<&str> {
        required(&self.facility_id, "facility_id")
    }

    pub fn facility_name(&self) -> PrescriptionResult<&str> {
        required(&self.facility_name, "facility_name")
    }

    pub fn facility_system(&self) -> PrescriptionResult<&str> {
        required(&self.facility_system, "facility_system")
    }

    /// Canonical base URL; identifier systems are derived from it.
    pub fn base_url(&self) -> PrescriptionResult<&str> {
        required(&self.base_url, "base_url")
    }

    pub fn care_context_type(&self) -> CareContextType {
        self.care_context_type
    }
}

/// Supplies the organisation context for an assembly call.
pub trait OrganizationResolver: Send + Sync {
    fn resolve(&self) -> OrganizationContext;
}

/// Resolves from configuration read once at startup.
#[derive(Clone, Debug)]
pub struct ConfigOrganizationResolver {
    config: OrgConfig,
}

impl ConfigOrganizationResolver {
    pub fn new(config: OrgConfig) -> Self {
        Self { config }
    }
}

impl OrganizationResolver for ConfigOrganizationResolver {
    fn resolve(&self) -> OrganizationContext {
        OrganizationContext::from_config(&self.config)
    }
}
