//! Organisation configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into services. The intent is to avoid reading process-wide settings while a document
//! is being assembled.

use crate::care_context::CareContextType;
use crate::constants::{
    ENV_BASE_URL, ENV_CARE_CONTEXT_TYPE, ENV_FACILITY_ID, ENV_FACILITY_NAME, ENV_FACILITY_SYSTEM,
};
use crate::PrescriptionResult;

/// Facility identity and base URL resolved at startup.
///
/// Values are stored as given, minus surrounding whitespace; blank values are treated as
/// absent. Nothing is required at this point: consumers report
/// [`crate::PrescriptionError::ConfigurationMissing`] when they need a value that is absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrgConfig {
    facility_id: Option<String>,
    facility_name: Option<String>,
    facility_system: Option<String>,
    base_url: Option<String>,
    care_context_type: CareContextType,
}

fn normalise(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl OrgConfig {
    /// Create a new `OrgConfig`.
    pub fn new(
        facility_id: Option<String>,
        facility_name: Option<String>,
        facility_system: Option<String>,
        base_url: Option<String>,
        care_context_type: CareContextType,
    ) -> Self {
        Self {
            facility_id: normalise(facility_id),
            facility_name: normalise(facility_name),
            facility_system: normalise(facility_system),
            base_url: normalise(base_url),
            care_context_type,
        }
    }

    /// Build from a key lookup such as `std::env::var(..).ok()`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PrescriptionError::InvalidInput`] if the care context type is set to
    /// an unknown value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PrescriptionResult<Self> {
        let care_context_type = care_context_type_from_env_value(lookup(ENV_CARE_CONTEXT_TYPE))?;
        Ok(Self::new(
            lookup(ENV_FACILITY_ID),
            lookup(ENV_FACILITY_NAME),
            lookup(ENV_FACILITY_SYSTEM),
            lookup(ENV_BASE_URL),
            care_context_type,
        ))
    }

    pub fn facility_id(&self) -> Option<&str> {
        self.facility_id.as_deref()
    }

    pub fn facility_name(&self) -> Option<&str> {
        self.facility_name.as_deref()
    }

    pub fn facility_system(&self) -> Option<&str> {
        self.facility_system.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn care_context_type(&self) -> CareContextType {
        self.care_context_type
    }
}

/// Parse the care context type from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default ([`CareContextType::Visit`]).
pub fn care_context_type_from_env_value(
    value: Option<String>,
) -> PrescriptionResult<CareContextType> {
    let parsed = normalise(value)
        .map(|v| v.parse::<CareContextType>())
        .transpose()?;

    Ok(parsed.unwrap_or_default())
}
