//! Intra-document references.
//!
//! Resources inside a prescription document point at each other with relative references of
//! the form `Type/id`. A reference is only a lookup key; it never owns the target.

use crate::FhirError;
use hip_uuid::ResourceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The resource kinds that can appear in a prescription document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Composition,
    Practitioner,
    Patient,
    Encounter,
    Medication,
    MedicationRequest,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Composition => "Composition",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::Patient => "Patient",
            ResourceType::Encounter => "Encounter",
            ResourceType::Medication => "Medication",
            ResourceType::MedicationRequest => "MedicationRequest",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = FhirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Composition" => Ok(ResourceType::Composition),
            "Practitioner" => Ok(ResourceType::Practitioner),
            "Patient" => Ok(ResourceType::Patient),
            "Encounter" => Ok(ResourceType::Encounter),
            "Medication" => Ok(ResourceType::Medication),
            "MedicationRequest" => Ok(ResourceType::MedicationRequest),
            other => Err(FhirError::InvalidInput(format!(
                "unsupported resource type: {other}"
            ))),
        }
    }
}

/// A pointer from one resource to another in the same bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Relative literal reference, `Type/id`.
    pub reference: String,

    /// Human-readable label for the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    /// Builds a `Type/id` reference without display text.
    pub fn new(resource_type: ResourceType, id: &ResourceId) -> Self {
        Self {
            reference: format!("{resource_type}/{id}"),
            display: None,
        }
    }

    /// Attaches display text.
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Splits the literal reference into its type and id.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidInput`] for anything other than a relative `Type/id`
    /// reference to a supported resource type.
    pub fn target(&self) -> Result<(ResourceType, ResourceId), FhirError> {
        let (type_part, id_part) = self.reference.split_once('/').ok_or_else(|| {
            FhirError::InvalidInput(format!("malformed reference: {}", self.reference))
        })?;
        let resource_type = type_part.parse::<ResourceType>()?;
        let id = ResourceId::parse(id_part)
            .map_err(|e| FhirError::InvalidInput(format!("invalid reference id: {e}")))?;
        Ok((resource_type, id))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}
