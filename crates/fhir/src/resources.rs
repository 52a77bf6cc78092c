//! FHIR R4 resources that make up a prescription document.
//!
//! Only the elements a prescription document populates are modelled. Every resource carries a
//! validated logical id so that `Type/id` references can be built from it directly.

use crate::datatypes::{CodeableConcept, Coding, Dosage, HumanName, Identifier, Period};
use crate::reference::{Reference, ResourceType};
use chrono::{DateTime, NaiveDate, Utc};
use hip_types::NonEmptyText;
use hip_uuid::ResourceId;
use serde::{Deserialize, Serialize};

// ============================================================================
// Composition
// ============================================================================

/// Workflow status of a composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositionStatus {
    Preliminary,
    Final,
    Amended,
    EnteredInError,
}

/// The root record of a document: who, about whom, during what, and which sections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    pub id: ResourceId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,

    pub status: CompositionStatus,

    #[serde(rename = "type")]
    pub type_: CodeableConcept,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,

    pub date: DateTime<Utc>,

    #[serde(default)]
    pub author: Vec<Reference>,

    pub title: NonEmptyText,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub section: Vec<Section>,
}

impl Composition {
    /// Adds an author reference and returns it.
    pub fn add_author(&mut self, author: Reference) -> &Reference {
        self.author.push(author);
        &self.author[self.author.len() - 1]
    }

    /// Adds a section and returns a mutable handle to it.
    pub fn add_section(&mut self, section: Section) -> &mut Section {
        self.section.push(section);
        let last = self.section.len() - 1;
        &mut self.section[last]
    }
}

/// A titled, coded grouping of references inside a composition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: NonEmptyText,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    #[serde(default)]
    pub entry: Vec<Reference>,
}

impl Section {
    pub fn new(title: NonEmptyText, code: CodeableConcept) -> Self {
        Self {
            title,
            code: Some(code),
            entry: Vec::new(),
        }
    }
}

// ============================================================================
// Participants
// ============================================================================

/// Administrative gender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdministrativeGender {
    Male,
    Female,
    Other,
    Unknown,
}

/// A clinician authoring the prescription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Practitioner {
    pub id: ResourceId,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,
}

/// The subject of the prescription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: ResourceId,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<AdministrativeGender>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
}

/// Returns the display text for the first name of a resource, if any.
///
/// Prefers the name's `text`, then falls back to given names followed by the family name.
pub fn display_name(names: &[HumanName]) -> Option<NonEmptyText> {
    let name = names.first()?;
    if let Some(text) = name.text.as_deref().and_then(|t| NonEmptyText::new(t).ok()) {
        return Some(text);
    }
    NonEmptyText::join(name.given.iter().chain(name.family.iter()))
}

// ============================================================================
// Encounter
// ============================================================================

/// Encounter lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncounterStatus {
    Planned,
    InProgress,
    Finished,
    Cancelled,
}

/// The clinical encounter during which the drugs were ordered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: ResourceId,

    pub status: EncounterStatus,

    pub class: Coding,

    #[serde(default, rename = "type", skip_serializing_if = "Vec::is_empty")]
    pub type_: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

// ============================================================================
// Medication
// ============================================================================

/// A coded drug prescribed by an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub id: ResourceId,

    pub code: CodeableConcept,
}

/// Status of a medication request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MedicationRequestStatus {
    Active,
    OnHold,
    Cancelled,
    Completed,
    Stopped,
}

/// Intent of a medication request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MedicationRequestIntent {
    Proposal,
    Plan,
    Order,
}

/// One prescribed drug order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    pub id: ResourceId,

    pub status: MedicationRequestStatus,

    pub intent: MedicationRequestIntent,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub medication_reference: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub medication_codeable_concept: Option<CodeableConcept>,

    pub subject: Reference,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authored_on: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage_instruction: Vec<Dosage>,
}

// ============================================================================
// Resource
// ============================================================================

/// Any resource that can be placed in a prescription document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Composition(Composition),
    Practitioner(Practitioner),
    Patient(Patient),
    Encounter(Encounter),
    Medication(Medication),
    MedicationRequest(MedicationRequest),
}

impl Resource {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::Composition(_) => ResourceType::Composition,
            Resource::Practitioner(_) => ResourceType::Practitioner,
            Resource::Patient(_) => ResourceType::Patient,
            Resource::Encounter(_) => ResourceType::Encounter,
            Resource::Medication(_) => ResourceType::Medication,
            Resource::MedicationRequest(_) => ResourceType::MedicationRequest,
        }
    }

    pub fn id(&self) -> &ResourceId {
        match self {
            Resource::Composition(r) => &r.id,
            Resource::Practitioner(r) => &r.id,
            Resource::Patient(r) => &r.id,
            Resource::Encounter(r) => &r.id,
            Resource::Medication(r) => &r.id,
            Resource::MedicationRequest(r) => &r.id,
        }
    }

    /// A `Type/id` reference to this resource, with display text where the resource has a
    /// name.
    pub fn to_reference(&self) -> Reference {
        let reference = Reference::new(self.resource_type(), self.id());
        let display = match self {
            Resource::Practitioner(p) => display_name(&p.name),
            Resource::Patient(p) => display_name(&p.name),
            Resource::Medication(m) => m.code.text.as_deref().and_then(|t| NonEmptyText::new(t).ok()),
            _ => None,
        };
        match display {
            Some(display) => reference.with_display(display.into_string()),
            None => reference,
        }
    }

    /// Every reference this resource holds to other resources.
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            Resource::Composition(c) => c
                .author
                .iter()
                .chain(c.subject.iter())
                .chain(c.encounter.iter())
                .chain(c.section.iter().flat_map(|s| s.entry.iter()))
                .collect(),
            Resource::Encounter(e) => e.subject.iter().collect(),
            Resource::MedicationRequest(m) => std::iter::once(&m.subject)
                .chain(m.medication_reference.iter())
                .chain(m.requester.iter())
                .collect(),
            Resource::Practitioner(_) | Resource::Patient(_) | Resource::Medication(_) => {
                Vec::new()
            }
        }
    }
}

macro_rules! impl_into_resource {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for Resource {
                fn from(value: $ty) -> Self {
                    Resource::$ty(value)
                }
            }
        )*
    };
}

impl_into_resource!(
    Composition,
    Practitioner,
    Patient,
    Encounter,
    Medication,
    MedicationRequest
);
