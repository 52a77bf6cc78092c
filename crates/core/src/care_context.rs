//! Care contexts.
//!
//! A care context is the handle external health-information systems use to locate the
//! documents of a patient: either the visit an encounter belongs to or the program the patient
//! is enrolled in.

use crate::emr::EmrEncounter;
use crate::PrescriptionError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// What a care context groups documents by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CareContextType {
    #[default]
    Visit,
    Program,
}

impl fmt::Display for CareContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CareContextType::Visit => f.write_str("visit"),
            CareContextType::Program => f.write_str("program"),
        }
    }
}

impl FromStr for CareContextType {
    type Err = PrescriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("visit") {
            Ok(CareContextType::Visit)
        } else if s.eq_ignore_ascii_case("program") {
            Ok(CareContextType::Program)
        } else {
            Err(PrescriptionError::InvalidInput(format!(
                "unknown care context type '{s}' (expected 'visit' or 'program')"
            )))
        }
    }
}

/// Opaque handle attached to a prescription for downstream lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareContext {
    pub care_context_type: CareContextType,
    pub care_context_name: String,
    pub care_context_reference: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CareContextError {
    #[error("encounter {encounter} has no {context_type} to use as care context")]
    Unavailable {
        encounter: String,
        context_type: CareContextType,
    },
    #[error("patient not found: {0}")]
    PatientNotFound(String),
}

/// Resolves the care context a document belongs to.
pub trait CareContextResolver: Send + Sync {
    fn resolve(
        &self,
        encounter: &EmrEncounter,
        context_type: CareContextType,
    ) -> Result<CareContext, CareContextError>;
}

/// Stored care contexts per patient.
pub trait CareContextRepository: Send + Sync {
    fn patient_exists(&self, patient_uuid: &str) -> bool;

    fn patient_care_contexts(&self, patient_uuid: &str) -> Vec<CareContext>;
}

/// Repository backed by a map; used when no EMR store is attached.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCareContextRepository {
    contexts: HashMap<String, Vec<CareContext>>,
}

impl InMemoryCareContextRepository {
    /// Registers a patient with no care contexts yet.
    pub fn add_patient(&mut self, patient_uuid: impl Into<String>) {
        self.contexts.entry(patient_uuid.into()).or_default();
    }

    pub fn add_care_context(&mut self, patient_uuid: impl Into<String>, context: CareContext) {
        self.contexts
            .entry(patient_uuid.into())
            .or_default()
            .push(context);
    }
}

impl CareContextRepository for InMemoryCareContextRepository {
    fn patient_exists(&self, patient_uuid: &str) -> bool {
        self.contexts.contains_key(patient_uuid)
    }

    fn patient_care_contexts(&self, patient_uuid: &str) -> Vec<CareContext> {
        self.contexts.get(patient_uuid).cloned().unwrap_or_default()
    }
}

/// Care context lookups for encounters and patients.
#[derive(Clone, Debug, Default)]
pub struct CareContextService<R = InMemoryCareContextRepository> {
    repository: R,
}

impl<R: CareContextRepository> CareContextService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// All care contexts recorded for a patient.
    ///
    /// # Errors
    ///
    /// Returns [`CareContextError::PatientNotFound`] if the repository does not know the
    /// patient.
    pub fn care_contexts_for_patient(
        &self,
        patient_uuid: &str,
    ) -> Result<Vec<CareContext>, CareContextError> {
        if !self.repository.patient_exists(patient_uuid) {
            return Err(CareContextError::PatientNotFound(patient_uuid.to_string()));
        }
        Ok(self.repository.patient_care_contexts(patient_uuid))
    }
}

impl<R: CareContextRepository> CareContextResolver for CareContextService<R> {
    fn resolve(
        &self,
        encounter: &EmrEncounter,
        context_type: CareContextType,
    ) -> Result<CareContext, CareContextError> {
        let unavailable = || CareContextError::Unavailable {
            encounter: encounter.encounter_id.clone(),
            context_type,
        };

        match context_type {
            CareContextType::Visit => {
                let visit = encounter.visit.as_ref().ok_or_else(unavailable)?;
                Ok(CareContext {
                    care_context_type: context_type,
                    care_context_name: visit.visit_type.to_string(),
                    care_context_reference: visit.uuid.clone(),
                })
            }
            CareContextType::Program => {
                let enrollment = encounter
                    .program_enrollment
                    .as_ref()
                    .ok_or_else(unavailable)?;
                Ok(CareContext {
                    care_context_type: context_type,
                    care_context_name: enrollment.program_name.to_string(),
                    care_context_reference: enrollment.uuid.clone(),
                })
            }
        }
    }
}
