//! Native EMR records.
//!
//! These are the locally recorded shapes the prescription is built from: one encounter with
//! its patient and providers, and the drug orders placed during it. Every [`DrugOrder`] holds
//! a shared handle to its encounter, mirroring the EMR's order-to-encounter link.
//!
//! Records can be loaded from a JSON export of the form:
//!
//! ```json
//! { "encounter": { ... }, "drugOrders": [ { ... } ] }
//! ```

use crate::{PrescriptionError, PrescriptionResult};
use chrono::{DateTime, NaiveDate, Utc};
use hip_types::NonEmptyText;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmrPatient {
    pub uuid: String,
    #[serde(default)]
    pub given_names: Vec<String>,
    pub family_name: Option<String>,
    /// EMR gender code: `M`, `F`, `O` or `U`.
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmrProvider {
    pub uuid: String,
    pub name: Option<String>,
    /// Registry identifier (e.g. a professional registration number).
    pub identifier: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmrVisit {
    pub uuid: String,
    pub visit_type: NonEmptyText,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmrProgramEnrollment {
    pub uuid: String,
    pub program_name: NonEmptyText,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmrEncounter {
    /// Native encounter id, used in the prescription's business identifier.
    pub encounter_id: String,
    pub uuid: String,
    pub encounter_datetime: DateTime<Utc>,
    pub encounter_type: Option<String>,
    pub patient: EmrPatient,
    /// Providers in EMR order; the same provider may appear once per role.
    #[serde(default)]
    pub providers: Vec<EmrProvider>,
    pub visit: Option<EmrVisit>,
    pub program_enrollment: Option<EmrProgramEnrollment>,
}

impl EmrEncounter {
    /// Providers with duplicates (by uuid) removed, first occurrence wins.
    pub fn distinct_providers(&self) -> Vec<&EmrProvider> {
        let mut seen = HashSet::new();
        self.providers
            .iter()
            .filter(|p| seen.insert(p.uuid.as_str()))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmrDrug {
    pub uuid: String,
    pub name: NonEmptyText,
    pub strength: Option<String>,
}

/// The order-specific part of a drug order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderLine {
    pub uuid: String,
    /// Coded drug from the formulary.
    pub drug: Option<EmrDrug>,
    /// Free-text drug name for drugs outside the formulary.
    pub drug_non_coded: Option<String>,
    pub dosing_instructions: Option<String>,
    pub date_activated: Option<DateTime<Utc>>,
}

/// A drug order placed during an encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrugOrder {
    pub encounter: Arc<EmrEncounter>,
    pub order: OrderLine,
}

impl DrugOrder {
    pub fn new(encounter: Arc<EmrEncounter>, order: OrderLine) -> Self {
        Self { encounter, order }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EmrExport {
    encounter: EmrEncounter,
    #[serde(default)]
    drug_orders: Vec<OrderLine>,
}

/// Parse an EMR export into drug orders sharing one encounter.
///
/// # Errors
///
/// Returns [`PrescriptionError::Translation`] with the failing path when the JSON does not
/// match the export schema.
pub fn parse_drug_orders(json_text: &str) -> PrescriptionResult<Vec<DrugOrder>> {
    let mut deserializer = serde_json::Deserializer::from_str(json_text);

    let export = serde_path_to_error::deserialize::<_, EmrExport>(&mut deserializer).map_err(
        |err| {
            let path = err.path().to_string();
            let source = err.into_inner();
            PrescriptionError::Translation(format!("EMR export schema mismatch at {path}: {source}"))
        },
    )?;

    let encounter = Arc::new(export.encounter);
    Ok(export
        .drug_orders
        .into_iter()
        .map(|order| DrugOrder::new(Arc::clone(&encounter), order))
        .collect())
}

/// Read and parse an EMR export file.
///
/// # Errors
///
/// Returns [`PrescriptionError::FileRead`] if the file cannot be read, otherwise as
/// [`parse_drug_orders`].
pub fn load_drug_orders(path: &Path) -> PrescriptionResult<Vec<DrugOrder>> {
    let text = std::fs::read_to_string(path).map_err(PrescriptionError::FileRead)?;
    parse_drug_orders(&text)
}
