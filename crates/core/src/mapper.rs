//! Translation from native EMR records to FHIR resources.
//!
//! A mapper converts exactly one native record into one resource. It is stateless and knows
//! nothing about other resources except through the references it is handed.

use crate::constants::ACT_CODE_SYSTEM;
use crate::emr::{DrugOrder, EmrEncounter, EmrPatient, EmrProvider};
use chrono::{DateTime, Utc};
use fhir::datatypes::{CodeableConcept, Coding, Dosage, HumanName, Identifier, Period};
use fhir::{
    AdministrativeGender, Encounter, EncounterStatus, Medication, MedicationRequest,
    MedicationRequestIntent, MedicationRequestStatus, Patient, Practitioner, Reference, Resource,
};
use hip_uuid::{IdError, ResourceId};

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("{record} is missing {field}")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },
    #[error("{record} has an invalid id: {source}")]
    InvalidId {
        record: &'static str,
        #[source]
        source: IdError,
    },
    #[error("{record} has an unsupported {field}: {value}")]
    UnsupportedCode {
        record: &'static str,
        field: &'static str,
        value: String,
    },
}

/// Converts native records into FHIR resources.
pub trait ResourceMapper: Send + Sync {
    fn map_patient(&self, patient: &EmrPatient) -> Result<Patient, MappingError>;

    fn map_practitioner(&self, provider: &EmrProvider) -> Result<Practitioner, MappingError>;

    /// Maps the encounter; `composition_date` becomes the period start. The subject is left
    /// for the caller to link.
    fn map_encounter(
        &self,
        encounter: &EmrEncounter,
        composition_date: DateTime<Utc>,
    ) -> Result<Encounter, MappingError>;

    /// Returns `None` when the order carries no coded drug.
    fn map_medication(&self, order: &DrugOrder) -> Result<Option<Medication>, MappingError>;

    fn map_medication_request(
        &self,
        order: &DrugOrder,
        patient: &Reference,
        requester: Option<&Reference>,
        medication: Option<&Medication>,
    ) -> Result<MedicationRequest, MappingError>;
}

/// Default mapper producing FHIR R4 resources from EMR records.
#[derive(Clone, Copy, Debug, Default)]
pub struct FhirResourceMapper;

fn resource_id(record: &'static str, raw: &str) -> Result<ResourceId, MappingError> {
    if raw.trim().is_empty() {
        return Err(MappingError::MissingField {
            record,
            field: "uuid",
        });
    }
    ResourceId::parse(raw).map_err(|source| MappingError::InvalidId { record, source })
}

fn administrative_gender(code: &str) -> Result<AdministrativeGender, MappingError> {
    match code.trim().to_ascii_uppercase().as_str() {
        "M" => Ok(AdministrativeGender::Male),
        "F" => Ok(AdministrativeGender::Female),
        "O" => Ok(AdministrativeGender::Other),
        "U" => Ok(AdministrativeGender::Unknown),
        _ => Err(MappingError::UnsupportedCode {
            record: "Patient",
            field: "gender",
            value: code.to_string(),
        }),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ResourceMapper for FhirResourceMapper {
    fn map_patient(&self, patient: &EmrPatient) -> Result<Patient, MappingError> {
        let id = resource_id("Patient", &patient.uuid)?;
        let name = HumanName {
            text: None,
            family: non_blank(patient.family_name.as_deref()).map(str::to_owned),
            given: patient
                .given_names
                .iter()
                .filter_map(|g| non_blank(Some(g.as_str())))
                .map(str::to_owned)
                .collect(),
        };
        let gender = non_blank(patient.gender.as_deref())
            .map(administrative_gender)
            .transpose()?;

        Ok(Patient {
            id,
            name: if name == HumanName::default() {
                Vec::new()
            } else {
                vec![name]
            },
            gender,
            birth_date: patient.birth_date,
        })
    }

    fn map_practitioner(&self, provider: &EmrProvider) -> Result<Practitioner, MappingError> {
        let id = resource_id("Practitioner", &provider.uuid)?;
        let name = non_blank(provider.name.as_deref()).map(|n| HumanName {
            text: Some(n.to_owned()),
            ..HumanName::default()
        });
        let identifier = non_blank(provider.identifier.as_deref()).map(|value| Identifier {
            type_: Some(CodeableConcept::text("registration")),
            system: None,
            value: Some(value.to_owned()),
        });

        Ok(Practitioner {
            id,
            identifier: identifier.into_iter().collect(),
            name: name.into_iter().collect(),
        })
    }

    fn map_encounter(
        &self,
        encounter: &EmrEncounter,
        composition_date: DateTime<Utc>,
    ) -> Result<Encounter, MappingError> {
        let id = resource_id("Encounter", &encounter.uuid)?;

        Ok(Encounter {
            id,
            status: EncounterStatus::Finished,
            class: Coding::new(ACT_CODE_SYSTEM, "AMB", "ambulatory"),
            type_: non_blank(encounter.encounter_type.as_deref())
                .map(CodeableConcept::text)
                .into_iter()
                .collect(),
            subject: None,
            period: Some(Period {
                start: Some(composition_date),
                end: None,
            }),
        })
    }

    fn map_medication(&self, order: &DrugOrder) -> Result<Option<Medication>, MappingError> {
        let Some(drug) = order.order.drug.as_ref() else {
            return Ok(None);
        };
        let id = resource_id("Medication", &drug.uuid)?;
        let text = match non_blank(drug.strength.as_deref()) {
            Some(strength) => format!("{} {}", drug.name, strength),
            None => drug.name.to_string(),
        };

        Ok(Some(Medication {
            id,
            code: CodeableConcept::text(text),
        }))
    }

    fn map_medication_request(
        &self,
        order: &DrugOrder,
        patient: &Reference,
        requester: Option<&Reference>,
        medication: Option<&Medication>,
    ) -> Result<MedicationRequest, MappingError> {
        let line = &order.order;
        let id = resource_id("MedicationRequest", &line.uuid)?;

        let (medication_reference, medication_codeable_concept) = match medication {
            Some(m) => (Some(Resource::from(m.clone()).to_reference()), None),
            None => {
                let text = non_blank(line.drug_non_coded.as_deref())
                    .map(str::to_owned)
                    .or_else(|| line.drug.as_ref().map(|d| d.name.to_string()))
                    .ok_or(MappingError::MissingField {
                        record: "DrugOrder",
                        field: "drug",
                    })?;
                (None, Some(CodeableConcept::text(text)))
            }
        };

        Ok(MedicationRequest {
            id,
            status: MedicationRequestStatus::Active,
            intent: MedicationRequestIntent::Order,
            medication_reference,
            medication_codeable_concept,
            subject: patient.clone(),
            authored_on: line.date_activated,
            requester: requester.cloned(),
            dosage_instruction: non_blank(line.dosing_instructions.as_deref())
                .map(|text| Dosage {
                    text: text.to_owned(),
                })
                .into_iter()
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emr::fixtures;
    use fhir::ResourceType;
    use std::sync::Arc;

    fn patient_ref() -> Reference {
        Reference::new(ResourceType::Patient, &ResourceId::parse("PT1").unwrap())
    }

    #[test]
    fn maps_patient_demographics() {
        let patient = FhirResourceMapper
            .map_patient(&fixtures::encounter().patient)
            .expect("map patient");

        assert_eq!(patient.id.as_str(), "PT1");
        assert_eq!(patient.gender, Some(AdministrativeGender::Female));
        assert_eq!(patient.name[0].family.as_deref(), Some("Williams"));
        assert_eq!(patient.name[0].given, ["Sarah"]);
        assert_eq!(patient.birth_date.unwrap().to_string(), "1992-03-20");
    }

    #[test]
    fn patient_without_uuid_is_missing_field() {
        let mut emr = fixtures::encounter().patient;
        emr.uuid = " ".into();

        let err = FhirResourceMapper.map_patient(&emr).expect_err("missing uuid");
        assert!(matches!(
            err,
            MappingError::MissingField {
                record: "Patient",
                field: "uuid"
            }
        ));
    }

    #[test]
    fn patient_with_unknown_gender_is_rejected() {
        let mut emr = fixtures::encounter().patient;
        emr.gender = Some("X".into());

        let err = FhirResourceMapper.map_patient(&emr).expect_err("bad gender");
        assert!(matches!(err, MappingError::UnsupportedCode { field: "gender", .. }));
    }

    #[test]
    fn invalid_ids_are_reported_with_record() {
        let provider = fixtures::provider("P 1", "Dr. Anil Kumar");

        let err = FhirResourceMapper
            .map_practitioner(&provider)
            .expect_err("invalid id");
        assert!(matches!(err, MappingError::InvalidId { record: "Practitioner", .. }));
    }

    #[test]
    fn maps_practitioner_name_and_identifier() {
        let mut provider = fixtures::provider("P1", "Dr. Anil Kumar");
        provider.identifier = Some("MCI-4411".into());

        let practitioner = FhirResourceMapper
            .map_practitioner(&provider)
            .expect("map practitioner");
        assert_eq!(practitioner.name[0].text.as_deref(), Some("Dr. Anil Kumar"));
        assert_eq!(practitioner.identifier[0].value.as_deref(), Some("MCI-4411"));
    }

    #[test]
    fn maps_encounter_with_composition_date() {
        let emr = fixtures::encounter();
        let date = emr.encounter_datetime;

        let encounter = FhirResourceMapper
            .map_encounter(&emr, date)
            .expect("map encounter");
        assert_eq!(encounter.id.as_str(), "E123");
        assert_eq!(encounter.status, EncounterStatus::Finished);
        assert_eq!(encounter.class.code.as_deref(), Some("AMB"));
        assert_eq!(encounter.period.unwrap().start, Some(date));
        assert!(encounter.subject.is_none());
    }

    #[test]
    fn free_text_order_has_no_medication() {
        let orders = fixtures::scenario_orders();

        assert!(FhirResourceMapper.map_medication(&orders[1]).unwrap().is_none());
        let medication = FhirResourceMapper
            .map_medication(&orders[0])
            .unwrap()
            .expect("coded drug");
        assert_eq!(medication.id.as_str(), "M1");
        assert_eq!(medication.code.text.as_deref(), Some("Paracetamol 500mg"));
    }

    #[test]
    fn medication_request_links_medication_when_present() {
        let orders = fixtures::scenario_orders();
        let medication = FhirResourceMapper.map_medication(&orders[0]).unwrap();
        let requester = Reference::new(ResourceType::Practitioner, &ResourceId::parse("P1").unwrap());

        let request = FhirResourceMapper
            .map_medication_request(&orders[0], &patient_ref(), Some(&requester), medication.as_ref())
            .expect("map request");

        assert_eq!(request.id.as_str(), "D1");
        assert_eq!(
            request.medication_reference.as_ref().map(|r| r.reference.as_str()),
            Some("Medication/M1")
        );
        assert!(request.medication_codeable_concept.is_none());
        assert_eq!(request.requester, Some(requester));
        assert_eq!(request.dosage_instruction[0].text, "1 tablet twice daily");
    }

    #[test]
    fn medication_request_uses_free_text_without_medication() {
        let orders = fixtures::scenario_orders();

        let request = FhirResourceMapper
            .map_medication_request(&orders[1], &patient_ref(), None, None)
            .expect("map request");

        assert!(request.medication_reference.is_none());
        assert_eq!(
            request.medication_codeable_concept.unwrap().text.as_deref(),
            Some("Ginger syrup")
        );
        assert!(request.requester.is_none());
    }

    #[test]
    fn order_without_any_drug_fails() {
        let encounter = Arc::new(fixtures::encounter());
        let mut line = fixtures::free_text_order("D3", "x");
        line.drug_non_coded = None;
        let order = DrugOrder::new(encounter, line);

        let err = FhirResourceMapper
            .map_medication_request(&order, &patient_ref(), None, None)
            .expect_err("no drug");
        assert!(matches!(
            err,
            MappingError::MissingField {
                record: "DrugOrder",
                field: "drug"
            }
        ));
    }
}
