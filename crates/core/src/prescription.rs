//! Prescription document assembly.
//!
//! [`PrescriptionGenerator`] turns the drug orders of one encounter into a FHIR `document`
//! bundle. Entry order is part of the output contract:
//!
//! ```text
//! Composition, Practitioner*, Patient, Encounter, (Medication?, MedicationRequest)*
//! ```
//!
//! The composition is built up alongside the other resources and placed as the first entry
//! once it is complete. Every reference a MedicationRequest holds points at an entry placed
//! before it; the composition's references all resolve within the bundle.

use crate::care_context::{CareContext, CareContextResolver, CareContextService};
use crate::constants::{
    BUNDLE_IDENTIFIER_TYPE, DOCUMENT_IDENTIFIER_TYPE, PRESCRIPTION_ID_PREFIX,
    PRESCRIPTION_RECORD_CODE, PRESCRIPTION_RECORD_DISPLAY, PRESCRIPTION_SECTION_TITLE,
    PRESCRIPTION_TITLE, SNOMED_SYSTEM,
};
use crate::emr::DrugOrder;
use crate::mapper::{FhirResourceMapper, ResourceMapper};
use crate::organization::{OrganizationContext, OrganizationResolver};
use crate::validation::validate_drug_orders;
use crate::{PrescriptionError, PrescriptionResult};
use fhir::datatypes::{CodeableConcept, Coding, Identifier};
use fhir::{Bundle, Composition, CompositionStatus, Reference, Resource, Section};
use hip_types::NonEmptyText;
use hip_uuid::{IdGenerator, RandomIdGenerator, ResourceId};

/// An assembled prescription and the care context it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prescription {
    pub bundle: Bundle,
    pub care_context: CareContext,
}

/// The author that requests every medication of a prescription: the first one.
///
/// Providers after the first are listed as authors but never become requesters.
pub fn requesting_author(authors: &[Reference]) -> Option<&Reference> {
    authors.first()
}

fn prescription_type() -> CodeableConcept {
    CodeableConcept::coded(Coding::new(
        SNOMED_SYSTEM,
        PRESCRIPTION_RECORD_CODE,
        PRESCRIPTION_RECORD_DISPLAY,
    ))
}

fn title(value: &str) -> PrescriptionResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|e| PrescriptionError::InvalidInput(e.to_string()))
}

/// System of composition identifiers: `<base url>/document`.
fn document_system(base_url: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        DOCUMENT_IDENTIFIER_TYPE
    )
}

/// Assembles prescription documents from drug orders.
///
/// The mapper, care context resolver and id generator are injected; [`PrescriptionGenerator::new`]
/// wires the defaults.
#[derive(Clone, Debug)]
pub struct PrescriptionGenerator<
    M = FhirResourceMapper,
    C = CareContextService,
    G = RandomIdGenerator,
> {
    mapper: M,
    care_contexts: C,
    ids: G,
}

impl PrescriptionGenerator {
    pub fn new() -> Self {
        Self::with_parts(
            FhirResourceMapper,
            CareContextService::default(),
            RandomIdGenerator,
        )
    }
}

impl Default for PrescriptionGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl<M, C, G> PrescriptionGenerator<M, C, G>
where
    M: ResourceMapper,
    C: CareContextResolver,
    G: IdGenerator,
{
    pub fn with_parts(mapper: M, care_contexts: C, ids: G) -> Self {
        Self {
            mapper,
            care_contexts,
            ids,
        }
    }

    /// Resolves the organisation context, then assembles.
    pub fn generate(
        &self,
        drug_orders: &[DrugOrder],
        organization: &impl OrganizationResolver,
    ) -> PrescriptionResult<Prescription> {
        let context = organization.resolve();
        self.assemble(drug_orders, &context)
    }

    /// Builds the prescription document for drug orders of a single encounter.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [`crate::PrescriptionError::EmptyDrugOrders`] or
    ///   [`crate::PrescriptionError::MixedEncounters`] for invalid input,
    /// - [`crate::PrescriptionError::ConfigurationMissing`] if the base URL is absent,
    /// - [`crate::PrescriptionError::Mapping`] or [`crate::PrescriptionError::CareContext`]
    ///   as returned by the collaborators.
    ///
    /// No partial bundle is returned on failure.
    pub fn assemble(
        &self,
        drug_orders: &[DrugOrder],
        organization: &OrganizationContext,
    ) -> PrescriptionResult<Prescription> {
        let encounter = validate_drug_orders(drug_orders)?;
        let base_url = organization.base_url()?;
        let date = encounter.encounter_datetime;

        let bundle_value = format!("{PRESCRIPTION_ID_PREFIX}{}", encounter.encounter_id);
        // The business identifier always carries the value; the logical id only when valid.
        let bundle_id = ResourceId::parse(&bundle_value).ok();
        if bundle_id.is_none() {
            tracing::debug!(identifier = %bundle_value, "bundle identifier is not a valid logical id");
        }
        let mut bundle = Bundle::document(
            bundle_id,
            Identifier::new(base_url, bundle_value.as_str(), BUNDLE_IDENTIFIER_TYPE),
            date,
        );

        let composition_id = self.ids.next_id();
        let mut composition = Composition {
            identifier: Some(Identifier::new(
                document_system(base_url),
                composition_id.as_str(),
                DOCUMENT_IDENTIFIER_TYPE,
            )),
            id: composition_id,
            status: CompositionStatus::Final,
            type_: prescription_type(),
            subject: None,
            encounter: None,
            date,
            author: Vec::new(),
            title: title(PRESCRIPTION_TITLE)?,
            section: Vec::new(),
        };
        let mut entries: Vec<Resource> = Vec::new();

        for provider in encounter.distinct_providers() {
            let practitioner = Resource::from(self.mapper.map_practitioner(provider)?);
            composition.add_author(practitioner.to_reference());
            entries.push(practitioner);
        }

        let patient = Resource::from(self.mapper.map_patient(&encounter.patient)?);
        let patient_ref = patient.to_reference();
        composition.subject = Some(patient_ref.clone());
        entries.push(patient);

        let mut fhir_encounter = self.mapper.map_encounter(encounter, date)?;
        fhir_encounter.subject = Some(patient_ref.clone());
        let fhir_encounter = Resource::from(fhir_encounter);
        composition.encounter = Some(fhir_encounter.to_reference());
        entries.push(fhir_encounter);

        let requester = requesting_author(&composition.author).cloned();
        let mut section = Section::new(title(PRESCRIPTION_SECTION_TITLE)?, prescription_type());

        for order in drug_orders {
            let medication = self.mapper.map_medication(order)?;
            if medication.is_none() {
                tracing::debug!(order = %order.order.uuid, "drug order has no coded medication");
            }
            let request = Resource::from(self.mapper.map_medication_request(
                order,
                &patient_ref,
                requester.as_ref(),
                medication.as_ref(),
            )?);
            section.entry.push(request.to_reference());

            entries.extend(medication.map(Resource::from));
            entries.push(request);
        }
        composition.add_section(section);

        let care_context = self
            .care_contexts
            .resolve(encounter, organization.care_context_type())?;

        bundle.add_entry(composition, false);
        for entry in entries {
            bundle.add_entry(entry, false);
        }
        debug_assert!(bundle.unresolved_references().is_empty());

        tracing::info!(
            encounter = %encounter.encounter_id,
            bundle = %bundle_value,
            entries = bundle.entries().len(),
            "assembled prescription document"
        );

        Ok(Prescription {
            bundle,
            care_context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::care_context::{CareContextError, CareContextType, InMemoryCareContextRepository};
    use crate::config::OrgConfig;
    use crate::emr::{fixtures, EmrEncounter, EmrPatient, EmrProvider};
    use crate::mapper::MappingError;
    use crate::organization::ConfigOrganizationResolver;
    use chrono::{DateTime, Utc};
    use fhir::{Encounter, Medication, MedicationRequest, Patient, Practitioner, ResourceType};
    use hip_uuid::SequentialIdGenerator;
    use std::sync::Arc;

    const BASE_URL: &str = "https://hip.example.org";

    fn config(base_url: Option<&str>) -> OrgConfig {
        OrgConfig::new(
            Some("IN2810000012".into()),
            Some("City Hospital".into()),
            Some("https://facility.ndhm.gov.in".into()),
            base_url.map(str::to_owned),
            CareContextType::Visit,
        )
    }

    fn organization() -> OrganizationContext {
        OrganizationContext::from_config(&config(Some(BASE_URL)))
    }

    fn generator() -> PrescriptionGenerator<FhirResourceMapper, CareContextService, SequentialIdGenerator> {
        PrescriptionGenerator::with_parts(
            FhirResourceMapper,
            CareContextService::default(),
            SequentialIdGenerator::new("doc").unwrap(),
        )
    }

    fn entry_labels(bundle: &Bundle) -> Vec<String> {
        bundle
            .resources()
            .map(|r| match r {
                Resource::Composition(_) => "Composition".to_string(),
                other => other.to_reference().reference,
            })
            .collect()
    }

    #[test]
    fn scenario_produces_documented_entry_order() {
        let prescription = generator()
            .assemble(&fixtures::scenario_orders(), &organization())
            .expect("assemble");

        assert_eq!(
            entry_labels(&prescription.bundle),
            [
                "Composition",
                "Practitioner/P1",
                "Patient/PT1",
                "Encounter/E123",
                "Medication/M1",
                "MedicationRequest/D1",
                "MedicationRequest/D2",
            ]
        );
    }

    #[test]
    fn medications_interleave_with_their_requests() {
        let encounter = Arc::new(fixtures::encounter());
        let orders = vec![
            DrugOrder::new(Arc::clone(&encounter), fixtures::coded_order("D1", "M1", "Paracetamol 500mg")),
            DrugOrder::new(Arc::clone(&encounter), fixtures::free_text_order("D2", "Ginger syrup")),
            DrugOrder::new(encounter, fixtures::coded_order("D3", "M3", "Amoxicillin 250mg")),
        ];

        let prescription = generator()
            .assemble(&orders, &organization())
            .expect("assemble");

        assert_eq!(
            entry_labels(&prescription.bundle)[4..],
            [
                "Medication/M1",
                "MedicationRequest/D1",
                "MedicationRequest/D2",
                "Medication/M3",
                "MedicationRequest/D3",
            ]
        );
        let section = &prescription.bundle.composition().unwrap().section[0];
        let refs: Vec<_> = section.entry.iter().map(|r| r.reference.as_str()).collect();
        assert_eq!(refs, ["MedicationRequest/D1", "MedicationRequest/D2", "MedicationRequest/D3"]);
    }

    #[test]
    fn encounter_id_outside_logical_id_syntax_keeps_identifier() {
        let mut encounter = fixtures::encounter();
        encounter.encounter_id = "ENC_42".into();
        let orders = vec![DrugOrder::new(
            Arc::new(encounter),
            fixtures::free_text_order("D1", "Ginger syrup"),
        )];

        let prescription = generator()
            .assemble(&orders, &organization())
            .expect("assemble");
        let bundle = &prescription.bundle;

        assert!(bundle.id.is_none());
        assert_eq!(bundle.identifier.value.as_deref(), Some("PR-ENC_42"));
        assert_eq!(bundle.identifier.system.as_deref(), Some(BASE_URL));

        let json = serde_json::to_value(bundle).unwrap();
        assert!(json.get("id").is_none());
    }

    #[test]
    fn long_encounter_id_does_not_abort_assembly() {
        let mut encounter = fixtures::encounter();
        encounter.encounter_id = "9".repeat(62);
        let orders = vec![DrugOrder::new(
            Arc::new(encounter),
            fixtures::free_text_order("D1", "Ginger syrup"),
        )];

        let prescription = generator()
            .assemble(&orders, &organization())
            .expect("assemble");
        assert!(prescription.bundle.id.is_none());
        assert_eq!(
            prescription.bundle.identifier.value.as_deref(),
            Some(format!("PR-{}", "9".repeat(62)).as_str())
        );
    }

    #[test]
    fn scenario_section_lists_requests_in_input_order() {
        let prescription = generator()
            .assemble(&fixtures::scenario_orders(), &organization())
            .expect("assemble");
        let composition = prescription.bundle.composition().expect("first entry");

        assert_eq!(composition.section.len(), 1);
        let section = &composition.section[0];
        assert_eq!(section.title.as_str(), "OPD Prescription");
        let refs: Vec<_> = section.entry.iter().map(|r| r.reference.as_str()).collect();
        assert_eq!(refs, ["MedicationRequest/D1", "MedicationRequest/D2"]);
    }

    #[test]
    fn bundle_identity_derives_from_encounter_and_base_url() {
        let prescription = generator()
            .assemble(&fixtures::scenario_orders(), &organization())
            .expect("assemble");
        let bundle = &prescription.bundle;

        assert_eq!(bundle.id.as_ref().map(ResourceId::as_str), Some("PR-E123"));
        assert_eq!(bundle.identifier.value.as_deref(), Some("PR-E123"));
        assert_eq!(bundle.identifier.system.as_deref(), Some(BASE_URL));
        assert_eq!(bundle.timestamp, fixtures::encounter().encounter_datetime);

        let composition = bundle.composition().unwrap();
        let identifier = composition.identifier.as_ref().unwrap();
        assert_eq!(identifier.system.as_deref(), Some("https://hip.example.org/document"));
        assert_eq!(identifier.value.as_deref(), Some(composition.id.as_str()));
        assert_eq!(composition.status, CompositionStatus::Final);
        assert_eq!(composition.title.as_str(), "Prescription");
        assert_eq!(composition.date, bundle.timestamp);
        assert_eq!(
            composition.type_.coding[0].code.as_deref(),
            Some(PRESCRIPTION_RECORD_CODE)
        );
    }

    #[test]
    fn composition_links_author_subject_and_encounter() {
        let prescription = generator()
            .assemble(&fixtures::scenario_orders(), &organization())
            .expect("assemble");
        let composition = prescription.bundle.composition().unwrap();

        assert_eq!(composition.author.len(), 1);
        assert_eq!(composition.author[0].reference, "Practitioner/P1");
        assert_eq!(composition.author[0].display.as_deref(), Some("Dr. Anil Kumar"));
        assert_eq!(composition.subject.as_ref().unwrap().reference, "Patient/PT1");
        assert_eq!(composition.encounter.as_ref().unwrap().reference, "Encounter/E123");

        let Some(Resource::Encounter(encounter)) = prescription.bundle.resources().nth(3) else {
            panic!("fourth entry is the encounter");
        };
        assert_eq!(encounter.subject.as_ref().unwrap().reference, "Patient/PT1");
    }

    #[test]
    fn references_resolve_and_requests_point_backwards() {
        let prescription = generator()
            .assemble(&fixtures::scenario_orders(), &organization())
            .expect("assemble");
        let bundle = &prescription.bundle;

        assert!(bundle.unresolved_references().is_empty());
        for (index, resource) in bundle.resources().enumerate() {
            if let Resource::MedicationRequest(_) = resource {
                for reference in resource.references() {
                    let target = bundle.position_of(reference).expect("resolves");
                    assert!(target < index, "{} points forward", reference.reference);
                }
            }
        }
    }

    #[test]
    fn requests_match_orders_and_use_first_author() {
        let mut encounter = fixtures::encounter();
        encounter.providers = vec![
            fixtures::provider("P1", "Dr. Anil Kumar"),
            fixtures::provider("P2", "Dr. Meera Shah"),
            fixtures::provider("P1", "Dr. Anil Kumar"),
        ];
        let encounter = Arc::new(encounter);
        let orders: Vec<_> = ["D1", "D2", "D3"]
            .into_iter()
            .map(|id| DrugOrder::new(Arc::clone(&encounter), fixtures::free_text_order(id, "Syrup")))
            .collect();

        let prescription = generator()
            .assemble(&orders, &organization())
            .expect("assemble");
        let bundle = &prescription.bundle;

        let practitioners = bundle
            .resources()
            .filter(|r| r.resource_type() == ResourceType::Practitioner)
            .count();
        assert_eq!(practitioners, 2);
        assert_eq!(bundle.composition().unwrap().author.len(), 2);

        let requests: Vec<&MedicationRequest> = bundle
            .resources()
            .filter_map(|r| match r {
                Resource::MedicationRequest(m) => Some(m),
                _ => None,
            })
            .collect();
        let ids: Vec<_> = requests.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["D1", "D2", "D3"]);
        assert!(requests.iter().all(|m| {
            m.requester.as_ref().map(|r| r.reference.as_str()) == Some("Practitioner/P1")
        }));
    }

    #[test]
    fn encounter_without_providers_has_no_requester() {
        let mut encounter = fixtures::encounter();
        encounter.providers.clear();
        let orders = vec![DrugOrder::new(
            Arc::new(encounter),
            fixtures::free_text_order("D1", "Ginger syrup"),
        )];

        let prescription = generator()
            .assemble(&orders, &organization())
            .expect("assemble");
        let composition = prescription.bundle.composition().unwrap();
        assert!(composition.author.is_empty());

        let Some(Resource::MedicationRequest(request)) = prescription.bundle.resources().last()
        else {
            panic!("last entry is the request");
        };
        assert!(request.requester.is_none());
    }

    #[test]
    fn requesting_author_is_first_author() {
        let p1 = Reference::new(ResourceType::Practitioner, &ResourceId::parse("P1").unwrap());
        let p2 = Reference::new(ResourceType::Practitioner, &ResourceId::parse("P2").unwrap());

        assert_eq!(requesting_author(&[p1.clone(), p2]), Some(&p1));
        assert_eq!(requesting_author(&[]), None);
    }

    #[test]
    fn empty_orders_fail_validation() {
        let err = generator()
            .assemble(&[], &organization())
            .expect_err("empty input");
        assert!(matches!(err, PrescriptionError::EmptyDrugOrders));
    }

    #[test]
    fn mixed_encounters_fail_validation() {
        let mut orders = fixtures::scenario_orders();
        let mut other = fixtures::encounter();
        other.encounter_id = "E124".into();
        orders.push(DrugOrder::new(Arc::new(other), fixtures::free_text_order("D3", "x")));

        let err = generator()
            .assemble(&orders, &organization())
            .expect_err("mixed");
        assert!(matches!(err, PrescriptionError::MixedEncounters { .. }));
    }

    #[test]
    fn missing_base_url_is_configuration_missing() {
        let err = generator()
            .generate(
                &fixtures::scenario_orders(),
                &ConfigOrganizationResolver::new(config(None)),
            )
            .expect_err("no base url");
        assert!(matches!(err, PrescriptionError::ConfigurationMissing("base_url")));
    }

    #[test]
    fn generate_resolves_organization() {
        let prescription = generator()
            .generate(
                &fixtures::scenario_orders(),
                &ConfigOrganizationResolver::new(config(Some(BASE_URL))),
            )
            .expect("generate");

        assert_eq!(prescription.care_context.care_context_type, CareContextType::Visit);
        assert_eq!(prescription.care_context.care_context_reference, "V1");
    }

    #[test]
    fn care_context_failure_propagates() {
        let mut encounter = fixtures::encounter();
        encounter.visit = None;
        let orders = vec![DrugOrder::new(
            Arc::new(encounter),
            fixtures::free_text_order("D1", "Ginger syrup"),
        )];

        let err = generator()
            .assemble(&orders, &organization())
            .expect_err("no visit");
        assert!(matches!(
            err,
            PrescriptionError::CareContext(CareContextError::Unavailable { .. })
        ));
    }

    /// Delegates to the default mapper but refuses to map one drug order.
    struct FailingMapper {
        failing_order: &'static str,
    }

    impl ResourceMapper for FailingMapper {
        fn map_patient(&self, patient: &EmrPatient) -> Result<Patient, MappingError> {
            FhirResourceMapper.map_patient(patient)
        }

        fn map_practitioner(&self, provider: &EmrProvider) -> Result<Practitioner, MappingError> {
            FhirResourceMapper.map_practitioner(provider)
        }

        fn map_encounter(
            &self,
            encounter: &EmrEncounter,
            composition_date: DateTime<Utc>,
        ) -> Result<Encounter, MappingError> {
            FhirResourceMapper.map_encounter(encounter, composition_date)
        }

        fn map_medication(&self, order: &DrugOrder) -> Result<Option<Medication>, MappingError> {
            FhirResourceMapper.map_medication(order)
        }

        fn map_medication_request(
            &self,
            order: &DrugOrder,
            patient: &Reference,
            requester: Option<&Reference>,
            medication: Option<&Medication>,
        ) -> Result<MedicationRequest, MappingError> {
            if order.order.uuid == self.failing_order {
                return Err(MappingError::MissingField {
                    record: "DrugOrder",
                    field: "dosingInstructions",
                });
            }
            FhirResourceMapper.map_medication_request(order, patient, requester, medication)
        }
    }

    #[test]
    fn mapper_errors_propagate_unchanged() {
        let generator = PrescriptionGenerator::with_parts(
            FailingMapper {
                failing_order: "D2",
            },
            CareContextService::new(InMemoryCareContextRepository::default()),
            SequentialIdGenerator::new("doc").unwrap(),
        );

        let err = generator
            .assemble(&fixtures::scenario_orders(), &organization())
            .expect_err("mapper failure");
        assert!(matches!(
            err,
            PrescriptionError::Mapping(MappingError::MissingField {
                record: "DrugOrder",
                field: "dosingInstructions"
            })
        ));
    }

    #[test]
    fn assembly_is_deterministic_with_injected_ids() {
        let orders = fixtures::scenario_orders();

        let first = generator().assemble(&orders, &organization()).unwrap();
        let second = generator().assemble(&orders, &organization()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.bundle.composition().unwrap().id.as_str(), "doc-1");
    }

    #[test]
    fn repeated_calls_differ_only_in_composition_id() {
        let generator = generator();
        let orders = fixtures::scenario_orders();

        let first = generator.assemble(&orders, &organization()).unwrap();
        let second = generator.assemble(&orders, &organization()).unwrap();
        assert_ne!(first, second);

        let strip = |p: &Prescription| {
            let mut json = serde_json::to_value(&p.bundle).unwrap();
            let composition = &mut json["entry"][0]["resource"];
            composition["id"] = serde_json::Value::Null;
            composition["identifier"]["value"] = serde_json::Value::Null;
            json
        };
        assert_eq!(strip(&first), strip(&second));
    }

    #[test]
    fn default_generator_uses_random_composition_ids() {
        let generator = PrescriptionGenerator::new();
        let prescription = generator
            .assemble(&fixtures::scenario_orders(), &organization())
            .expect("assemble");
        assert_eq!(prescription.bundle.composition().unwrap().id.as_str().len(), 36);
    }
}
