//! Constants used throughout the HIP core crate.
//!
//! Codes, titles and configuration keys live here so the document shape is defined in one
//! place.

/// Prefix of a prescription bundle's business identifier (`PR-<encounterId>`).
pub const PRESCRIPTION_ID_PREFIX: &str = "PR-";

/// Title of the prescription composition.
pub const PRESCRIPTION_TITLE: &str = "Prescription";

/// Title of the section holding the medication requests.
pub const PRESCRIPTION_SECTION_TITLE: &str = "OPD Prescription";

/// SNOMED CT system URI.
pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

/// SNOMED CT code for a prescription record (document and section type).
pub const PRESCRIPTION_RECORD_CODE: &str = "440545006";

/// Display for [`PRESCRIPTION_RECORD_CODE`].
pub const PRESCRIPTION_RECORD_DISPLAY: &str = "Prescription record";

/// HL7 v3 ActCode system used for encounter class.
pub const ACT_CODE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";

/// Identifier type text of the bundle identifier.
pub const BUNDLE_IDENTIFIER_TYPE: &str = "bundle";

/// Identifier type text (and system path segment) of the composition identifier.
pub const DOCUMENT_IDENTIFIER_TYPE: &str = "document";

/// Environment key for the facility id.
pub const ENV_FACILITY_ID: &str = "HIP_FACILITY_ID";

/// Environment key for the facility name.
pub const ENV_FACILITY_NAME: &str = "HIP_FACILITY_NAME";

/// Environment key for the facility identifier coding system.
pub const ENV_FACILITY_SYSTEM: &str = "HIP_FACILITY_SYSTEM";

/// Environment key for the canonical base URL.
pub const ENV_BASE_URL: &str = "HIP_BASE_URL";

/// Environment key for the care context type (`visit` or `program`).
pub const ENV_CARE_CONTEXT_TYPE: &str = "HIP_CARE_CONTEXT_TYPE";
