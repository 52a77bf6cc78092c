use crate::care_context::CareContextError;
use crate::mapper::MappingError;

#[derive(Debug, thiserror::Error)]
pub enum PrescriptionError {
    #[error("a prescription needs at least one drug order")]
    EmptyDrugOrders,
    #[error("drug orders span encounters: expected {expected}, found {found}")]
    MixedEncounters { expected: String, found: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("organisation configuration missing: {0}")]
    ConfigurationMissing(&'static str),

    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    CareContext(#[from] CareContextError),

    #[error("failed to read EMR export: {0}")]
    FileRead(std::io::Error),
    #[error("translation error: {0}")]
    Translation(String),
}

pub type PrescriptionResult<T> = std::result::Result<T, PrescriptionError>;
