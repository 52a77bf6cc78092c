use crate::emr::{DrugOrder, EmrEncounter};
use crate::{PrescriptionError, PrescriptionResult};
use std::sync::Arc;

/// Checks that `orders` is non-empty and that every order belongs to the same encounter.
///
/// Returns the shared encounter.
///
/// # Errors
///
/// Returns [`PrescriptionError::EmptyDrugOrders`] for an empty slice and
/// [`PrescriptionError::MixedEncounters`] naming the first order whose encounter differs.
pub fn validate_drug_orders(orders: &[DrugOrder]) -> PrescriptionResult<&Arc<EmrEncounter>> {
    let (first, rest) = orders
        .split_first()
        .ok_or(PrescriptionError::EmptyDrugOrders)?;
    let encounter = &first.encounter;

    if let Some(other) = rest
        .iter()
        .find(|o| o.encounter.encounter_id != encounter.encounter_id)
    {
        return Err(PrescriptionError::MixedEncounters {
            expected: encounter.encounter_id.clone(),
            found: other.encounter.encounter_id.clone(),
        });
    }

    Ok(encounter)
}
