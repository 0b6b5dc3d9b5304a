use crate::models::{CandidateRecord, ValidRecord};

/// Keeps candidates with a non-empty first name and phone, in input order.
///
/// Dropped rows are not reported individually.
pub fn filter(candidates: Vec<CandidateRecord>) -> Vec<ValidRecord> {
    let total = candidates.len();
    let valid: Vec<ValidRecord> = candidates
        .into_iter()
        .filter_map(ValidRecord::from_candidate)
        .collect();

    tracing::debug!(
        total,
        kept = valid.len(),
        dropped = total - valid.len(),
        "Filtered candidate records"
    );

    valid
}
