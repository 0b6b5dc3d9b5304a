use crate::error::DispatchError;
use crate::models::{Agent, Distribution, ValidRecord};

/// Splits `records` into one contiguous slice per roster agent.
///
/// With `n` records and `k` agents, the first `n % k` agents get
/// `n / k + 1` records and the rest get `n / k`. Concatenating the slices in
/// roster order reproduces `records` exactly. An empty record set still
/// yields one (empty) distribution per agent.
pub fn distribute(
    records: Vec<ValidRecord>,
    roster: &[Agent],
) -> Result<Vec<Distribution>, DispatchError> {
    if roster.is_empty() {
        return Err(DispatchError::NoAgents);
    }

    let base = records.len() / roster.len();
    let remainder = records.len() % roster.len();
    let mut remaining = records.into_iter();

    let distributions = roster
        .iter()
        .enumerate()
        .map(|(index, agent)| {
            let share = base + usize::from(index < remainder);
            Distribution {
                agent_id: agent.id,
                items: remaining.by_ref().take(share).collect(),
            }
        })
        .collect();

    Ok(distributions)
}
