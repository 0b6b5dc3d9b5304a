use serde::{Deserialize, Serialize};

/// One parsed data row, before validity filtering.
///
/// Any field may be empty: a source row that lacks a column (or a whole
/// column that is missing from the header) produces an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    pub first_name: String,
    pub phone: String,
    pub notes: String,
}

impl CandidateRecord {
    pub fn new(
        first_name: impl Into<String>,
        phone: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            phone: phone.into(),
            notes: notes.into(),
        }
    }
}

/// A contact with a non-empty first name and phone number.
///
/// The only way to obtain one is [`ValidRecord::from_candidate`], so every
/// value of this type satisfies the validity rule. Fields are trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidRecord {
    first_name: String,
    phone: String,
    notes: String,
}

impl ValidRecord {
    /// Returns `None` when the name or phone is blank after trimming.
    pub fn from_candidate(candidate: CandidateRecord) -> Option<Self> {
        let first_name = candidate.first_name.trim();
        let phone = candidate.phone.trim();
        if first_name.is_empty() || phone.is_empty() {
            return None;
        }

        Some(Self {
            first_name: first_name.to_string(),
            phone: phone.to_string(),
            notes: candidate.notes.trim().to_string(),
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}
