//! Input and output guardrails for spec generation.
//!
//! [`validate_input`] bounds the user's idea description before any model
//! call is made. [`validate_output`] checks that the model produced all
//! three spec files with some substance.

use thiserror::Error;

use crate::spec::{SpecDocument, SpecField};

/// Length limits, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardrailLimits {
    pub min_query_chars: usize,
    pub max_query_chars: usize,
    pub min_spec_chars: usize,
}

impl Default for GuardrailLimits {
    fn default() -> Self {
        Self {
            min_query_chars: 10,
            max_query_chars: 800,
            min_spec_chars: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardrailError {
    #[error("Query is too short. Please describe your agent idea in more detail.")]
    QueryTooShort,
    #[error("Query is too long. Please keep your description under {max} characters.")]
    QueryTooLong { max: usize },
    #[error("No response generated. Please try again.")]
    NoResponse,
    #[error("Missing spec files. Expected requirements, design, and tasks.")]
    MissingFields { missing: Vec<SpecField> },
    #[error("Spec files are too short. Please provide a more detailed description.")]
    TooShort { field: SpecField },
}

impl GuardrailError {
    /// True for errors caused by the caller's query rather than the model.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            GuardrailError::QueryTooShort | GuardrailError::QueryTooLong { .. }
        )
    }
}

pub fn validate_input(query: &str, limits: &GuardrailLimits) -> Result<(), GuardrailError> {
    let len = query.chars().count();
    if len < limits.min_query_chars {
        return Err(GuardrailError::QueryTooShort);
    }
    if len > limits.max_query_chars {
        return Err(GuardrailError::QueryTooLong {
            max: limits.max_query_chars,
        });
    }
    Ok(())
}

pub fn validate_output(doc: &SpecDocument, limits: &GuardrailLimits) -> Result<(), GuardrailError> {
    if doc.is_empty() {
        return Err(GuardrailError::NoResponse);
    }
    let missing: Vec<SpecField> = SpecField::ALL
        .into_iter()
        .filter(|f| !doc.contains(*f))
        .collect();
    if !missing.is_empty() {
        return Err(GuardrailError::MissingFields { missing });
    }
    for field in SpecField::ALL {
        let len = doc.get(field).map(|s| s.chars().count()).unwrap_or(0);
        if len < limits.min_spec_chars {
            return Err(GuardrailError::TooShort { field });
        }
    }
    Ok(())
}
