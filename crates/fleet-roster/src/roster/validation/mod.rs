//! Field validators and input formatters shared by the roster forms.
//!
//! Every validator is a pure function returning `Result<_, ValidationError>`;
//! callers that validate whole forms collect failures into [`FieldErrors`] so
//! each message can be rendered next to its field.

pub mod cpf;
pub mod name;

mod contact;
mod score;

pub use contact::{validate_email, validate_password, MIN_PASSWORD_LEN};
pub use cpf::{format_cpf, normalize_cpf, validate_cpf};
pub use name::{format_name, validate_name};
pub use score::{
    parse_evaluation_score, parse_monthly_rating, validate_admission_date, EVALUATION_SCORE_RANGE,
    MONTHLY_RATING_RANGE,
};

use serde::Serialize;
use std::collections::BTreeMap;

/// Field-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("CPF must have 11 digits")]
    CpfLength,
    #[error("CPF is invalid")]
    CpfInvalid,
    #[error("name cannot contain numbers or special characters")]
    NameCharacters,
    #[error("email address is invalid")]
    EmailFormat,
    #[error("password must have at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("{field} must be a number")]
    NotANumber { field: &'static str },
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: u8,
        max: u8,
    },
    #[error("admission date cannot be in the future")]
    FutureDate,
    #[error("{0}")]
    Rule(String),
}

/// Per-field failures of a whole form, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the failure of `result` under `field`, keeping the first failure per field.
    pub fn check<T>(
        &mut self,
        field: impl Into<String>,
        result: Result<T, ValidationError>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.0.entry(field.into()).or_insert_with(|| error.to_string());
                None
            }
        }
    }

    pub fn push(&mut self, field: impl Into<String>, error: ValidationError) {
        self.0.entry(field.into()).or_insert_with(|| error.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing failed, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{joined}")
    }
}

impl std::error::Error for FieldErrors {}

/// `Required` when the trimmed value is empty.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required { field })
    } else {
        Ok(())
    }
}
