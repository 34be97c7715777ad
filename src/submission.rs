//! Client-side validation of a submission before any network call is made.

use std::path::{Path, PathBuf};

/// Inputs for one analysis submission.
#[derive(Debug, Clone)]
pub struct SubmissionInput {
    pub min_debt_value: f64,
    pub file: PathBuf,
}

/// Validation failures surfaced inline, ahead of any network activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    NonPositiveMinValue,
    MissingFile(PathBuf),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NonPositiveMinValue => {
                write!(f, "minimum debt value must be a positive number")
            }
            ValidationError::MissingFile(p) => {
                write!(f, "spreadsheet file not found: {}", p.display())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl SubmissionInput {
    pub fn new(min_debt_value: f64, file: impl Into<PathBuf>) -> Self {
        Self {
            min_debt_value,
            file: file.into(),
        }
    }

    /// Check threshold positivity and file presence. NaN and infinities fail
    /// the same way a non-positive value does.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.min_debt_value.is_finite() || self.min_debt_value <= 0.0 {
            return Err(ValidationError::NonPositiveMinValue);
        }
        if !Path::new(&self.file).is_file() {
            return Err(ValidationError::MissingFile(self.file.clone()));
        }
        Ok(())
    }
}
