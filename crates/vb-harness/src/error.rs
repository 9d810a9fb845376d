use serde::Serialize;
use thiserror::Error;

/// Everything the harness can report. Registration-time variants are
/// returned as `Err`; run-time variants are recorded on the affected
/// [`crate::RunResult`] or [`crate::ComparisonReport`] instead of propagating.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HarnessError {
    #[error("idiom case '{0}' is already registered")]
    DuplicateCase(String),
    #[error("unknown idiom case '{0}'")]
    UnknownCase(String),
    #[error("idiom case '{0}' needs at least one candidate implementation")]
    EmptyCandidates(String),
    #[error("invalid run options: {0}")]
    InvalidOptions(String),
    #[error("input generator failed: {0}")]
    Generator(String),
    #[error("implementation '{label}' failed: {detail}")]
    Execution { label: String, detail: String },
    #[error("output of '{label}' diverges from reference: {detail}")]
    OutputMismatch { label: String, detail: String },
    #[error("reference failed, nothing to compare '{0}' against")]
    ReferenceUnavailable(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialize(String),
}

impl HarnessError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::DuplicateCase(_) => "harness_duplicate_case",
            Self::UnknownCase(_) => "harness_unknown_case",
            Self::EmptyCandidates(_) => "harness_empty_candidates",
            Self::InvalidOptions(_) => "harness_invalid_options",
            Self::Generator(_) => "harness_generator_failed",
            Self::Execution { .. } => "harness_execution_failed",
            Self::OutputMismatch { .. } => "harness_output_mismatch",
            Self::ReferenceUnavailable(_) => "harness_reference_unavailable",
            Self::Io(_) => "harness_io_failed",
            Self::Serialize(_) => "harness_serialize_failed",
        }
    }

    /// Short marker used in place of a timing in the text report.
    #[must_use]
    pub fn report_marker(&self) -> &'static str {
        match self {
            Self::OutputMismatch { .. } => "MISMATCH",
            _ => "ERROR",
        }
    }
}
