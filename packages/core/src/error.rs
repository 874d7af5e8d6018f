use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

/// Structured error payload handed to whatever surface renders the failure.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Machine-readable error code, e.g. `ASSIGNMENT_EXPIRED` or `NOT_FOUND`.
    pub code: &'static str,
    /// Human-readable error description.
    pub message: String,
}

/// Reasons a submission is turned away by [`crate::intake::SubmissionIntake`].
///
/// Everything except [`IntakeError::Storage`] is a user-facing rejection:
/// the message is shown as-is and nothing is retried.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("You have not specified the problem to submit")]
    ProblemNotSpecified,

    #[error("You have not downloaded the test data for this problem")]
    NoTestDataDownloaded,

    #[error("The submission window for this test data has closed")]
    AssignmentExpired,

    #[error("The contest is over")]
    ContestOver,

    #[error("You have not confirmed the start of your contest")]
    ContestNotStarted,

    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("Error saving your submission")]
    Storage(#[from] DbErr),
}

impl IntakeError {
    pub fn code(&self) -> &'static str {
        match self {
            IntakeError::ProblemNotSpecified => "PROBLEM_NOT_SPECIFIED",
            IntakeError::NoTestDataDownloaded => "NO_TEST_DATA_DOWNLOADED",
            IntakeError::AssignmentExpired => "ASSIGNMENT_EXPIRED",
            IntakeError::ContestOver => "CONTEST_OVER",
            IntakeError::ContestNotStarted => "CONTEST_NOT_STARTED",
            IntakeError::InvalidSubmission(_) => "INVALID_SUBMISSION",
            IntakeError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn is_user_facing(&self) -> bool {
        !matches!(self, IntakeError::Storage(_))
    }

    pub fn body(&self) -> ErrorBody {
        if let IntakeError::Storage(detail) = self {
            tracing::error!("Submission storage error: {}", detail);
        }
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Failures of intake's collaborators (contest timing, lookups) are not
/// the user's doing and surface like storage failures.
impl From<AppError> for IntakeError {
    fn from(err: AppError) -> Self {
        IntakeError::Storage(DbErr::Custom(err.to_string()))
    }
}

/// Error for the non-intake operations of the core.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Insufficient permissions")]
    PermissionDenied,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PermissionDenied => "PERMISSION_DENIED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorBody {
                    code: self.code(),
                    message: "An unexpected error occurred".into(),
                }
            }
            other => ErrorBody {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}
