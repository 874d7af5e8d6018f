#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a grading task in the worker queue.
///
/// The coordinator only ever creates tasks as [`TaskStatus::InQueue`]; every
/// later transition belongs to the grading worker.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum TaskStatus {
    /// Waiting to be picked up by a worker.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "InQueue"))]
    InQueue,
    /// A worker is executing the submission.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Running"))]
    Running,
    /// Result artifacts have been written.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Done"))]
    Done,
    /// The worker gave up on the task.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Error"))]
    Error,
}

impl TaskStatus {
    /// Returns true once the worker will not touch the task again.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// All possible status values.
    pub const ALL: &'static [TaskStatus] = &[Self::InQueue, Self::Running, Self::Done, Self::Error];

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InQueue => "InQueue",
            Self::Running => "Running",
            Self::Done => "Done",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::InQueue
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid task status '{}'. Valid values: {}",
            self.invalid,
            TaskStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "InQueue" => Ok(Self::InQueue),
            "Running" => Ok(Self::Running),
            "Done" => Ok(Self::Done),
            "Error" => Ok(Self::Error),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
