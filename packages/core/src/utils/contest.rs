use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::{debug, info};

use crate::config::ContestConfig;
use crate::entity::user;
use crate::error::AppError;
use crate::utils::lookup::find_user;

/// Outcome of [`ContestTiming::admit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// The user must confirm the start of their contest before anything else.
    ConfirmationPending,
}

/// Contest-timing policy consulted on every contestant action.
#[async_trait]
pub trait ContestTiming: Send + Sync {
    /// Gate a contestant action. Starts the user's window on first contact
    /// unless an explicit confirmation is required and still missing.
    async fn admit(&self, user_id: i32, now: DateTime<Utc>) -> Result<Admission, AppError>;

    /// Whether the user's personal contest window has closed.
    async fn is_contest_over(&self, user_id: i32, now: DateTime<Utc>) -> Result<bool, AppError>;

    /// Start the user's personal contest window. Idempotent.
    async fn confirm_start(&self, user_id: i32, now: DateTime<Utc>) -> Result<(), AppError>;

    /// Whether the confirmation step is still pending for the user.
    async fn requires_confirmation(&self, user_id: i32) -> Result<bool, AppError>;
}

/// Per-user contest windows: each user gets `duration_secs` from the moment
/// they confirm their start, or from their first action when no
/// confirmation is asked for.
pub struct IndividualContestTiming {
    db: DatabaseConnection,
    config: ContestConfig,
}

impl IndividualContestTiming {
    pub fn new(db: DatabaseConnection, config: ContestConfig) -> Self {
        Self { db, config }
    }

    fn duration(&self) -> Duration {
        Duration::seconds(self.config.duration_secs as i64)
    }

    /// End of the user's window, if it has started.
    pub fn window_end(&self, user: &user::Model) -> Option<DateTime<Utc>> {
        user.contest_started_at.map(|start| start + self.duration())
    }
}

#[async_trait]
impl ContestTiming for IndividualContestTiming {
    async fn admit(&self, user_id: i32, now: DateTime<Utc>) -> Result<Admission, AppError> {
        if !self.config.time_limit_mode {
            return Ok(Admission::Admitted);
        }
        if self.config.confirm_start {
            if self.requires_confirmation(user_id).await? {
                debug!(user_id, "Contest start not confirmed yet");
                return Ok(Admission::ConfirmationPending);
            }
            return Ok(Admission::Admitted);
        }
        self.confirm_start(user_id, now).await?;
        Ok(Admission::Admitted)
    }

    async fn is_contest_over(&self, user_id: i32, now: DateTime<Utc>) -> Result<bool, AppError> {
        if !self.config.time_limit_mode {
            return Ok(false);
        }
        let user = find_user(&self.db, user_id).await?;
        let over = self.window_end(&user).is_some_and(|end| now > end);
        debug!(user_id, over, "Checked personal contest window");
        Ok(over)
    }

    async fn confirm_start(&self, user_id: i32, now: DateTime<Utc>) -> Result<(), AppError> {
        let user = find_user(&self.db, user_id).await?;
        if user.contest_started_at.is_some() {
            return Ok(());
        }

        let mut active: user::ActiveModel = user.into();
        active.contest_started_at = Set(Some(now));
        active.update(&self.db).await?;

        info!(user_id, started_at = %now, "Contest window started");
        Ok(())
    }

    async fn requires_confirmation(&self, user_id: i32) -> Result<bool, AppError> {
        if !self.config.time_limit_mode || !self.config.confirm_start {
            return Ok(false);
        }
        let user = find_user(&self.db, user_id).await?;
        Ok(user.contest_started_at.is_none())
    }
}
