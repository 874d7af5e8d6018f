//! Issuing and expiring per-(user, problem) test-data assignments.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tracing::{debug, info, instrument};

use crate::config::AssignmentConfig;
use crate::download::FileDownload;
use crate::entity::{test_pair, test_pair_assignment};
use crate::error::AppError;
use crate::testpair::{PairMode, TestPairProvider};
use crate::utils::contest::{Admission, ContestTiming};
use crate::utils::keyed_lock::{KeyedGuard, KeyedLocks};
use crate::utils::lookup::{find_available_problem, find_user, latest_assignment};

/// Time span during which an issued test pair may be submitted against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssignmentWindow {
    duration: Duration,
}

impl AssignmentWindow {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::seconds(secs as i64))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn expires_at(&self, assignment: &test_pair_assignment::Model) -> DateTime<Utc> {
        assignment.created_at + self.duration
    }

    pub fn is_expired(&self, assignment: &test_pair_assignment::Model, now: DateTime<Utc>) -> bool {
        now > self.expires_at(assignment)
    }

    /// Neither expired nor submitted.
    pub fn is_active(&self, assignment: &test_pair_assignment::Model, now: DateTime<Utc>) -> bool {
        !assignment.submitted && !self.is_expired(assignment, now)
    }

    /// `None` without an assignment, zero once it is expired or submitted.
    pub fn remaining_time(
        &self,
        assignment: Option<&test_pair_assignment::Model>,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let assignment = assignment?;
        if assignment.submitted || self.is_expired(assignment, now) {
            return Some(Duration::zero());
        }
        Some(self.expires_at(assignment) - now)
    }
}

/// Decides whether a user whose assignment was already submitted may be
/// issued a fresh one.
pub trait ResubmitPolicy: Send + Sync {
    fn can_resubmit(&self, user_id: i32, problem_id: i32) -> bool;
}

/// Same answer for every (user, problem), taken from `assignment.allow_resubmit`.
pub struct ConfiguredResubmitPolicy {
    allow: bool,
}

impl ConfiguredResubmitPolicy {
    pub fn new(allow: bool) -> Self {
        Self { allow }
    }
}

impl ResubmitPolicy for ConfiguredResubmitPolicy {
    fn can_resubmit(&self, _user_id: i32, _problem_id: i32) -> bool {
        self.allow
    }
}

pub struct AssignmentManager {
    db: DatabaseConnection,
    window: AssignmentWindow,
    pairs: Arc<dyn TestPairProvider>,
    resubmit: Arc<dyn ResubmitPolicy>,
    contest: Arc<dyn ContestTiming>,
    locks: KeyedLocks<(i32, i32)>,
}

impl AssignmentManager {
    pub fn new(
        db: DatabaseConnection,
        config: &AssignmentConfig,
        pairs: Arc<dyn TestPairProvider>,
        resubmit: Arc<dyn ResubmitPolicy>,
        contest: Arc<dyn ContestTiming>,
    ) -> Self {
        Self {
            db,
            window: AssignmentWindow::from_secs(config.expiration_secs),
            pairs,
            resubmit,
            contest,
            locks: KeyedLocks::new(),
        }
    }

    pub fn window(&self) -> AssignmentWindow {
        self.window
    }

    /// Serializes every read-modify-write on the (user, problem) key.
    /// Intake holds the same guard while it accepts a submission.
    pub(crate) async fn lock(
        &self,
        user_id: i32,
        problem_id: i32,
    ) -> KeyedGuard<'_, (i32, i32)> {
        self.locks.lock((user_id, problem_id)).await
    }

    pub fn is_expired(&self, assignment: &test_pair_assignment::Model, now: DateTime<Utc>) -> bool {
        self.window.is_expired(assignment, now)
    }

    pub fn remaining_time(
        &self,
        assignment: Option<&test_pair_assignment::Model>,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        self.window.remaining_time(assignment, now)
    }

    /// Latest assignment for the key, whatever its state.
    pub async fn current(
        &self,
        user_id: i32,
        problem_id: i32,
    ) -> Result<Option<test_pair_assignment::Model>, AppError> {
        Ok(latest_assignment(&self.db, user_id, problem_id).await?)
    }

    /// Return the active assignment for (user, problem), issuing a new one
    /// when none is active.
    #[instrument(skip(self, now))]
    pub async fn issue_or_get(
        &self,
        user_id: i32,
        problem_id: i32,
        now: DateTime<Utc>,
    ) -> Result<test_pair_assignment::Model, AppError> {
        let problem = find_available_problem(&self.db, problem_id).await?;
        find_user(&self.db, user_id).await?;

        if self.contest.admit(user_id, now).await? == Admission::ConfirmationPending {
            return Err(AppError::Validation(
                "Confirm the start of your contest first".into(),
            ));
        }

        let _guard = self.lock(user_id, problem_id).await;

        if let Some(latest) = latest_assignment(&self.db, user_id, problem_id).await? {
            if self.window.is_active(&latest, now) {
                return Ok(latest);
            }
            if latest.submitted && !self.resubmit.can_resubmit(user_id, problem_id) {
                debug!(assignment_id = latest.id, "Assignment already submitted; not reissuing");
                return Ok(latest);
            }
        }

        let pair = self
            .pairs
            .get_for(&problem, PairMode::Assignable)
            .await?
            .ok_or_else(|| AppError::NotFound("No test data available for this problem".into()))?;

        let assignment = test_pair_assignment::ActiveModel {
            user_id: Set(user_id),
            problem_id: Set(problem_id),
            test_pair_id: Set(pair.id),
            submitted: Set(false),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(
            assignment_id = assignment.id,
            test_pair_id = pair.id,
            expires_at = %self.window.expires_at(&assignment),
            "Test pair assigned"
        );
        Ok(assignment)
    }

    /// Issue or reuse the assignment, then release the assigned input.
    pub async fn download_input(
        &self,
        user_id: i32,
        problem_id: i32,
        now: DateTime<Utc>,
    ) -> Result<FileDownload, AppError> {
        let assignment = self.issue_or_get(user_id, problem_id, now).await?;
        let problem = find_available_problem(&self.db, problem_id).await?;
        let pair = test_pair::Entity::find_by_id(assignment.test_pair_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::Internal("Assigned test pair is missing".into()))?;

        Ok(FileDownload::new(
            format!("{}-input.txt", problem.name),
            pair.input,
        ))
    }

    /// Remaining submission time per problem, as shown next to a problem list.
    pub async fn submission_timeouts(
        &self,
        user_id: i32,
        problem_ids: &[i32],
        now: DateTime<Utc>,
    ) -> Result<HashMap<i32, Option<Duration>>, AppError> {
        let mut timeouts = HashMap::with_capacity(problem_ids.len());
        for &problem_id in problem_ids {
            let latest = latest_assignment(&self.db, user_id, problem_id).await?;
            timeouts.insert(problem_id, self.window.remaining_time(latest.as_ref(), now));
        }
        Ok(timeouts)
    }
}
