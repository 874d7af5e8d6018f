//! Validating submissions and queueing them for grading.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::TaskStatus;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{error, info, instrument, warn};

use crate::assignment::AssignmentManager;
use crate::config::SubmissionConfig;
use crate::download::FileDownload;
use crate::entity::problem::SubmissionMode;
use crate::entity::{problem, submission, task, test_pair_assignment};
use crate::error::{AppError, IntakeError};
use crate::utils::contest::{Admission, ContestTiming};
use crate::utils::lookup::{find_problem, find_submission, latest_assignment};

/// An uploaded source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content: String,
}

/// What the user uploaded with a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub source: Option<UploadedFile>,
    pub output: Option<String>,
    pub language_id: i32,
}

/// Check the payload against the problem's submission mode and size limit.
pub fn validate_payload(
    mode: SubmissionMode,
    payload: &SubmissionPayload,
    max_size: usize,
) -> Result<(), IntakeError> {
    let source = payload
        .source
        .as_ref()
        .map(|f| f.content.as_str())
        .filter(|c| !c.trim().is_empty());
    let output = payload.output.as_deref().filter(|o| !o.trim().is_empty());

    match mode {
        SubmissionMode::Source if source.is_none() => {
            return Err(IntakeError::InvalidSubmission(
                "source file is missing or empty".into(),
            ));
        }
        SubmissionMode::Output if output.is_none() => {
            return Err(IntakeError::InvalidSubmission(
                "output file is missing or empty".into(),
            ));
        }
        _ => {}
    }

    for (part, content) in [("source", source), ("output", output)] {
        if content.is_some_and(|c| c.len() > max_size) {
            return Err(IntakeError::InvalidSubmission(format!(
                "{part} file exceeds {max_size} bytes"
            )));
        }
    }

    Ok(())
}

pub struct SubmissionIntake {
    db: DatabaseConnection,
    assignments: Arc<AssignmentManager>,
    contest: Arc<dyn ContestTiming>,
    config: SubmissionConfig,
}

impl SubmissionIntake {
    pub fn new(
        db: DatabaseConnection,
        assignments: Arc<AssignmentManager>,
        contest: Arc<dyn ContestTiming>,
        config: SubmissionConfig,
    ) -> Self {
        Self {
            db,
            assignments,
            contest,
            config,
        }
    }

    /// Validate a submission and, if it qualifies, persist it together with
    /// its grading task and close the governing assignment.
    #[instrument(skip(self, payload, submitted_at))]
    pub async fn accept(
        &self,
        user_id: i32,
        problem_id: Option<i32>,
        payload: SubmissionPayload,
        submitted_at: DateTime<Utc>,
    ) -> Result<submission::Model, IntakeError> {
        let problem = match problem_id {
            Some(id) => problem::Entity::find_by_id(id).one(&self.db).await?,
            None => None,
        };
        let Some(problem) = problem.filter(|p| p.available) else {
            return Err(reject(IntakeError::ProblemNotSpecified));
        };

        let _guard = self.assignments.lock(user_id, problem.id).await;

        let Some(assignment) = latest_assignment(&self.db, user_id, problem.id).await? else {
            return Err(reject(IntakeError::NoTestDataDownloaded));
        };
        // A submitted assignment closed its window early.
        if assignment.submitted
            || self
                .assignments
                .window()
                .is_expired(&assignment, submitted_at)
        {
            return Err(reject(IntakeError::AssignmentExpired));
        }

        if self.contest.admit(user_id, submitted_at).await? == Admission::ConfirmationPending {
            return Err(reject(IntakeError::ContestNotStarted));
        }
        if self.contest.is_contest_over(user_id, submitted_at).await? {
            return Err(reject(IntakeError::ContestOver));
        }

        validate_payload(problem.submission_mode, &payload, self.config.max_size)
            .map_err(reject)?;

        let txn = self.db.begin().await?;
        let model = match persist(&txn, &problem, assignment, payload, user_id, submitted_at).await
        {
            Ok(model) => model,
            Err(e) => {
                error!(error = %e, "Failed to store submission; rolling back");
                if let Err(rollback) = txn.rollback().await {
                    error!(error = %rollback, "Rollback failed");
                }
                return Err(e.into());
            }
        };
        txn.commit().await?;

        info!(
            submission_id = model.id,
            number = model.number,
            "Submission accepted and queued for grading"
        );
        Ok(model)
    }

    /// Most recent submission of the user to the problem.
    pub async fn last_submission(
        &self,
        user_id: i32,
        problem_id: i32,
    ) -> Result<Option<submission::Model>, AppError> {
        Ok(submission::Entity::find()
            .filter(submission::Column::UserId.eq(user_id))
            .filter(submission::Column::ProblemId.eq(problem_id))
            .order_by_desc(submission::Column::Id)
            .one(&self.db)
            .await?)
    }

    /// All of the user's submissions to the problem, newest first.
    pub async fn submissions_for(
        &self,
        user_id: i32,
        problem_id: i32,
    ) -> Result<Vec<submission::Model>, AppError> {
        Ok(submission::Entity::find()
            .filter(submission::Column::UserId.eq(user_id))
            .filter(submission::Column::ProblemId.eq(problem_id))
            .order_by_desc(submission::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Submitted source, for its owner only and while the problem is available.
    pub async fn source_download(
        &self,
        viewer_id: i32,
        submission_id: i32,
    ) -> Result<FileDownload, AppError> {
        let sub = find_submission(&self.db, submission_id).await?;
        if sub.user_id != viewer_id {
            // Prevent enumeration
            return Err(AppError::NotFound("Submission not found".into()));
        }
        let problem = find_problem(&self.db, sub.problem_id).await?;
        if !problem.available {
            return Err(AppError::NotFound("Problem is not available".into()));
        }
        let source = sub
            .source
            .ok_or_else(|| AppError::NotFound("Submission has no source".into()))?;

        let filename = sub
            .source_filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("{}-{}.txt", problem.name, sub.id));
        Ok(FileDownload::new(filename, source))
    }
}

fn reject(err: IntakeError) -> IntakeError {
    warn!(code = err.code(), "Submission rejected: {}", err);
    err
}

/// Submission row, its queued task and the closed assignment: all in `txn`.
async fn persist(
    txn: &DatabaseTransaction,
    problem: &problem::Model,
    assignment: test_pair_assignment::Model,
    payload: SubmissionPayload,
    user_id: i32,
    submitted_at: DateTime<Utc>,
) -> Result<submission::Model, DbErr> {
    let previous = submission::Entity::find()
        .filter(submission::Column::UserId.eq(user_id))
        .filter(submission::Column::ProblemId.eq(problem.id))
        .count(txn)
        .await?;

    let (source, source_filename) = match payload.source {
        Some(file) => (Some(file.content), Some(file.filename.trim().to_string())),
        None => (None, None),
    };

    let model = submission::ActiveModel {
        source: Set(source),
        source_filename: Set(source_filename),
        output: Set(payload.output),
        language_id: Set(payload.language_id),
        number: Set(previous as i32 + 1),
        user_id: Set(user_id),
        problem_id: Set(problem.id),
        submitted_at: Set(submitted_at),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    task::ActiveModel {
        status: Set(TaskStatus::InQueue),
        submission_id: Set(model.id),
        created_at: Set(submitted_at),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let mut active: test_pair_assignment::ActiveModel = assignment.into();
    active.submitted = Set(true);
    active.update(txn).await?;

    Ok(model)
}
