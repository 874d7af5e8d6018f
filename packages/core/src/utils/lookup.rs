use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entity::{problem, submission, test_pair_assignment, user};
use crate::error::AppError;

/// Look up a user by ID, returning 404 if not found.
pub async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Find a problem by ID or return 404.
pub async fn find_problem<C: ConnectionTrait>(db: &C, id: i32) -> Result<problem::Model, AppError> {
    problem::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem not found".into()))
}

/// Like [`find_problem`], but hidden problems are reported as missing.
pub async fn find_available_problem<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<problem::Model, AppError> {
    let problem = find_problem(db, id).await?;
    if !problem.available {
        return Err(AppError::NotFound("Problem is not available".into()));
    }
    Ok(problem)
}

/// Find a submission by ID or return 404.
pub async fn find_submission<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<submission::Model, AppError> {
    submission::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))
}

/// Most recent assignment of any state for (user, problem).
pub async fn latest_assignment<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    problem_id: i32,
) -> Result<Option<test_pair_assignment::Model>, sea_orm::DbErr> {
    test_pair_assignment::Entity::find()
        .filter(test_pair_assignment::Column::UserId.eq(user_id))
        .filter(test_pair_assignment::Column::ProblemId.eq(problem_id))
        .order_by_desc(test_pair_assignment::Column::CreatedAt)
        .order_by_desc(test_pair_assignment::Column::Id)
        .one(db)
        .await
}

/// Problems currently open to contestants, by id.
pub async fn available_problems<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<problem::Model>, AppError> {
    Ok(problem::Entity::find()
        .filter(problem::Column::Available.eq(true))
        .order_by_asc(problem::Column::Id)
        .all(db)
        .await?)
}
