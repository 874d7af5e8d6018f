use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::entity::{submission, test_pair_assignment};

/// Ensure the lookup indexes behind the per-(user, problem) queries exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Latest assignment for a key:
    // SELECT ... FROM test_pair_assignment WHERE user_id = ? AND problem_id = ? ORDER BY created_at DESC
    let assignment_idx = Index::create()
        .if_not_exists()
        .name("idx_assignment_user_problem")
        .table(test_pair_assignment::Entity)
        .col(test_pair_assignment::Column::UserId)
        .col(test_pair_assignment::Column::ProblemId)
        .col(test_pair_assignment::Column::CreatedAt)
        .to_owned();
    create_index(db, "idx_assignment_user_problem", &assignment_idx).await;

    // Submission history and numbering:
    // SELECT COUNT(*) FROM submission WHERE user_id = ? AND problem_id = ?
    let submission_idx = Index::create()
        .if_not_exists()
        .name("idx_submission_user_problem")
        .table(submission::Entity)
        .col(submission::Column::UserId)
        .col(submission::Column::ProblemId)
        .to_owned();
    create_index(db, "idx_submission_user_problem", &submission_idx).await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: &IndexCreateStatement) {
    let sql = match db.get_database_backend() {
        DatabaseBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        _ => stmt.to_string(PostgresQueryBuilder),
    };

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}
