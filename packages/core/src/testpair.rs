use async_trait::async_trait;
use rand::seq::IndexedRandom;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::debug;

use crate::entity::{problem, test_pair};
use crate::error::AppError;

/// Which kind of test pair is being asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairMode {
    /// Handed to one user through an assignment; input is withheld otherwise.
    Assignable,
    /// Fixed public pair for self-checking.
    Verifying,
}

/// Source of test pairs. Selection policy is up to the implementation.
#[async_trait]
pub trait TestPairProvider: Send + Sync {
    async fn get_for(
        &self,
        problem: &problem::Model,
        mode: PairMode,
    ) -> Result<Option<test_pair::Model>, AppError>;
}

/// Picks uniformly at random from the problem's assignable pool; the
/// verifying pair is always the lowest-id one.
pub struct PoolTestPairProvider {
    db: DatabaseConnection,
}

impl PoolTestPairProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TestPairProvider for PoolTestPairProvider {
    async fn get_for(
        &self,
        problem: &problem::Model,
        mode: PairMode,
    ) -> Result<Option<test_pair::Model>, AppError> {
        let query = test_pair::Entity::find()
            .filter(test_pair::Column::ProblemId.eq(problem.id))
            .order_by_asc(test_pair::Column::Id);

        match mode {
            PairMode::Verifying => Ok(query
                .filter(test_pair::Column::Verifying.eq(true))
                .one(&self.db)
                .await?),
            PairMode::Assignable => {
                let pool = query
                    .filter(test_pair::Column::Verifying.eq(false))
                    .all(&self.db)
                    .await?;
                debug!(problem_id = problem.id, pool = pool.len(), "Drawing from test pair pool");
                let picked = pool.choose(&mut rand::rng()).cloned();
                Ok(picked)
            }
        }
    }
}
