use common::TaskStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Grading queue entry. Created here as `InQueue`; the worker owns every
/// later status change.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "task")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub status: TaskStatus,

    #[sea_orm(unique)]
    pub submission_id: i32,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
