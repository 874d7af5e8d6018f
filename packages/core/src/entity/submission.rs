use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub source: Option<String>,
    pub source_filename: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub output: Option<String>,
    pub language_id: i32,
    /// 1-based position among this user's submissions to the problem.
    pub number: i32,
    /// Written by the grading worker when compilation produced output.
    #[sea_orm(column_type = "Text", nullable)]
    pub compiler_message: Option<String>,

    #[sea_orm(has_one)]
    pub task: HasOne<super::task::Entity>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    pub submitted_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
