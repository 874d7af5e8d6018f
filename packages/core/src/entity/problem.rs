use sea_orm::entity::prelude::*;
use sea_orm::prelude::StringLen;
use serde::{Deserialize, Serialize};

/// Which uploaded part of a submission gets graded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// A program, compiled and run by the worker.
    #[sea_orm(string_value = "source")]
    Source,
    /// Output produced offline from the assigned input.
    #[sea_orm(string_value = "output")]
    Output,
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Short name; also the problem's directory in the result tree.
    #[sea_orm(unique)]
    pub name: String,
    pub full_score: i32,
    pub available: bool,
    pub submission_mode: SubmissionMode,

    #[sea_orm(has_many)]
    pub test_pairs: HasMany<super::test_pair::Entity>,

    #[sea_orm(has_many)]
    pub assignments: HasMany<super::test_pair_assignment::Entity>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
