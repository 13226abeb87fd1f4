use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, ToSchema)]
#[sea_orm(table_name = "movie")]
#[schema(as = Movie)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    /// Minutes.
    pub running_time: i32,
    pub language: String,
    pub genre: String,
    /// Serialized as `YYYY-MM-DD`.
    pub release_date: NaiveDate,
    pub cast_detail: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
