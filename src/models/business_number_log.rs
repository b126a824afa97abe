use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "business_number_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub negocio_id: i32,
    pub numero: i32,
    pub accion: String, // assigned, reassigned, released
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
