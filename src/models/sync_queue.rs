use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_queue")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String, // uuid v4
    pub negocio_id: i32,
    pub operacion: String, // update_stage, pull_stage
    pub prioridad: i32,    // 0 = critical .. 3 = low
    #[sea_orm(default_value = "pending")]
    pub estado: String, // pending, processing, completed, failed, skipped
    pub payload: Option<String>,
    pub intentos: i32,
    pub max_intentos: i32,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
