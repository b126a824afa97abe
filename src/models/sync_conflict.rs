use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_conflicts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub negocio_id: i32,
    pub estado_local: String,
    pub estado_remoto: String,
    pub hubspot_stage_remoto: String,
    pub status: String, // abierto, resuelto
    pub resolucion: Option<String>, // keep_local, accept_remote
    pub detected_at: String,
    pub resolved_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
