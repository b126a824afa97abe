use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "negocios")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub numero: i32,
    pub contacto_id: i32,
    pub productora_id: Option<i32>,
    pub cliente_final_id: Option<i32>,
    pub evento_nombre: String,
    pub evento_tipo: Option<String>,
    pub evento_fecha: Option<String>,
    pub evento_ubicacion: Option<String>,
    pub asistentes_esperados: Option<i32>,
    pub estado: String,
    pub hubspot_deal_id: Option<String>,
    pub owner_id: Option<i32>,
    pub fecha_cierre: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contacto::Entity",
        from = "Column::ContactoId",
        to = "super::contacto::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Contacto,
    #[sea_orm(has_many = "super::presupuesto::Entity")]
    Presupuesto,
}

impl Related<super::contacto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contacto.def()
    }
}

impl Related<super::presupuesto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Presupuesto.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
