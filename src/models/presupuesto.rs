use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "presupuestos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub negocio_id: i32,
    pub nombre: String,
    pub estado: String, // borrador, enviado, aprobado, rechazado, vencido, cancelado
    pub total: f64,     // Cached from the line items, IVA included
    pub fecha_envio: Option<String>,
    pub fecha_aprobacion: Option<String>,
    pub fecha_rechazo: Option<String>,
    pub fecha_vencimiento: Option<String>, // YYYY-MM-DD
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::negocio::Entity",
        from = "Column::NegocioId",
        to = "super::negocio::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Negocio,
    #[sea_orm(has_many = "super::producto_presupuesto::Entity")]
    ProductoPresupuesto,
}

impl Related<super::negocio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Negocio.def()
    }
}

impl Related<super::producto_presupuesto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductoPresupuesto.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
