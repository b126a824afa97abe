use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::quote::QuoteLine;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "productos_presupuesto")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub presupuesto_id: i32,
    pub producto_id: Option<i32>, // Library product it was copied from, if any
    pub nombre: String,
    pub descripcion: Option<String>,
    pub cantidad: f64,
    pub precio_unitario: f64,
    pub descuento_porcentaje: f64,
    pub total: f64,
    pub comentarios: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::presupuesto::Entity",
        from = "Column::PresupuestoId",
        to = "super::presupuesto::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Presupuesto,
}

impl Related<super::presupuesto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Presupuesto.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn as_quote_line(&self) -> QuoteLine {
        QuoteLine {
            cantidad: self.cantidad,
            precio_unitario: self.precio_unitario,
            descuento_porcentaje: self.descuento_porcentaje,
        }
    }
}
