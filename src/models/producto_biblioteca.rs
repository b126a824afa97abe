use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "productos_biblioteca")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio_base: f64,
    pub linea_producto_id: Option<i32>,
    pub activo: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::linea_producto::Entity",
        from = "Column::LineaProductoId",
        to = "super::linea_producto::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    LineaProducto,
}

impl Related<super::linea_producto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineaProducto.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
