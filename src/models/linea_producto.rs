use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lineas_producto")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub nombre: String,
    pub descripcion: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::producto_biblioteca::Entity")]
    ProductoBiblioteca,
}

impl Related<super::producto_biblioteca::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductoBiblioteca.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
