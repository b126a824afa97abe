use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "empresas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub nombre: String,
    pub rut: Option<String>,
    pub giro: Option<String>,
    pub direccion: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub tipo: String, // 'productora', 'cliente_final'
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::contacto::Entity")]
    Contacto,
}

impl Related<super::contacto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contacto.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
