use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Single-row table (id = 1) holding the branding printed on quotes.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "configuracion_marca")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub nombre_empresa: String,
    pub rut: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub sitio_web: Option<String>,
    pub logo_path: Option<String>,
    pub color_primario: String,
    pub color_secundario: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
