//! Producto Service - the product library and its product lines
#![allow(clippy::needless_update)] // SeaORM ActiveModels require ..Default::default()

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{clean, now_timestamp};
use crate::domain::DomainError;
use crate::models::{linea_producto, producto_biblioteca};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProductoInput {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio_base: f64,
    pub linea_producto_id: Option<i32>,
    pub activo: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LineaInput {
    pub nombre: String,
    pub descripcion: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProductoFilter {
    pub linea_producto_id: Option<i32>,
    /// Inactive products are hidden unless asked for
    #[serde(default)]
    pub incluir_inactivos: bool,
    pub q: Option<String>,
}

async fn validate<C: ConnectionTrait>(db: &C, input: &ProductoInput) -> Result<(), DomainError> {
    if input.nombre.trim().is_empty() {
        return Err(DomainError::validation("nombre is required"));
    }
    if !input.precio_base.is_finite() || input.precio_base < 0.0 {
        return Err(DomainError::validation("precio_base cannot be negative"));
    }
    if let Some(lid) = input.linea_producto_id
        && linea_producto::Entity::find_by_id(lid).one(db).await?.is_none()
    {
        return Err(DomainError::validation(format!("Linea {} does not exist", lid)));
    }
    Ok(())
}

pub async fn find_producto<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<producto_biblioteca::Model, DomainError> {
    producto_biblioteca::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Producto {}", id)))
}

pub async fn list_productos<C: ConnectionTrait>(
    db: &C,
    filter: ProductoFilter,
) -> Result<Vec<producto_biblioteca::Model>, DomainError> {
    let mut query = producto_biblioteca::Entity::find();

    if !filter.incluir_inactivos {
        query = query.filter(producto_biblioteca::Column::Activo.eq(true));
    }
    if let Some(lid) = filter.linea_producto_id {
        query = query.filter(producto_biblioteca::Column::LineaProductoId.eq(lid));
    }
    if let Some(q) = clean(filter.q) {
        query = query.filter(producto_biblioteca::Column::Nombre.contains(&q));
    }

    Ok(query
        .order_by_asc(producto_biblioteca::Column::Nombre)
        .all(db)
        .await?)
}

pub async fn create_producto<C: ConnectionTrait>(
    db: &C,
    input: ProductoInput,
) -> Result<producto_biblioteca::Model, DomainError> {
    validate(db, &input).await?;
    let now = now_timestamp();

    Ok(producto_biblioteca::ActiveModel {
        nombre: Set(input.nombre.trim().to_string()),
        descripcion: Set(clean(input.descripcion)),
        precio_base: Set(input.precio_base),
        linea_producto_id: Set(input.linea_producto_id),
        activo: Set(input.activo.unwrap_or(true)),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

pub async fn update_producto<C: ConnectionTrait>(
    db: &C,
    id: i32,
    input: ProductoInput,
) -> Result<producto_biblioteca::Model, DomainError> {
    validate(db, &input).await?;
    let existing = find_producto(db, id).await?;
    let activo = input.activo.unwrap_or(existing.activo);

    let mut active: producto_biblioteca::ActiveModel = existing.into();
    active.nombre = Set(input.nombre.trim().to_string());
    active.descripcion = Set(clean(input.descripcion));
    active.precio_base = Set(input.precio_base);
    active.linea_producto_id = Set(input.linea_producto_id);
    active.activo = Set(activo);
    active.updated_at = Set(now_timestamp());

    Ok(active.update(db).await?)
}

/// Soft delete: quotes keep pointing at the product.
pub async fn deactivate_producto<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<producto_biblioteca::Model, DomainError> {
    let existing = find_producto(db, id).await?;
    let mut active: producto_biblioteca::ActiveModel = existing.into();
    active.activo = Set(false);
    active.updated_at = Set(now_timestamp());
    Ok(active.update(db).await?)
}

pub async fn list_lineas<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<linea_producto::Model>, DomainError> {
    Ok(linea_producto::Entity::find()
        .order_by_asc(linea_producto::Column::Nombre)
        .all(db)
        .await?)
}

pub async fn create_linea<C: ConnectionTrait>(
    db: &C,
    input: LineaInput,
) -> Result<linea_producto::Model, DomainError> {
    let nombre = input.nombre.trim().to_string();
    if nombre.is_empty() {
        return Err(DomainError::validation("nombre is required"));
    }

    let duplicate = linea_producto::Entity::find()
        .filter(linea_producto::Column::Nombre.eq(nombre.as_str()))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(DomainError::validation(format!("Linea '{}' already exists", nombre)));
    }

    Ok(linea_producto::ActiveModel {
        nombre: Set(nombre),
        descripcion: Set(clean(input.descripcion)),
        created_at: Set(now_timestamp()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Products of the line stay, unassigned.
pub async fn delete_linea<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), DomainError> {
    let linea = linea_producto::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Linea {}", id)))?;

    producto_biblioteca::Entity::update_many()
        .col_expr(
            producto_biblioteca::Column::LineaProductoId,
            Expr::value(Option::<i32>::None),
        )
        .filter(producto_biblioteca::Column::LineaProductoId.eq(id))
        .exec(db)
        .await?;

    linea.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    #[tokio::test]
    async fn deactivated_products_leave_default_listing() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let linea = create_linea(
            &db,
            LineaInput {
                nombre: "Acreditación".into(),
                descripcion: None,
            },
        )
        .await
        .unwrap();

        let p = create_producto(
            &db,
            ProductoInput {
                nombre: "Impresora de credenciales".into(),
                descripcion: None,
                precio_base: 120000.0,
                linea_producto_id: Some(linea.id),
                activo: None,
            },
        )
        .await
        .unwrap();
        assert!(p.activo);

        deactivate_producto(&db, p.id).await.unwrap();
        assert!(list_productos(&db, ProductoFilter::default()).await.unwrap().is_empty());

        let all = list_productos(
            &db,
            ProductoFilter {
                incluir_inactivos: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn line_names_are_unique_and_prices_non_negative() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let mk = || LineaInput {
            nombre: "Control de acceso".into(),
            descripcion: None,
        };
        create_linea(&db, mk()).await.unwrap();
        assert!(matches!(create_linea(&db, mk()).await, Err(DomainError::Validation(_))));

        let negative = create_producto(
            &db,
            ProductoInput {
                nombre: "Torniquete".into(),
                descripcion: None,
                precio_base: -1.0,
                linea_producto_id: None,
                activo: None,
            },
        )
        .await;
        assert!(matches!(negative, Err(DomainError::Validation(_))));
    }
}
