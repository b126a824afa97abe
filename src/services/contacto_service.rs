//! Contacto Service
#![allow(clippy::needless_update)] // SeaORM ActiveModels require ..Default::default()

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{clean, empresa_service, now_timestamp};
use crate::domain::DomainError;
use crate::domain::validation::{require_non_blank, validate_optional_email};
use crate::models::{contacto, empresa, negocio};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ContactoInput {
    pub nombre: String,
    pub apellido: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub cargo: Option<String>,
    pub empresa_id: Option<i32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContactoFilter {
    pub empresa_id: Option<i32>,
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactoWithEmpresa {
    #[serde(flatten)]
    pub contacto: contacto::Model,
    pub nombre_completo: String,
    pub empresa: Option<empresa::Model>,
}

async fn validate<C: ConnectionTrait>(db: &C, input: &ContactoInput) -> Result<(), DomainError> {
    require_non_blank("nombre", &input.nombre).map_err(DomainError::Validation)?;
    validate_optional_email(input.email.as_deref()).map_err(DomainError::Validation)?;
    if let Some(eid) = input.empresa_id {
        empresa_service::find_empresa(db, eid)
            .await
            .map_err(|_| DomainError::validation(format!("Empresa {} does not exist", eid)))?;
    }
    Ok(())
}

pub async fn find_contacto<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<contacto::Model, DomainError> {
    contacto::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Contacto {}", id)))
}

pub async fn list_contactos<C: ConnectionTrait>(
    db: &C,
    filter: ContactoFilter,
) -> Result<Vec<ContactoWithEmpresa>, DomainError> {
    let mut query = contacto::Entity::find();

    if let Some(eid) = filter.empresa_id {
        query = query.filter(contacto::Column::EmpresaId.eq(eid));
    }
    if let Some(q) = clean(filter.q) {
        query = query.filter(
            Condition::any()
                .add(contacto::Column::Nombre.contains(&q))
                .add(contacto::Column::Apellido.contains(&q))
                .add(contacto::Column::Email.contains(&q)),
        );
    }

    let rows = query
        .order_by_asc(contacto::Column::Nombre)
        .find_also_related(empresa::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(c, empresa)| ContactoWithEmpresa {
            nombre_completo: c.nombre_completo(),
            contacto: c,
            empresa,
        })
        .collect())
}

pub async fn create_contacto<C: ConnectionTrait>(
    db: &C,
    input: ContactoInput,
) -> Result<contacto::Model, DomainError> {
    validate(db, &input).await?;
    let now = now_timestamp();

    let created = contacto::ActiveModel {
        nombre: Set(input.nombre.trim().to_string()),
        apellido: Set(clean(input.apellido)),
        email: Set(clean(input.email)),
        telefono: Set(clean(input.telefono)),
        cargo: Set(clean(input.cargo)),
        empresa_id: Set(input.empresa_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Created contacto {} ({})", created.id, created.nombre_completo());
    Ok(created)
}

pub async fn update_contacto<C: ConnectionTrait>(
    db: &C,
    id: i32,
    input: ContactoInput,
) -> Result<contacto::Model, DomainError> {
    validate(db, &input).await?;
    let existing = find_contacto(db, id).await?;

    let mut active: contacto::ActiveModel = existing.into();
    active.nombre = Set(input.nombre.trim().to_string());
    active.apellido = Set(clean(input.apellido));
    active.email = Set(clean(input.email));
    active.telefono = Set(clean(input.telefono));
    active.cargo = Set(clean(input.cargo));
    active.empresa_id = Set(input.empresa_id);
    active.updated_at = Set(now_timestamp());

    Ok(active.update(db).await?)
}

/// Refused while any negocio still points at the contact.
pub async fn delete_contacto<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), DomainError> {
    let existing = find_contacto(db, id).await?;

    let in_use = negocio::Entity::find()
        .filter(negocio::Column::ContactoId.eq(id))
        .count(db)
        .await?;
    if in_use > 0 {
        return Err(DomainError::InvalidState(format!(
            "Contacto {} is used by {} negocios",
            id, in_use
        )));
    }

    existing.delete(db).await?;
    Ok(())
}
