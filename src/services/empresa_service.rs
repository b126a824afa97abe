//! Empresa Service - producer and end-client companies
#![allow(clippy::needless_update)] // SeaORM ActiveModels require ..Default::default()

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::{clean, now_timestamp};
use crate::domain::DomainError;
use crate::domain::validation::{require_non_blank, validate_optional_email};
use crate::models::{contacto, empresa, negocio};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TipoEmpresa {
    Productora,
    ClienteFinal,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EmpresaInput {
    pub nombre: String,
    pub rut: Option<String>,
    pub giro: Option<String>,
    pub direccion: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub tipo: Option<TipoEmpresa>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct EmpresaFilter {
    pub tipo: Option<TipoEmpresa>,
    pub q: Option<String>,
}

fn validate(input: &EmpresaInput) -> Result<(), DomainError> {
    require_non_blank("nombre", &input.nombre).map_err(DomainError::Validation)?;
    validate_optional_email(input.email.as_deref()).map_err(DomainError::Validation)
}

pub async fn find_empresa<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<empresa::Model, DomainError> {
    empresa::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Empresa {}", id)))
}

pub async fn list_empresas<C: ConnectionTrait>(
    db: &C,
    filter: EmpresaFilter,
) -> Result<Vec<empresa::Model>, DomainError> {
    let mut query = empresa::Entity::find();

    if let Some(tipo) = filter.tipo {
        query = query.filter(empresa::Column::Tipo.eq(tipo.as_ref()));
    }
    if let Some(q) = clean(filter.q) {
        query = query.filter(
            Condition::any()
                .add(empresa::Column::Nombre.contains(&q))
                .add(empresa::Column::Rut.contains(&q)),
        );
    }

    Ok(query.order_by_asc(empresa::Column::Nombre).all(db).await?)
}

pub async fn create_empresa<C: ConnectionTrait>(
    db: &C,
    input: EmpresaInput,
) -> Result<empresa::Model, DomainError> {
    validate(&input)?;
    let now = now_timestamp();

    let created = empresa::ActiveModel {
        nombre: Set(input.nombre.trim().to_string()),
        rut: Set(clean(input.rut)),
        giro: Set(clean(input.giro)),
        direccion: Set(clean(input.direccion)),
        email: Set(clean(input.email)),
        telefono: Set(clean(input.telefono)),
        tipo: Set(input.tipo.unwrap_or(TipoEmpresa::ClienteFinal).to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Created empresa {} ({})", created.id, created.nombre);
    Ok(created)
}

pub async fn update_empresa<C: ConnectionTrait>(
    db: &C,
    id: i32,
    input: EmpresaInput,
) -> Result<empresa::Model, DomainError> {
    validate(&input)?;
    let existing = find_empresa(db, id).await?;
    let tipo = input.tipo.map(|t| t.to_string()).unwrap_or(existing.tipo.clone());

    let mut active: empresa::ActiveModel = existing.into();
    active.nombre = Set(input.nombre.trim().to_string());
    active.rut = Set(clean(input.rut));
    active.giro = Set(clean(input.giro));
    active.direccion = Set(clean(input.direccion));
    active.email = Set(clean(input.email));
    active.telefono = Set(clean(input.telefono));
    active.tipo = Set(tipo);
    active.updated_at = Set(now_timestamp());

    Ok(active.update(db).await?)
}

/// Contacts and negocios keep working without the company; their links are cleared.
pub async fn delete_empresa<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), DomainError> {
    let existing = find_empresa(db, id).await?;

    contacto::Entity::update_many()
        .col_expr(
            contacto::Column::EmpresaId,
            Expr::value(Option::<i32>::None),
        )
        .filter(contacto::Column::EmpresaId.eq(id))
        .exec(db)
        .await?;
    negocio::Entity::update_many()
        .col_expr(
            negocio::Column::ProductoraId,
            Expr::value(Option::<i32>::None),
        )
        .filter(negocio::Column::ProductoraId.eq(id))
        .exec(db)
        .await?;
    negocio::Entity::update_many()
        .col_expr(
            negocio::Column::ClienteFinalId,
            Expr::value(Option::<i32>::None),
        )
        .filter(negocio::Column::ClienteFinalId.eq(id))
        .exec(db)
        .await?;

    existing.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn input(nombre: &str, email: Option<&str>) -> EmpresaInput {
        EmpresaInput {
            nombre: nombre.into(),
            rut: Some("76.123.456-7".into()),
            giro: None,
            direccion: None,
            email: email.map(String::from),
            telefono: None,
            tipo: Some(TipoEmpresa::Productora),
        }
    }

    #[tokio::test]
    async fn create_filter_and_validate() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");

        create_empresa(&db, input("Producciones Andes", Some("hola@andes.cl")))
            .await
            .unwrap();
        assert!(matches!(
            create_empresa(&db, input("Mala", Some(".x@y.cl"))).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            create_empresa(&db, input("  ", None)).await,
            Err(DomainError::Validation(_))
        ));

        let productoras = list_empresas(
            &db,
            EmpresaFilter {
                tipo: Some(TipoEmpresa::Productora),
                q: Some("andes".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(productoras.len(), 1);
        assert_eq!(productoras[0].tipo, "productora");
    }
}
