//! Negocio Service - business records, their numbers and their state
//!
//! Every state change goes through [`apply_state`], which enqueues the
//! HubSpot push. [`write_state`] is the raw write used when the change
//! came from HubSpot itself.
#![allow(clippy::needless_update)] // SeaORM ActiveModels require ..Default::default()

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use utoipa::ToSchema;

use super::numbering::{self, NumberAction};
use super::{clean, now_timestamp};
use crate::domain::estado::{business_value, derive_business_state};
use crate::domain::validation::is_valid_deal_id;
use crate::domain::{DomainError, EstadoNegocio, EstadoPresupuesto};
use crate::models::{contacto, empresa, negocio, presupuesto, producto_presupuesto};
use crate::sync::queue::{self, Priority};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateNegocioInput {
    pub contacto_id: i32,
    pub productora_id: Option<i32>,
    pub cliente_final_id: Option<i32>,
    pub evento_nombre: String,
    pub evento_tipo: Option<String>,
    pub evento_fecha: Option<String>,
    pub evento_ubicacion: Option<String>,
    pub asistentes_esperados: Option<i32>,
    pub hubspot_deal_id: Option<String>,
    /// Defaults to the creating user
    pub owner_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateNegocioInput {
    pub contacto_id: Option<i32>,
    pub productora_id: Option<i32>,
    pub cliente_final_id: Option<i32>,
    pub evento_nombre: Option<String>,
    pub evento_tipo: Option<String>,
    pub evento_fecha: Option<String>,
    pub evento_ubicacion: Option<String>,
    pub asistentes_esperados: Option<i32>,
    pub hubspot_deal_id: Option<String>,
    pub owner_id: Option<i32>,
}

/// Filter parameters for listing negocios
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NegocioFilter {
    pub estado: Option<EstadoNegocio>,
    pub contacto_id: Option<i32>,
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NegocioSummary {
    #[serde(flatten)]
    pub negocio: negocio::Model,
    pub contacto_nombre: Option<String>,
    pub valor: f64,
    pub presupuestos: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NegocioDetail {
    #[serde(flatten)]
    pub negocio: negocio::Model,
    pub contacto: Option<contacto::Model>,
    pub productora: Option<empresa::Model>,
    pub cliente_final: Option<empresa::Model>,
    pub presupuestos: Vec<presupuesto::Model>,
    pub valor: f64,
}

pub(crate) fn parse_estado(raw: &str) -> Result<EstadoNegocio, DomainError> {
    EstadoNegocio::from_str(raw)
        .map_err(|_| DomainError::InvalidState(format!("Unknown estado '{}'", raw)))
}

fn valor_of(quotes: &[presupuesto::Model]) -> f64 {
    let states: Vec<(EstadoPresupuesto, &f64)> = quotes
        .iter()
        .filter_map(|p| {
            EstadoPresupuesto::from_str(&p.estado)
                .ok()
                .map(|e| (e, &p.total))
        })
        .collect();
    business_value(states)
}

pub async fn find_negocio<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<negocio::Model, DomainError> {
    negocio::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Negocio {}", id)))
}

pub async fn list_negocios<C: ConnectionTrait>(
    db: &C,
    filter: NegocioFilter,
) -> Result<Vec<NegocioSummary>, DomainError> {
    let mut query = negocio::Entity::find();

    if let Some(estado) = filter.estado {
        query = query.filter(negocio::Column::Estado.eq(estado.as_ref()));
    }
    if let Some(contacto_id) = filter.contacto_id {
        query = query.filter(negocio::Column::ContactoId.eq(contacto_id));
    }
    if let Some(q) = clean(filter.q) {
        let condition = match q.parse::<i32>() {
            Ok(numero) => Condition::any()
                .add(negocio::Column::EventoNombre.contains(&q))
                .add(negocio::Column::Numero.eq(numero)),
            Err(_) => Condition::any().add(negocio::Column::EventoNombre.contains(&q)),
        };
        query = query.filter(condition);
    }

    let negocios = query.order_by_desc(negocio::Column::Numero).all(db).await?;

    let contactos: HashMap<i32, String> = contacto::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.nombre_completo()))
        .collect();

    let mut quotes_by_negocio: HashMap<i32, Vec<presupuesto::Model>> = HashMap::new();
    for p in presupuesto::Entity::find().all(db).await? {
        quotes_by_negocio.entry(p.negocio_id).or_default().push(p);
    }

    Ok(negocios
        .into_iter()
        .map(|n| {
            let quotes = quotes_by_negocio.remove(&n.id).unwrap_or_default();
            NegocioSummary {
                contacto_nombre: contactos.get(&n.contacto_id).cloned(),
                valor: valor_of(&quotes),
                presupuestos: quotes.len(),
                negocio: n,
            }
        })
        .collect())
}

pub async fn get_negocio_detail<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<NegocioDetail, DomainError> {
    let negocio = find_negocio(db, id).await?;

    let contacto = negocio.find_related(contacto::Entity).one(db).await?;
    let productora = match negocio.productora_id {
        Some(eid) => empresa::Entity::find_by_id(eid).one(db).await?,
        None => None,
    };
    let cliente_final = match negocio.cliente_final_id {
        Some(eid) => empresa::Entity::find_by_id(eid).one(db).await?,
        None => None,
    };
    let presupuestos = negocio
        .find_related(presupuesto::Entity)
        .order_by_asc(presupuesto::Column::Id)
        .all(db)
        .await?;

    Ok(NegocioDetail {
        valor: valor_of(&presupuestos),
        negocio,
        contacto,
        productora,
        cliente_final,
        presupuestos,
    })
}

async fn ensure_refs<C: ConnectionTrait>(
    db: &C,
    contacto_id: Option<i32>,
    empresas: [Option<i32>; 2],
) -> Result<(), DomainError> {
    if let Some(cid) = contacto_id
        && contacto::Entity::find_by_id(cid).one(db).await?.is_none()
    {
        return Err(DomainError::validation(format!("Contacto {} does not exist", cid)));
    }
    for eid in empresas.into_iter().flatten() {
        if empresa::Entity::find_by_id(eid).one(db).await?.is_none() {
            return Err(DomainError::validation(format!("Empresa {} does not exist", eid)));
        }
    }
    Ok(())
}

fn deal_id(raw: Option<String>) -> Result<Option<String>, DomainError> {
    match clean(raw) {
        Some(id) if !is_valid_deal_id(&id) => Err(DomainError::validation(format!(
            "hubspot_deal_id '{}' must be a numeric HubSpot deal id",
            id
        ))),
        id => Ok(id),
    }
}

/// Create a negocio with the next business number, logged in the same transaction.
pub async fn create_negocio<C>(
    db: &C,
    input: CreateNegocioInput,
    creator_id: i32,
) -> Result<negocio::Model, DomainError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let evento_nombre = input.evento_nombre.trim().to_string();
    if evento_nombre.is_empty() {
        return Err(DomainError::validation("evento_nombre is required"));
    }
    if input.asistentes_esperados.is_some_and(|a| a < 0) {
        return Err(DomainError::validation("asistentes_esperados cannot be negative"));
    }
    let hubspot_deal_id = deal_id(input.hubspot_deal_id)?;

    let txn = db.begin().await?;

    ensure_refs(
        &txn,
        Some(input.contacto_id),
        [input.productora_id, input.cliente_final_id],
    )
    .await?;

    let numero = numbering::get_next_business_number(&txn).await?;
    let now = now_timestamp();

    let created = negocio::ActiveModel {
        numero: Set(numero),
        contacto_id: Set(input.contacto_id),
        productora_id: Set(input.productora_id),
        cliente_final_id: Set(input.cliente_final_id),
        evento_nombre: Set(evento_nombre),
        evento_tipo: Set(clean(input.evento_tipo)),
        evento_fecha: Set(clean(input.evento_fecha)),
        evento_ubicacion: Set(clean(input.evento_ubicacion)),
        asistentes_esperados: Set(input.asistentes_esperados),
        estado: Set(EstadoNegocio::OportunidadCreada.to_string()),
        hubspot_deal_id: Set(hubspot_deal_id),
        owner_id: Set(Some(input.owner_id.unwrap_or(creator_id))),
        fecha_cierre: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    numbering::log_business_number_assignment(&txn, created.id, numero, NumberAction::Assigned)
        .await?;

    txn.commit().await?;

    tracing::info!("Created negocio #{} ({})", created.numero, created.evento_nombre);
    Ok(created)
}

pub async fn update_negocio<C: ConnectionTrait>(
    db: &C,
    id: i32,
    input: UpdateNegocioInput,
) -> Result<negocio::Model, DomainError> {
    let existing = find_negocio(db, id).await?;
    ensure_refs(db, input.contacto_id, [input.productora_id, input.cliente_final_id]).await?;

    let mut active: negocio::ActiveModel = existing.into();

    if let Some(contacto_id) = input.contacto_id {
        active.contacto_id = Set(contacto_id);
    }
    if let Some(productora_id) = input.productora_id {
        active.productora_id = Set(Some(productora_id));
    }
    if let Some(cliente_final_id) = input.cliente_final_id {
        active.cliente_final_id = Set(Some(cliente_final_id));
    }
    if let Some(nombre) = input.evento_nombre {
        let nombre = nombre.trim().to_string();
        if nombre.is_empty() {
            return Err(DomainError::validation("evento_nombre cannot be empty"));
        }
        active.evento_nombre = Set(nombre);
    }
    if input.evento_tipo.is_some() {
        active.evento_tipo = Set(clean(input.evento_tipo));
    }
    if input.evento_fecha.is_some() {
        active.evento_fecha = Set(clean(input.evento_fecha));
    }
    if input.evento_ubicacion.is_some() {
        active.evento_ubicacion = Set(clean(input.evento_ubicacion));
    }
    if let Some(asistentes) = input.asistentes_esperados {
        if asistentes < 0 {
            return Err(DomainError::validation("asistentes_esperados cannot be negative"));
        }
        active.asistentes_esperados = Set(Some(asistentes));
    }
    if input.hubspot_deal_id.is_some() {
        active.hubspot_deal_id = Set(deal_id(input.hubspot_deal_id)?);
    }
    if let Some(owner_id) = input.owner_id {
        active.owner_id = Set(Some(owner_id));
    }

    active.updated_at = Set(now_timestamp());
    Ok(active.update(db).await?)
}

pub async fn delete_negocio<C>(db: &C, id: i32) -> Result<(), DomainError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let negocio = find_negocio(&txn, id).await?;

    let quote_ids: Vec<i32> = presupuesto::Entity::find()
        .filter(presupuesto::Column::NegocioId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    producto_presupuesto::Entity::delete_many()
        .filter(producto_presupuesto::Column::PresupuestoId.is_in(quote_ids))
        .exec(&txn)
        .await?;
    presupuesto::Entity::delete_many()
        .filter(presupuesto::Column::NegocioId.eq(id))
        .exec(&txn)
        .await?;
    queue::discard_for_negocio(&txn, id).await?;

    numbering::log_business_number_assignment(&txn, id, negocio.numero, NumberAction::Released)
        .await?;
    negocio.delete(&txn).await?;

    txn.commit().await?;
    tracing::info!("Deleted negocio {}", id);
    Ok(())
}

/// Write a state without queueing a push. `fecha_cierre` follows the state.
pub async fn write_state<C: ConnectionTrait>(
    db: &C,
    negocio: negocio::Model,
    estado: EstadoNegocio,
) -> Result<negocio::Model, DomainError> {
    let fecha_cierre = if estado.is_closed() {
        negocio.fecha_cierre.clone().or_else(|| Some(now_timestamp()))
    } else {
        None
    };

    let mut active: negocio::ActiveModel = negocio.into();
    active.estado = Set(estado.to_string());
    active.fecha_cierre = Set(fecha_cierre);
    active.updated_at = Set(now_timestamp());
    Ok(active.update(db).await?)
}

/// Change the state and enqueue the HubSpot push. No-op when unchanged.
pub async fn apply_state<C: ConnectionTrait>(
    db: &C,
    negocio: negocio::Model,
    estado: EstadoNegocio,
    priority: Priority,
) -> Result<(negocio::Model, bool), DomainError> {
    if negocio.estado == estado.as_ref() {
        return Ok((negocio, false));
    }

    let previous = negocio.estado.clone();
    let updated = write_state(db, negocio, estado).await?;
    queue::enqueue_update_stage(db, updated.id, estado, priority).await?;

    tracing::info!(
        "Negocio #{}: {} -> {}",
        updated.numero,
        previous,
        updated.estado
    );
    Ok((updated, true))
}

/// A state chosen by a user.
pub async fn change_state<C>(
    db: &C,
    id: i32,
    estado: EstadoNegocio,
) -> Result<negocio::Model, DomainError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let negocio = find_negocio(&txn, id).await?;
    let (updated, _) = apply_state(&txn, negocio, estado, Priority::High).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Derive the state from the quotes. Returns whether it changed.
pub async fn recalculate_state<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<(negocio::Model, bool), DomainError> {
    let negocio = find_negocio(db, id).await?;
    let current = parse_estado(&negocio.estado)?;

    let quotes: Vec<EstadoPresupuesto> = presupuesto::Entity::find()
        .filter(presupuesto::Column::NegocioId.eq(id))
        .all(db)
        .await?
        .iter()
        .filter_map(|p| EstadoPresupuesto::from_str(&p.estado).ok())
        .collect();

    let derived = derive_business_state(current, &quotes);
    apply_state(db, negocio, derived, Priority::Normal).await
}

/// All negocios as CSV, newest number first.
pub async fn export_csv<C: ConnectionTrait>(db: &C) -> Result<String, DomainError> {
    let rows = list_negocios(db, NegocioFilter::default()).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "numero",
            "evento_nombre",
            "estado",
            "contacto",
            "evento_fecha",
            "valor",
            "hubspot_deal_id",
            "created_at",
        ])
        .map_err(|e| DomainError::Internal(e.to_string()))?;

    for row in rows {
        let n = &row.negocio;
        writer
            .write_record([
                n.numero.to_string(),
                n.evento_nombre.clone(),
                n.estado.clone(),
                row.contacto_nombre.clone().unwrap_or_default(),
                n.evento_fecha.clone().unwrap_or_default(),
                format!("{:.0}", row.valor),
                n.hubspot_deal_id.clone().unwrap_or_default(),
                n.created_at.clone(),
            ])
            .map_err(|e| DomainError::Internal(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DomainError::Internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DomainError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    async fn contacto(db: &sea_orm::DatabaseConnection) -> i32 {
        let now = now_timestamp();
        contacto::ActiveModel {
            nombre: Set("Carla".into()),
            apellido: Set(Some("Rojas".into())),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    fn input(contacto_id: i32, nombre: &str) -> CreateNegocioInput {
        CreateNegocioInput {
            contacto_id,
            productora_id: None,
            cliente_final_id: None,
            evento_nombre: nombre.into(),
            evento_tipo: None,
            evento_fecha: None,
            evento_ubicacion: None,
            asistentes_esperados: Some(300),
            hubspot_deal_id: None,
            owner_id: None,
        }
    }

    #[tokio::test]
    async fn numbers_are_sequential_and_logged() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let cid = contacto(&db).await;

        let a = create_negocio(&db, input(cid, "Lanzamiento"), 1).await.unwrap();
        let b = create_negocio(&db, input(cid, "Congreso"), 1).await.unwrap();

        assert_eq!(a.numero, 1);
        assert_eq!(b.numero, 2);
        assert_eq!(a.estado, "oportunidad_creada");
        assert_eq!(numbering::number_history(&db, b.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_unknown_contact() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let result = create_negocio(&db, input(42, "Nada"), 1).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn manual_state_change_enqueues_push_and_stamps_close_date() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let cid = contacto(&db).await;
        let n = create_negocio(&db, input(cid, "Gala"), 1).await.unwrap();

        let updated = change_state(&db, n.id, EstadoNegocio::Cancelado).await.unwrap();
        assert_eq!(updated.estado, "cancelado");
        assert!(updated.fecha_cierre.is_some());

        let items = queue::list_items(&db, queue::QueueFilter::default()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].prioridad, Priority::High.as_i32());

        // Same state again is a no-op
        change_state(&db, n.id, EstadoNegocio::Cancelado).await.unwrap();
        let items = queue::list_items(&db, queue::QueueFilter::default()).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn csv_export_has_header_and_rows() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let cid = contacto(&db).await;
        create_negocio(&db, input(cid, "Expo, Norte"), 1).await.unwrap();

        let csv = export_csv(&db).await.unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("numero,evento_nombre,estado"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Expo, Norte\""));
        assert!(row.contains("Carla Rojas"));
    }
}
