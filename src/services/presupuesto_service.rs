//! Presupuesto Service - quotes, their line items and lifecycle
//!
//! The stored `total` of a quote is always rewritten from its lines. Any
//! change that can move a quote's state also recalculates the negocio.
#![allow(clippy::needless_update)] // SeaORM ActiveModels require ..Default::default()

use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

use super::{brand_service, budget_terms_service, clean, negocio_service, now_timestamp};
use crate::domain::quote::{QuoteLine, QuoteTotals, calculate_quote_totals, validate_line};
use crate::domain::{DomainError, EstadoPresupuesto};
use crate::models::{
    budget_terms_config, configuracion_marca, contacto, negocio, presupuesto, producto_biblioteca,
    producto_presupuesto,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LineInput {
    /// Library product to copy nombre and precio from when they are omitted
    pub producto_id: Option<i32>,
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub cantidad: f64,
    pub precio_unitario: Option<f64>,
    #[serde(default)]
    pub descuento_porcentaje: f64,
    pub comentarios: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePresupuestoInput {
    pub negocio_id: i32,
    pub nombre: String,
    /// YYYY-MM-DD; defaults to today plus the configured validity
    pub fecha_vencimiento: Option<String>,
    #[serde(default)]
    pub lineas: Vec<LineInput>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdatePresupuestoInput {
    pub nombre: Option<String>,
    pub fecha_vencimiento: Option<String>,
    /// Replaces every line when present
    pub lineas: Option<Vec<LineInput>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresupuestoDetail {
    #[serde(flatten)]
    pub presupuesto: presupuesto::Model,
    pub lineas: Vec<producto_presupuesto::Model>,
    pub totales: QuoteTotals,
}

/// Everything the printed quote shows.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteDocument {
    pub marca: configuracion_marca::Model,
    pub terminos: budget_terms_config::Model,
    pub negocio: negocio::Model,
    pub contacto: Option<contacto::Model>,
    pub presupuesto: presupuesto::Model,
    pub lineas: Vec<producto_presupuesto::Model>,
    pub totales: QuoteTotals,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ExpirationReport {
    pub expirados: usize,
    pub negocios: Vec<i32>,
}

pub(crate) fn parse_estado(raw: &str) -> Result<EstadoPresupuesto, DomainError> {
    EstadoPresupuesto::from_str(raw)
        .map_err(|_| DomainError::InvalidState(format!("Unknown presupuesto estado '{}'", raw)))
}

fn parse_date(raw: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        DomainError::validation(format!("fecha_vencimiento '{}' is not YYYY-MM-DD", raw))
    })
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn find_presupuesto<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<presupuesto::Model, DomainError> {
    presupuesto::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Presupuesto {}", id)))
}

async fn lines_of<C: ConnectionTrait>(
    db: &C,
    presupuesto_id: i32,
) -> Result<Vec<producto_presupuesto::Model>, DomainError> {
    Ok(producto_presupuesto::Entity::find()
        .filter(producto_presupuesto::Column::PresupuestoId.eq(presupuesto_id))
        .order_by_asc(producto_presupuesto::Column::Id)
        .all(db)
        .await?)
}

fn totals_of(lines: &[producto_presupuesto::Model]) -> QuoteTotals {
    let quote_lines: Vec<QuoteLine> = lines.iter().map(|l| l.as_quote_line()).collect();
    calculate_quote_totals(&quote_lines)
}

pub async fn list_presupuestos<C: ConnectionTrait>(
    db: &C,
    negocio_id: Option<i32>,
) -> Result<Vec<presupuesto::Model>, DomainError> {
    let mut query = presupuesto::Entity::find();
    if let Some(id) = negocio_id {
        query = query.filter(presupuesto::Column::NegocioId.eq(id));
    }
    Ok(query
        .order_by_desc(presupuesto::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn get_presupuesto_detail<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<PresupuestoDetail, DomainError> {
    let presupuesto = find_presupuesto(db, id).await?;
    let lineas = lines_of(db, id).await?;
    Ok(PresupuestoDetail {
        totales: totals_of(&lineas),
        presupuesto,
        lineas,
    })
}

/// Insert lines, filling gaps from the product library.
async fn insert_lines<C: ConnectionTrait>(
    db: &C,
    presupuesto_id: i32,
    lines: Vec<LineInput>,
) -> Result<(), DomainError> {
    for (i, line) in lines.into_iter().enumerate() {
        let producto = match line.producto_id {
            Some(pid) => Some(
                producto_biblioteca::Entity::find_by_id(pid)
                    .one(db)
                    .await?
                    .ok_or_else(|| {
                        DomainError::validation(format!(
                            "Line {}: producto {} does not exist",
                            i + 1,
                            pid
                        ))
                    })?,
            ),
            None => None,
        };

        let nombre = clean(line.nombre)
            .or_else(|| producto.as_ref().map(|p| p.nombre.clone()))
            .ok_or_else(|| DomainError::validation(format!("Line {}: nombre is required", i + 1)))?;
        let precio_unitario = line
            .precio_unitario
            .or_else(|| producto.as_ref().map(|p| p.precio_base))
            .ok_or_else(|| {
                DomainError::validation(format!("Line {}: precio_unitario is required", i + 1))
            })?;

        let quote_line = QuoteLine {
            cantidad: line.cantidad,
            precio_unitario,
            descuento_porcentaje: line.descuento_porcentaje,
        };
        validate_line(&quote_line).map_err(|e| {
            DomainError::validation(format!("Line {}: {}", i + 1, e))
        })?;

        producto_presupuesto::ActiveModel {
            presupuesto_id: Set(presupuesto_id),
            producto_id: Set(line.producto_id),
            nombre: Set(nombre),
            descripcion: Set(clean(line.descripcion)
                .or_else(|| producto.as_ref().and_then(|p| p.descripcion.clone()))),
            cantidad: Set(quote_line.cantidad),
            precio_unitario: Set(quote_line.precio_unitario),
            descuento_porcentaje: Set(quote_line.descuento_porcentaje),
            total: Set(quote_line.total()),
            comentarios: Set(clean(line.comentarios)),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Rewrite the cached total of a quote from its lines.
pub async fn recompute_total<C: ConnectionTrait>(
    db: &C,
    presupuesto: presupuesto::Model,
) -> Result<presupuesto::Model, DomainError> {
    let totals = totals_of(&lines_of(db, presupuesto.id).await?);
    if presupuesto.total == totals.total {
        return Ok(presupuesto);
    }

    let mut active: presupuesto::ActiveModel = presupuesto.into();
    active.total = Set(totals.total);
    active.updated_at = Set(now_timestamp());
    Ok(active.update(db).await?)
}

pub async fn create_presupuesto<C>(
    db: &C,
    input: CreatePresupuestoInput,
) -> Result<PresupuestoDetail, DomainError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let nombre = input.nombre.trim().to_string();
    if nombre.is_empty() {
        return Err(DomainError::validation("nombre is required"));
    }

    let txn = db.begin().await?;
    negocio_service::find_negocio(&txn, input.negocio_id).await?;

    let vencimiento = match clean(input.fecha_vencimiento) {
        Some(raw) => parse_date(&raw)?,
        None => {
            let terms = budget_terms_service::get_terms(&txn).await?;
            today() + Duration::days(i64::from(terms.validez_dias))
        }
    };

    let now = now_timestamp();
    let created = presupuesto::ActiveModel {
        negocio_id: Set(input.negocio_id),
        nombre: Set(nombre),
        estado: Set(EstadoPresupuesto::Borrador.to_string()),
        total: Set(0.0),
        fecha_vencimiento: Set(Some(vencimiento.format("%Y-%m-%d").to_string())),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    insert_lines(&txn, created.id, input.lineas).await?;
    let created = recompute_total(&txn, created).await?;
    negocio_service::recalculate_state(&txn, created.negocio_id).await?;

    txn.commit().await?;
    tracing::info!(
        "Created presupuesto {} for negocio {} (total {:.0})",
        created.id,
        created.negocio_id,
        created.total
    );

    get_presupuesto_detail(db, created.id).await
}

pub async fn update_presupuesto<C>(
    db: &C,
    id: i32,
    input: UpdatePresupuestoInput,
) -> Result<PresupuestoDetail, DomainError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let existing = find_presupuesto(&txn, id).await?;

    let estado = parse_estado(&existing.estado)?;
    if !matches!(estado, EstadoPresupuesto::Borrador | EstadoPresupuesto::Enviado) {
        return Err(DomainError::InvalidState(format!(
            "Presupuesto {} is {} and can no longer be edited",
            id, estado
        )));
    }

    let mut active: presupuesto::ActiveModel = existing.into();
    if let Some(nombre) = input.nombre {
        let nombre = nombre.trim().to_string();
        if nombre.is_empty() {
            return Err(DomainError::validation("nombre cannot be empty"));
        }
        active.nombre = Set(nombre);
    }
    if let Some(raw) = clean(input.fecha_vencimiento) {
        active.fecha_vencimiento = Set(Some(parse_date(&raw)?.format("%Y-%m-%d").to_string()));
    }
    active.updated_at = Set(now_timestamp());
    let updated = active.update(&txn).await?;

    if let Some(lineas) = input.lineas {
        producto_presupuesto::Entity::delete_many()
            .filter(producto_presupuesto::Column::PresupuestoId.eq(id))
            .exec(&txn)
            .await?;
        insert_lines(&txn, id, lineas).await?;
    }
    recompute_total(&txn, updated).await?;

    txn.commit().await?;
    get_presupuesto_detail(db, id).await
}

pub async fn delete_presupuesto<C>(db: &C, id: i32) -> Result<(), DomainError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let presupuesto = find_presupuesto(&txn, id).await?;
    let negocio_id = presupuesto.negocio_id;

    producto_presupuesto::Entity::delete_many()
        .filter(producto_presupuesto::Column::PresupuestoId.eq(id))
        .exec(&txn)
        .await?;
    presupuesto.delete(&txn).await?;
    negocio_service::recalculate_state(&txn, negocio_id).await?;

    txn.commit().await?;
    tracing::info!("Deleted presupuesto {}", id);
    Ok(())
}

/// Set a quote's state, stamp the matching date and recalculate its negocio.
pub async fn change_presupuesto_state<C>(
    db: &C,
    id: i32,
    estado: EstadoPresupuesto,
) -> Result<(presupuesto::Model, negocio::Model), DomainError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let existing = find_presupuesto(&txn, id).await?;
    let now = now_timestamp();

    let mut active: presupuesto::ActiveModel = existing.clone().into();
    active.estado = Set(estado.to_string());
    match estado {
        EstadoPresupuesto::Enviado => {
            active.fecha_envio = Set(existing.fecha_envio.or(Some(now.clone())));
        }
        EstadoPresupuesto::Aprobado => {
            active.fecha_aprobacion = Set(Some(now.clone()));
            active.fecha_rechazo = Set(None);
        }
        EstadoPresupuesto::Rechazado => {
            active.fecha_rechazo = Set(Some(now.clone()));
            active.fecha_aprobacion = Set(None);
        }
        _ => {}
    }
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    let (negocio, _) = negocio_service::recalculate_state(&txn, updated.negocio_id).await?;
    txn.commit().await?;

    tracing::info!("Presupuesto {} is now {}", updated.id, updated.estado);
    Ok((updated, negocio))
}

/// Sent quotes whose expiry date is before `today` become `vencido`.
pub async fn expire_overdue<C: ConnectionTrait>(
    db: &C,
    today: NaiveDate,
) -> Result<ExpirationReport, DomainError> {
    let cutoff = today.format("%Y-%m-%d").to_string();
    let overdue = presupuesto::Entity::find()
        .filter(presupuesto::Column::Estado.eq(EstadoPresupuesto::Enviado.as_ref()))
        .filter(presupuesto::Column::FechaVencimiento.is_not_null())
        .filter(presupuesto::Column::FechaVencimiento.lt(cutoff))
        .all(db)
        .await?;

    let mut report = ExpirationReport::default();
    for p in overdue {
        if !report.negocios.contains(&p.negocio_id) {
            report.negocios.push(p.negocio_id);
        }
        let mut active: presupuesto::ActiveModel = p.into();
        active.estado = Set(EstadoPresupuesto::Vencido.to_string());
        active.updated_at = Set(now_timestamp());
        active.update(db).await?;
        report.expirados += 1;
    }

    if report.expirados > 0 {
        tracing::info!("Expired {} overdue presupuestos", report.expirados);
    }
    Ok(report)
}

pub async fn quote_document<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<QuoteDocument, DomainError> {
    let presupuesto = find_presupuesto(db, id).await?;
    let negocio = negocio_service::find_negocio(db, presupuesto.negocio_id).await?;
    let contacto = contacto::Entity::find_by_id(negocio.contacto_id).one(db).await?;
    let lineas = lines_of(db, id).await?;

    Ok(QuoteDocument {
        marca: brand_service::get_brand(db).await?,
        terminos: budget_terms_service::get_terms(db).await?,
        totales: totals_of(&lineas),
        negocio,
        contacto,
        presupuesto,
        lineas,
    })
}
