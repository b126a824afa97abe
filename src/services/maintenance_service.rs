//! Business-state maintenance
//!
//! Three steps run in order, each in its own transaction:
//! audit and repair, quote expiry, and state recalculation. The first
//! failing step stops the run and its error is returned; earlier steps
//! stay committed.

use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use utoipa::ToSchema;

use super::numbering::{self, NumberAction};
use super::{negocio_service, now_timestamp, presupuesto_service};
use crate::domain::quote::calculate_quote_totals;
use crate::domain::{DomainError, EstadoNegocio, EstadoPresupuesto};
use crate::models::{negocio, presupuesto, producto_presupuesto};

/// Differences below half a peso are rounding noise.
const TOTAL_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Renumbered {
    pub negocio_id: i32,
    pub numero_anterior: i32,
    pub numero_nuevo: i32,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct AuditReport {
    pub renumerados: Vec<Renumbered>,
    pub estados_negocio_corregidos: usize,
    pub estados_presupuesto_corregidos: usize,
    pub lineas_corregidas: usize,
    pub totales_corregidos: usize,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct RecalculationReport {
    pub revisados: usize,
    pub cambiados: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MaintenanceReport {
    pub audit: AuditReport,
    pub vencidos: presupuesto_service::ExpirationReport,
    pub recalculo: RecalculationReport,
    pub started_at: String,
    pub finished_at: String,
}

/// Repair duplicate numbers, unknown states and stale totals.
pub async fn comprehensive_state_audit_and_fix<C: ConnectionTrait>(
    db: &C,
) -> Result<AuditReport, DomainError> {
    let mut report = AuditReport::default();

    // Lowest id keeps its number; later holders get fresh ones
    let negocios = negocio::Entity::find()
        .order_by_asc(negocio::Column::Id)
        .all(db)
        .await?;
    let mut next = numbering::get_next_business_number(db).await?;
    let mut seen = HashSet::new();

    for n in negocios {
        if seen.insert(n.numero) {
            continue;
        }
        let (id, anterior) = (n.id, n.numero);
        let mut active: negocio::ActiveModel = n.into();
        active.numero = Set(next);
        active.updated_at = Set(now_timestamp());
        active.update(db).await?;
        numbering::log_business_number_assignment(db, id, next, NumberAction::Reassigned).await?;

        tracing::warn!("Negocio {} renumbered {} -> {}", id, anterior, next);
        report.renumerados.push(Renumbered {
            negocio_id: id,
            numero_anterior: anterior,
            numero_nuevo: next,
        });
        seen.insert(next);
        next += 1;
    }

    for n in negocio::Entity::find().all(db).await? {
        if EstadoNegocio::from_str(&n.estado).is_err() {
            tracing::warn!("Negocio {} had unknown estado '{}'", n.id, n.estado);
            negocio_service::write_state(db, n, EstadoNegocio::OportunidadCreada).await?;
            report.estados_negocio_corregidos += 1;
        }
    }

    for p in presupuesto::Entity::find().all(db).await? {
        if EstadoPresupuesto::from_str(&p.estado).is_err() {
            tracing::warn!("Presupuesto {} had unknown estado '{}'", p.id, p.estado);
            let mut active: presupuesto::ActiveModel = p.into();
            active.estado = Set(EstadoPresupuesto::Borrador.to_string());
            active.updated_at = Set(now_timestamp());
            active.update(db).await?;
            report.estados_presupuesto_corregidos += 1;
        }
    }

    for line in producto_presupuesto::Entity::find().all(db).await? {
        let expected = line.as_quote_line().total();
        if (line.total - expected).abs() > TOTAL_TOLERANCE {
            let mut active: producto_presupuesto::ActiveModel = line.into();
            active.total = Set(expected);
            active.update(db).await?;
            report.lineas_corregidas += 1;
        }
    }

    let lines = producto_presupuesto::Entity::find().all(db).await?;
    for p in presupuesto::Entity::find().all(db).await? {
        let quote_lines: Vec<_> = lines
            .iter()
            .filter(|l| l.presupuesto_id == p.id)
            .map(|l| l.as_quote_line())
            .collect();
        let expected = calculate_quote_totals(&quote_lines).total;
        if (p.total - expected).abs() > TOTAL_TOLERANCE {
            tracing::warn!("Presupuesto {} total {} -> {}", p.id, p.total, expected);
            let mut active: presupuesto::ActiveModel = p.into();
            active.total = Set(expected);
            active.updated_at = Set(now_timestamp());
            active.update(db).await?;
            report.totales_corregidos += 1;
        }
    }

    Ok(report)
}

pub async fn actualizar_presupuestos_vencidos<C: ConnectionTrait>(
    db: &C,
) -> Result<presupuesto_service::ExpirationReport, DomainError> {
    presupuesto_service::expire_overdue(db, presupuesto_service::today()).await
}

/// Changed states enqueue a HubSpot push like any other change.
pub async fn recalcular_todos_estados_negocios<C: ConnectionTrait>(
    db: &C,
) -> Result<RecalculationReport, DomainError> {
    let ids: Vec<i32> = negocio::Entity::find()
        .order_by_asc(negocio::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|n| n.id)
        .collect();

    let mut report = RecalculationReport::default();
    for id in ids {
        let (_, changed) = negocio_service::recalculate_state(db, id).await?;
        report.revisados += 1;
        if changed {
            report.cambiados += 1;
        }
    }
    Ok(report)
}

pub async fn run_business_state_maintenance<C>(db: &C) -> Result<MaintenanceReport, DomainError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let started_at = now_timestamp();
    tracing::info!("Business state maintenance started");

    let txn = db.begin().await?;
    let audit = comprehensive_state_audit_and_fix(&txn).await?;
    txn.commit().await?;

    let txn = db.begin().await?;
    let vencidos = actualizar_presupuestos_vencidos(&txn).await?;
    txn.commit().await?;

    let txn = db.begin().await?;
    let recalculo = recalcular_todos_estados_negocios(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        "Maintenance done: {} renumbered, {} totals fixed, {} expired, {} states changed",
        audit.renumerados.len(),
        audit.totales_corregidos,
        vencidos.expirados,
        recalculo.cambiados
    );

    Ok(MaintenanceReport {
        audit,
        vencidos,
        recalculo,
        started_at,
        finished_at: now_timestamp(),
    })
}

/// Run maintenance every `interval` until the task is dropped.
pub async fn run_scheduler(db: DatabaseConnection, interval: Duration) {
    if interval.is_zero() {
        tracing::info!("Scheduled maintenance disabled");
        return;
    }

    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = run_business_state_maintenance(&db).await {
            tracing::error!("Scheduled maintenance failed: {}", e);
        }
    }
}
