use sea_orm::{ConnectionTrait, EntityTrait};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::domain::estado::business_value;
use crate::domain::{DomainError, EstadoPresupuesto};
use crate::models::{negocio, presupuesto};
use crate::sync::{conflict, queue};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_negocios: usize,
    pub negocios_por_estado: BTreeMap<String, usize>,
    pub presupuestos_por_estado: BTreeMap<String, usize>,
    /// Σ of sent and approved quote totals
    pub valor_pipeline: f64,
    /// Σ of approved quote totals only
    pub valor_aprobado: f64,
    pub sync_pendientes: u64,
    pub sync_fallidos: u64,
    pub conflictos_abiertos: usize,
}

pub async fn get_stats<C: ConnectionTrait>(db: &C) -> Result<DashboardStats, DomainError> {
    let negocios = negocio::Entity::find().all(db).await?;
    let presupuestos = presupuesto::Entity::find().all(db).await?;

    let mut negocios_por_estado = BTreeMap::new();
    for n in &negocios {
        *negocios_por_estado.entry(n.estado.clone()).or_insert(0) += 1;
    }

    let mut presupuestos_por_estado = BTreeMap::new();
    let mut valued = Vec::with_capacity(presupuestos.len());
    for p in &presupuestos {
        *presupuestos_por_estado.entry(p.estado.clone()).or_insert(0) += 1;
        if let Ok(estado) = EstadoPresupuesto::from_str(&p.estado) {
            valued.push((estado, &p.total));
        }
    }

    let valor_aprobado = valued
        .iter()
        .filter(|(e, _)| *e == EstadoPresupuesto::Aprobado)
        .map(|(_, t)| **t)
        .sum();
    let stats = queue::queue_stats(db).await?;

    Ok(DashboardStats {
        total_negocios: negocios.len(),
        negocios_por_estado,
        presupuestos_por_estado,
        valor_pipeline: business_value(valued),
        valor_aprobado,
        sync_pendientes: stats.pending,
        sync_fallidos: stats.failed,
        conflictos_abiertos: conflict::open_conflicts(db).await?.len(),
    })
}
