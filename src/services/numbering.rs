//! Business numbering - sequential `numero` assignment and consistency checks

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use strum::{AsRefStr, Display};

use crate::domain::DomainError;
use crate::models::{business_number_log, negocio};

pub const FIRST_BUSINESS_NUMBER: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum NumberAction {
    Assigned,
    Reassigned,
    Released,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberingReport {
    pub total: usize,
    pub min: Option<i32>,
    pub max: Option<i32>,
    /// Numbers held by more than one negocio
    pub duplicates: Vec<i32>,
    /// Missing numbers between min and max (deletions leave these)
    pub gaps: Vec<i32>,
    pub is_consistent: bool,
}

/// Pure analysis of the numbers currently in use.
pub fn analyze_numbers(numbers: &[i32]) -> NumberingReport {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for n in numbers {
        *counts.entry(*n).or_default() += 1;
    }

    let duplicates: Vec<i32> = counts
        .iter()
        .filter(|(_, c)| **c > 1)
        .map(|(n, _)| *n)
        .collect();

    let min = counts.keys().next().copied();
    let max = counts.keys().next_back().copied();
    let used: BTreeSet<i32> = counts.keys().copied().collect();
    let gaps = match (min, max) {
        (Some(lo), Some(hi)) => (lo..=hi).filter(|n| !used.contains(n)).collect(),
        _ => Vec::new(),
    };

    NumberingReport {
        total: numbers.len(),
        min,
        max,
        is_consistent: duplicates.is_empty() && min.is_none_or(|m| m >= FIRST_BUSINESS_NUMBER),
        duplicates,
        gaps,
    }
}

pub async fn get_next_business_number<C: ConnectionTrait>(db: &C) -> Result<i32, DomainError> {
    let last = negocio::Entity::find()
        .order_by_desc(negocio::Column::Numero)
        .one(db)
        .await?;

    Ok(last.map_or(FIRST_BUSINESS_NUMBER, |n| n.numero.max(FIRST_BUSINESS_NUMBER - 1) + 1))
}

pub async fn log_business_number_assignment<C: ConnectionTrait>(
    db: &C,
    negocio_id: i32,
    numero: i32,
    accion: NumberAction,
) -> Result<(), DomainError> {
    business_number_log::ActiveModel {
        negocio_id: Set(negocio_id),
        numero: Set(numero),
        accion: Set(accion.to_string()),
        created_at: Set(super::now_timestamp()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::debug!("Business number {} {} for negocio {}", numero, accion, negocio_id);
    Ok(())
}

pub async fn check_business_numbering_consistency<C: ConnectionTrait>(
    db: &C,
) -> Result<NumberingReport, DomainError> {
    let numbers: Vec<i32> = negocio::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|n| n.numero)
        .collect();

    let report = analyze_numbers(&numbers);
    if !report.is_consistent {
        tracing::warn!(
            "Business numbering inconsistent: {} duplicated numbers",
            report.duplicates.len()
        );
    }
    Ok(report)
}

/// Numbers assigned to a negocio, oldest first.
pub async fn number_history<C: ConnectionTrait>(
    db: &C,
    negocio_id: i32,
) -> Result<Vec<business_number_log::Model>, DomainError> {
    Ok(business_number_log::Entity::find()
        .filter(business_number_log::Column::NegocioId.eq(negocio_id))
        .order_by_asc(business_number_log::Column::Id)
        .all(db)
        .await?)
}
