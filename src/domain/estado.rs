//! Business and quote lifecycle states
//!
//! There is no transition table: any state may be set by a user. The only
//! automatic rule is [`derive_business_state`], used by recalculation.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EstadoNegocio {
    OportunidadCreada,
    PresupuestoEnviado,
    ParcialmenteAceptado,
    NegocioAceptado,
    ParcialmenteFacturado,
    Facturado,
    NegocioPerdido,
    NegocioCerrado,
    Cancelado,
}

impl EstadoNegocio {
    /// States only a user sets; recalculation leaves them alone.
    pub fn is_manual(self) -> bool {
        matches!(
            self,
            EstadoNegocio::ParcialmenteFacturado
                | EstadoNegocio::Facturado
                | EstadoNegocio::NegocioCerrado
                | EstadoNegocio::Cancelado
        )
    }

    /// States that stamp `fecha_cierre`.
    pub fn is_closed(self) -> bool {
        matches!(
            self,
            EstadoNegocio::Facturado
                | EstadoNegocio::NegocioPerdido
                | EstadoNegocio::NegocioCerrado
                | EstadoNegocio::Cancelado
        )
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EstadoPresupuesto {
    Borrador,
    Enviado,
    Aprobado,
    Rechazado,
    Vencido,
    Cancelado,
}

impl EstadoPresupuesto {
    /// Quotes whose total counts toward the business value.
    pub fn counts_toward_value(self) -> bool {
        matches!(self, EstadoPresupuesto::Aprobado | EstadoPresupuesto::Enviado)
    }
}

/// Derive a business state from its quotes.
pub fn derive_business_state(
    current: EstadoNegocio,
    quotes: &[EstadoPresupuesto],
) -> EstadoNegocio {
    use EstadoPresupuesto as P;

    if current.is_manual() {
        return current;
    }

    let active: Vec<P> = quotes.iter().copied().filter(|q| *q != P::Cancelado).collect();
    if active.is_empty() || active.iter().all(|q| *q == P::Borrador) {
        return EstadoNegocio::OportunidadCreada;
    }

    let approved = active.iter().any(|q| *q == P::Aprobado);
    let pending = active.iter().any(|q| matches!(q, P::Borrador | P::Enviado));

    if approved && pending {
        EstadoNegocio::ParcialmenteAceptado
    } else if approved {
        EstadoNegocio::NegocioAceptado
    } else if active.iter().any(|q| *q == P::Enviado) {
        EstadoNegocio::PresupuestoEnviado
    } else if active.iter().all(|q| matches!(q, P::Rechazado | P::Vencido)) {
        EstadoNegocio::NegocioPerdido
    } else {
        EstadoNegocio::OportunidadCreada
    }
}

/// Sum of the totals of approved and sent quotes.
pub fn business_value<'a, I>(quotes: I) -> f64
where
    I: IntoIterator<Item = (EstadoPresupuesto, &'a f64)>,
{
    quotes
        .into_iter()
        .filter(|(estado, _)| estado.counts_toward_value())
        .map(|(_, total)| *total)
        .sum()
}
