//! Quote (presupuesto) totals
//!
//! Totals are never trusted from storage: every write recomputes them from
//! the line items with [`calculate_quote_totals`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// VAT percentage applied after discounts.
pub const IVA_PERCENT: f64 = 19.0;

/// The inputs of a quote line needed for pricing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub cantidad: f64,
    pub precio_unitario: f64,
    #[serde(default)]
    pub descuento_porcentaje: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTotals {
    pub subtotal: f64,
    pub descuento: f64,
    pub subtotal_con_descuento: f64,
    pub iva: f64,
    pub total: f64,
}

impl QuoteLine {
    pub fn gross(&self) -> f64 {
        self.cantidad * self.precio_unitario
    }

    pub fn discount(&self) -> f64 {
        self.gross() * self.descuento_porcentaje / 100.0
    }

    /// Line total after its own discount, before VAT.
    pub fn total(&self) -> f64 {
        self.gross() - self.discount()
    }
}

pub fn line_total(line: &QuoteLine) -> f64 {
    line.total()
}

pub fn calculate_quote_totals(lines: &[QuoteLine]) -> QuoteTotals {
    let subtotal: f64 = lines.iter().map(QuoteLine::gross).sum();
    let descuento: f64 = lines.iter().map(QuoteLine::discount).sum();
    let subtotal_con_descuento = subtotal - descuento;
    let iva = subtotal_con_descuento * IVA_PERCENT / 100.0;

    QuoteTotals {
        subtotal,
        descuento,
        subtotal_con_descuento,
        iva,
        total: subtotal_con_descuento + iva,
    }
}

/// Reject lines that cannot be priced.
pub fn validate_line(line: &QuoteLine) -> Result<(), String> {
    if !line.cantidad.is_finite() || line.cantidad <= 0.0 {
        return Err("cantidad must be greater than zero".to_string());
    }
    if !line.precio_unitario.is_finite() || line.precio_unitario < 0.0 {
        return Err("precioUnitario cannot be negative".to_string());
    }
    if !(0.0..=100.0).contains(&line.descuento_porcentaje) {
        return Err("descuentoPorcentaje must be between 0 and 100".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(cantidad: f64, precio_unitario: f64, descuento_porcentaje: f64) -> QuoteLine {
        QuoteLine {
            cantidad,
            precio_unitario,
            descuento_porcentaje,
        }
    }

    #[test]
    fn single_discounted_line() {
        let totals = calculate_quote_totals(&[line(2.0, 1000.0, 10.0)]);
        assert_eq!(totals.subtotal, 2000.0);
        assert_eq!(totals.descuento, 200.0);
        assert_eq!(totals.subtotal_con_descuento, 1800.0);
        assert_eq!(totals.iva, 342.0);
        assert_eq!(totals.total, 2142.0);
    }

    #[test]
    fn empty_quote_is_zero() {
        assert_eq!(calculate_quote_totals(&[]), QuoteTotals::default());
    }

    #[test]
    fn recomputing_is_idempotent_and_does_not_mutate() {
        let lines = vec![line(3.0, 500.0, 0.0), line(1.0, 10000.0, 25.0)];
        let snapshot = lines.clone();
        let first = calculate_quote_totals(&lines);
        let second = calculate_quote_totals(&lines);
        assert_eq!(first, second);
        assert_eq!(lines, snapshot);
        assert_eq!(first.subtotal, 11500.0);
        assert_eq!(first.descuento, 2500.0);
    }

    #[test]
    fn line_order_does_not_matter() {
        let a = [line(1.0, 100.0, 5.0), line(4.0, 20.0, 50.0)];
        let b = [a[1], a[0]];
        assert_eq!(calculate_quote_totals(&a), calculate_quote_totals(&b));
    }

    #[test]
    fn totals_serialize_camel_case() {
        let json = serde_json::to_value(calculate_quote_totals(&[line(1.0, 100.0, 0.0)])).unwrap();
        assert_eq!(json["subtotalConDescuento"], 100.0);
        assert_eq!(json["iva"], 19.0);
    }

    #[test]
    fn rejects_invalid_lines() {
        assert!(validate_line(&line(0.0, 100.0, 0.0)).is_err());
        assert!(validate_line(&line(1.0, -1.0, 0.0)).is_err());
        assert!(validate_line(&line(1.0, 1.0, 101.0)).is_err());
        assert!(validate_line(&line(1.0, 1.0, 100.0)).is_ok());
    }
}
