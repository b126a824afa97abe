//! Stateless calculators backing the quote editor and the staffing widget

use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::Claims;
use crate::domain::DomainError;
use crate::domain::accreditation::{self, AccreditationInput, AccreditationResult};
use crate::domain::quote::{self, QuoteLine, QuoteTotals};

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteTotalsRequest {
    pub lineas: Vec<QuoteLine>,
}

#[utoipa::path(
    post,
    path = "/api/calculators/quote-totals",
    tag = "calculators",
    request_body = QuoteTotalsRequest,
    responses(
        (status = 200, description = "Totals with 19% IVA", body = QuoteTotals),
        (status = 400, description = "Invalid line")
    ),
    security(("bearer" = []))
)]
pub async fn quote_totals(
    _claims: Claims,
    Json(payload): Json<QuoteTotalsRequest>,
) -> Result<Json<QuoteTotals>, DomainError> {
    for line in &payload.lineas {
        quote::validate_line(line).map_err(DomainError::Validation)?;
    }
    Ok(Json(quote::calculate_quote_totals(&payload.lineas)))
}

#[utoipa::path(
    post,
    path = "/api/calculators/accreditation",
    tag = "calculators",
    request_body = AccreditationInput,
    responses(
        (status = 200, description = "Staffing plan and cost", body = AccreditationResult),
        (status = 400, description = "Invalid capacity or percentages")
    ),
    security(("bearer" = []))
)]
pub async fn accreditation(
    _claims: Claims,
    Json(payload): Json<AccreditationInput>,
) -> Result<Json<AccreditationResult>, DomainError> {
    accreditation::calculate_accreditation(&payload)
        .map(Json)
        .map_err(DomainError::Validation)
}
