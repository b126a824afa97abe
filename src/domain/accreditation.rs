//! Accreditation staffing calculator
//!
//! Splits expected attendees between manual and express-QR check-in and
//! derives how many accreditors and supervisors an event needs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_MANUAL_CAPACITY: u32 = 75;
pub const DEFAULT_EXPRESS_QR_CAPACITY: u32 = 95;
/// One supervisor per this many accreditors.
pub const ACCREDITORS_PER_SUPERVISOR: u32 = 5;

fn default_manual_capacity() -> u32 {
    DEFAULT_MANUAL_CAPACITY
}

fn default_express_qr_capacity() -> u32 {
    DEFAULT_EXPRESS_QR_CAPACITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccreditationInput {
    pub attendees: u32,
    pub manual_percentage: f64,
    pub express_qr_percentage: f64,
    #[serde(default = "default_manual_capacity")]
    pub manual_capacity: u32,
    #[serde(default = "default_express_qr_capacity")]
    pub express_qr_capacity: u32,
    #[serde(default)]
    pub accreditor_cost: f64,
    #[serde(default)]
    pub supervisor_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccreditationResult {
    pub manual_percentage: f64,
    pub express_qr_percentage: f64,
    pub manual_attendees: u32,
    pub express_qr_attendees: u32,
    pub manual_accreditors: u32,
    pub express_qr_accreditors: u32,
    pub total_accreditors: u32,
    pub supervisors: u32,
    pub total_cost: f64,
}

/// Scale the two percentages so they add up to 100.
/// Both at zero means everything goes through manual check-in.
fn normalize(manual: f64, express_qr: f64) -> (f64, f64) {
    let sum = manual + express_qr;
    if sum <= 0.0 {
        return (100.0, 0.0);
    }
    if (sum - 100.0).abs() < f64::EPSILON {
        return (manual, express_qr);
    }
    let manual = manual / sum * 100.0;
    (manual, 100.0 - manual)
}

pub fn calculate_accreditation(input: &AccreditationInput) -> Result<AccreditationResult, String> {
    if input.manual_capacity == 0 || input.express_qr_capacity == 0 {
        return Err("capacities must be greater than zero".to_string());
    }
    if input.manual_percentage < 0.0 || input.express_qr_percentage < 0.0 {
        return Err("percentages cannot be negative".to_string());
    }
    if input.accreditor_cost < 0.0 || input.supervisor_cost < 0.0 {
        return Err("costs cannot be negative".to_string());
    }

    let (manual_percentage, express_qr_percentage) =
        normalize(input.manual_percentage, input.express_qr_percentage);

    let manual_attendees = ((f64::from(input.attendees) * manual_percentage / 100.0).round()
        as u32)
        .min(input.attendees);
    let express_qr_attendees = input.attendees - manual_attendees;

    let manual_accreditors = manual_attendees.div_ceil(input.manual_capacity);
    let express_qr_accreditors = express_qr_attendees.div_ceil(input.express_qr_capacity);
    let total_accreditors = manual_accreditors + express_qr_accreditors;

    let supervisors = if total_accreditors == 0 {
        0
    } else {
        total_accreditors.div_ceil(ACCREDITORS_PER_SUPERVISOR).max(1)
    };

    let total_cost = f64::from(total_accreditors) * input.accreditor_cost
        + f64::from(supervisors) * input.supervisor_cost;

    Ok(AccreditationResult {
        manual_percentage,
        express_qr_percentage,
        manual_attendees,
        express_qr_attendees,
        manual_accreditors,
        express_qr_accreditors,
        total_accreditors,
        supervisors,
        total_cost,
    })
}
