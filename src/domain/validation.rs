//! Input validation helpers

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_EMAIL_LENGTH: usize = 254;
const MAX_LOCAL_PART_LENGTH: usize = 64;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email regex is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    if email.contains("..") {
        return false;
    }
    let Some((local, _domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > MAX_LOCAL_PART_LENGTH {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') {
        return false;
    }
    EMAIL_RE.is_match(email)
}

/// Validate an optional email field, treating blank as absent.
pub fn validate_optional_email(email: Option<&str>) -> Result<(), String> {
    match email.map(str::trim) {
        None | Some("") => Ok(()),
        Some(e) if is_valid_email(e) => Ok(()),
        Some(e) => Err(format!("Invalid email address: {e}")),
    }
}

/// HubSpot deal ids are numeric object ids.
pub fn is_valid_deal_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 32 && id.bytes().all(|b| b.is_ascii_digit())
}

pub fn require_non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(())
    }
}
