//! Domain layer - Pure business rules
//!
//! No database access and no HTTP here. Types derive serde and OpenAPI
//! schemas so the API can expose them directly; everything else is
//! deterministic and unit tested in place.

pub mod accreditation;
pub mod errors;
pub mod estado;
pub mod permissions;
pub mod quote;
pub mod validation;

pub use errors::DomainError;
pub use estado::{EstadoNegocio, EstadoPresupuesto};
pub use permissions::{Permission, Role};
