//! Role-based permission gate
//!
//! Two fixed roles map to static permission sets. Checks are plain set
//! membership; `admin` passes every check.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    User,
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
pub enum Permission {
    ViewDashboard,
    ViewBusinesses,
    CreateBusinesses,
    EditBusinesses,
    DeleteBusinesses,
    CreateBudgets,
    EditBudgets,
    DeleteBudgets,
    ViewProducts,
    CreateProducts,
    EditProducts,
    DeleteProducts,
    ManageContacts,
    ManageCompanies,
    ManageBrand,
    ManageBudgetTerms,
    ManageHubspot,
    RunMaintenance,
    ManageUsers,
}

const USER_PERMISSIONS: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ViewBusinesses,
    Permission::CreateBusinesses,
    Permission::EditBusinesses,
    Permission::CreateBudgets,
    Permission::EditBudgets,
    Permission::ViewProducts,
    Permission::ManageContacts,
    Permission::ManageCompanies,
    Permission::ManageHubspot,
];

/// Static permission set granted to a role.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => Permission::iter().collect(),
        Role::User => USER_PERMISSIONS.to_vec(),
    }
}

pub fn has_permission(role: Role, permission: Permission) -> bool {
    match role {
        Role::Admin => true,
        Role::User => USER_PERMISSIONS.contains(&permission),
    }
}

pub fn has_any_permission(role: Role, permissions: &[Permission]) -> bool {
    role == Role::Admin || permissions.iter().any(|p| has_permission(role, *p))
}

pub fn has_all_permissions(role: Role, permissions: &[Permission]) -> bool {
    role == Role::Admin || permissions.iter().all(|p| has_permission(role, *p))
}
