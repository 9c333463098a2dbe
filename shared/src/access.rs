//! Access policy: which role may invoke which operation
//!
//! The policy is an explicit capability table over closed enums. Every
//! mutating ledger, store and report call checks it before touching state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

/// Operations gated by the access policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ViewProducts,
    ManageProducts,
    CreateOrder,
    ViewOwnOrders,
    CancelOwnOrder,
    ViewAllOrders,
    UpdateOrderStatus,
    ViewReports,
    GenerateReports,
    ViewDashboard,
    ManageUsers,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::ViewProducts,
        Operation::ManageProducts,
        Operation::CreateOrder,
        Operation::ViewOwnOrders,
        Operation::CancelOwnOrder,
        Operation::ViewAllOrders,
        Operation::UpdateOrderStatus,
        Operation::ViewReports,
        Operation::GenerateReports,
        Operation::ViewDashboard,
        Operation::ManageUsers,
    ];
}

/// Outcome of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allowed)
    }
}

const ADMIN_CAPABILITIES: &[Operation] = &[
    Operation::ViewProducts,
    Operation::ManageProducts,
    Operation::CreateOrder,
    Operation::ViewOwnOrders,
    Operation::ViewAllOrders,
    Operation::UpdateOrderStatus,
    Operation::ViewReports,
    Operation::GenerateReports,
    Operation::ViewDashboard,
    Operation::ManageUsers,
];

const EMPLOYEE_CAPABILITIES: &[Operation] = &[
    Operation::ViewProducts,
    Operation::CreateOrder,
    Operation::ViewOwnOrders,
    Operation::CancelOwnOrder,
];

/// Operations granted to a role
pub fn capabilities(role: Role) -> &'static [Operation] {
    match role {
        Role::Admin => ADMIN_CAPABILITIES,
        Role::Employee => EMPLOYEE_CAPABILITIES,
    }
}

/// Decide whether `role` may perform `operation`
pub fn authorize(role: Role, operation: Operation) -> Access {
    if capabilities(role).contains(&operation) {
        Access::Allowed
    } else {
        Access::Denied
    }
}

/// The authenticated caller of a ledger operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn can(&self, operation: Operation) -> bool {
        authorize(self.role, operation).is_allowed()
    }
}
