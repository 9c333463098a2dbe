//! Business logic services for the warehouse ledger

pub mod auth;
pub mod dashboard;
pub mod order;
pub mod product;
pub mod reporting;

pub use auth::AuthService;
pub use dashboard::DashboardService;
pub use order::OrderService;
pub use product::ProductService;
pub use reporting::ReportingService;

use shared::{Actor, Operation};

use crate::error::{AppError, AppResult};

/// Check the access policy before a service call touches any state
pub(crate) fn ensure_allowed(actor: &Actor, operation: Operation) -> AppResult<()> {
    if actor.can(operation) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %actor.user_id,
            role = actor.role.as_str(),
            ?operation,
            "Operation denied by access policy"
        );
        Err(AppError::NotAuthorized)
    }
}
