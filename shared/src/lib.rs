//! Shared types and domain logic for the warehouse ledger
//!
//! This crate holds everything that does not need a database: the models,
//! the stock transition function, sales aggregation, the access policy and
//! input validation. The backend wires these to PostgreSQL and HTTP.

pub mod access;
pub mod models;
pub mod reporting;
pub mod stock;
pub mod types;
pub mod validation;

pub use access::*;
pub use models::*;
pub use reporting::*;
pub use stock::*;
pub use types::*;
pub use validation::*;
