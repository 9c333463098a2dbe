//! Domain models for the warehouse ledger

mod order;
mod product;
mod report;
mod user;

pub use order::*;
pub use product::*;
pub use report::*;
pub use user::*;
