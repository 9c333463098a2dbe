//! HTTP request handlers

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod order;
pub mod product;
pub mod report;

pub use auth::*;
pub use dashboard::*;
pub use health::*;
pub use order::*;
pub use product::*;
pub use report::*;
