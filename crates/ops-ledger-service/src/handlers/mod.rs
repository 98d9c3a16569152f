//! HTTP request handlers.

pub mod audit;
pub mod credits;
pub mod health;
pub mod ledger;
pub mod tenants;
pub mod usage;
