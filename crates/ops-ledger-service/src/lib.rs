//! HTTP API service for the ops credit ledger.
//!
//! Exposes the operator-facing surface of the credit ledger subsystem:
//! balance mutations (addition, refund), audit search, and the
//! reconstructed per-event balance ledger. Usage ingestion is a separate,
//! service-authenticated surface standing in for the external consumption
//! system.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
