//! # Domain Layer

pub mod config;
pub mod errors;
pub mod request;

pub use config::GatewayConfig;
pub use errors::GatewayError;
pub use request::{GatewayOutcome, GatewayRequest, Reply};
