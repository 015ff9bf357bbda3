//! Offchain gateway server
//!
//! An HTTP gateway that authenticates callers (bearer token or Ed25519
//! request signature) before forwarding account operations to an exchange
//! backend.

pub mod api;
pub mod error;
pub mod exchange;

pub use api::{create_router, ApiState};
pub use error::ApiError;
pub use exchange::{Account, ExchangeBackend, ExchangeRegistry, Operation};
