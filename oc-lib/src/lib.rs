/// Offchain gateway - Shared Library
///
/// Request signing and verification, the endpoint authentication policy,
/// and configuration shared by the `oc` CLI and the `oc-server` daemon.
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod httpsig;
pub mod secret;
pub mod types;

pub use auth::{AuthError, Authenticator, BearerToken, Credential, RouteClass};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ServerConfig;
pub use error::{OcError, Result};
pub use secret::{DefaultSecretResolver, SecretResolver};
