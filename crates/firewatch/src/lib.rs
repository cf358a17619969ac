//! Firewatch gateway.
//!
//! Relays live firewall traffic events to dashboard clients over
//! WebSocket and proxies rule management and traffic statistics to the
//! firewall engine over REST.

pub mod auth;
pub mod error;
pub mod protocol;
pub mod routes;
pub mod server;
pub mod session;
pub mod ws;

pub use auth::SessionGate;
pub use error::GatewayError;
pub use server::{AppState, ServerConfig, ServerHandle, build_router, start};
pub use session::SessionManager;
