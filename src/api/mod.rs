//! HTTP gateway in front of the Gemini API.
//!
//! The browser client never sees the credential: it posts prompts (or a whole
//! intake) here, and the server makes the upstream call. Routes are nested
//! under `/api/`. Every response is JSON and carries `cache-control: no-store`.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::gateway_router;
pub use server::{start_gateway_server_on, GatewayServer, ServerError};
pub use types::ApiContext;
