//! Agora daemon
//!
//! Serves the legislature over JSON/HTTP under `/api/v1`: agent registration
//! and verification, bills and ballots, deliberation, parties and the gazette.
//! Scheduled work (window evaluation, activity decay) is exposed as
//! maintenance endpoints for an external scheduler to call.

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use api::create_router;
pub use api::rest::state::AppState;
pub use config::DaemonConfig;
pub use error::{ApiError, ApiResult, DaemonError, DaemonResult};
pub use server::Server;
