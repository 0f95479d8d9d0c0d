//! Lex Server - HTTP boundary for the document pipeline
//!
//! `POST /sequential-thinking` runs one generation request through every
//! stage and answers with the aggregate response. `GET /healthz` answers
//! `ok`.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod api;
pub mod config;

pub use api::{router, AppState, ErrorResponse};
pub use config::ServerConfig;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
