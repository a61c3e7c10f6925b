//! `docqa-server` exposes the `docqa-rag` pipeline over HTTP.
//!
//! A client uploads one PDF, image, or text file to `/upload`, then asks questions about it on
//! `/ask`. Each new upload replaces the previous document.

pub mod backend;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::{AppState, app_router, run_server};
