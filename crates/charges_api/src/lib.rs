//! Charges API - HTTP prediction service
//!
//! Serves `POST /predict` over a pipeline artifact loaded once at startup,
//! plus `/health`, `/version` and a static landing page.

pub mod config;
pub mod server;

pub use config::ApiConfig;
pub use server::{build_router, load_artifact, start_server, AppState, ModelInfo};
