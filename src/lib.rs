pub mod auth;
pub mod config;
pub mod db;
pub mod deck;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;

pub use config::Config;

use auth::TokenVerifier;
use db::ReportingStore;
use pipeline::ReportOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReportingStore>,
    pub orchestrator: ReportOrchestrator,
    pub tokens: TokenVerifier,
}
