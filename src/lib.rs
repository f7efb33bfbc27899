// Library exports for testing and external use

pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<utils::config::AppConfig>,
    pub storage: Arc<services::file_storage::FileStorageService>,
    pub transform: Arc<services::transform::TransformService>,
}
