use crate::{backend::HttpBackend, infra::config::AppConfig};

#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub backend: HttpBackend,
}

impl AppContext {
    pub fn new(config: AppConfig, backend: HttpBackend) -> Self {
        Self { config, backend }
    }
}
