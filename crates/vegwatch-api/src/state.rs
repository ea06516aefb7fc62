use std::sync::Arc;
use vegwatch_core::ports::ImageryBackend;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ImageryBackend>,
}

impl AppState {
    pub fn new(backend: Arc<dyn ImageryBackend>) -> Self {
        Self { backend }
    }
}
