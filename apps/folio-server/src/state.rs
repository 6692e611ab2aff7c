//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::engine::{ImageEncoder, RenderEngine};
use crate::render::PageRenderer;
use crate::session::GlobalState;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    session: GlobalState,
    renderer: PageRenderer,
}

impl AppState {
    /// Create the application state around one session registry
    pub fn new(
        config: Config,
        engine: Arc<dyn RenderEngine>,
        encoder: Arc<dyn ImageEncoder>,
    ) -> Self {
        let session = GlobalState::new(engine, config.session());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                session,
                renderer: PageRenderer::new(encoder),
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the session registry
    pub fn session(&self) -> &GlobalState {
        &self.inner.session
    }

    /// Get the page renderer
    pub fn renderer(&self) -> &PageRenderer {
        &self.inner.renderer
    }
}
