//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::content::{ContentError, ContentStore};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend client: {0}")]
    Backend(#[from] BackendError),
    #[error("content: {0}")]
    Content(#[from] ContentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    content: ContentStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Builds the backend client and loads markdown pages from
    /// `config.content_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built or the content
    /// directory cannot be read.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let backend = BackendClient::new(&config.backend)?;
        let content = ContentStore::load(&config.content_dir)?;
        tracing::info!(pages = content.len(), "Content loaded");

        Ok(Self::from_parts(config, backend, content))
    }

    /// Assemble state from already-built parts.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        backend: BackendClient,
        content: ContentStore,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                content,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the loaded content pages.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }
}
