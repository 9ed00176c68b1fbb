//! Session configuration and the public factory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::consts::DEFAULT_WAITING_TIME;
use crate::engine::DomEngine;
use crate::error::ConfigError;
use crate::reload::{self, LiveReloadState, SharedServer};
use crate::render::PageRenderer;
use crate::resolve::UrlResolver;

/// Configuration for one SSR resource. Immutable once handed to
/// [`configure`].
#[derive(Clone)]
pub struct SsrConfig {
    /// Origin server absolute URL; page URLs and the page's own outbound
    /// requests resolve against it.
    pub origin: String,
    /// URL path prefix the resource is mounted under.
    pub resource_name: String,
    /// HTML source file loaded into the DOM environment.
    pub html_file: PathBuf,
    /// Enables the live-reload channel and client script injection.
    pub development: bool,
    /// Externally owned listener for the live-reload upgrade endpoint.
    /// When absent the channel binds its own ephemeral listener.
    pub server: Option<SharedServer>,
    /// Maximum wait for the page's completion signal.
    pub waiting_time: Duration,
}

impl SsrConfig {
    /// Build a configuration with the defaults: development mode on, no
    /// shared server, 8 second waiting time.
    pub fn new(
        origin: impl Into<String>,
        resource_name: impl Into<String>,
        html_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            origin: origin.into(),
            resource_name: resource_name.into(),
            html_file: html_file.into(),
            development: true,
            server: None,
            waiting_time: DEFAULT_WAITING_TIME,
        }
    }
}

/// Configure one SSR resource and get its render handle.
///
/// Validates the origin and the required fields, then, in development
/// mode, fires off the live-reload channel start as a background task.
/// The task's resolved port lands in this configuration's
/// [`LiveReloadState`] for later reads by render sessions; a failed start
/// is logged to stderr and leaves the channel dead without affecting
/// rendering. Must be called from within a tokio runtime.
///
/// Each call produces a fully independent configuration with its own
/// live-reload channel; nothing is shared between two configurations.
pub fn configure(
    config: SsrConfig,
    engine: Arc<dyn DomEngine>,
) -> Result<PageRenderer, ConfigError> {
    if config.resource_name.is_empty() {
        return Err(ConfigError::EmptyResourceName);
    }
    if config.html_file.as_os_str().is_empty() {
        return Err(ConfigError::EmptyHtmlFile);
    }
    let resolver = Arc::new(UrlResolver::new(&config.origin)?);
    let reload_state = Arc::new(LiveReloadState::new());

    if config.development {
        let state = reload_state.clone();
        let html_file = config.html_file.clone();
        let resource_name = config.resource_name.clone();
        let server = config.server.clone();
        tokio::spawn(async move {
            match reload::start(state.clone(), &html_file, &resource_name, server).await {
                Ok(port) => {
                    state.set_port(port);
                    println!("[live-reload] channel listening on port {}", port);
                }
                Err(e) => eprintln!("[live-reload] channel failed to start: {}", e),
            }
        });
    }

    Ok(PageRenderer::new(config, engine, resolver, reload_state))
}
