//! Error types for configuration, rendering and the live-reload channel.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while validating a session configuration.
///
/// A malformed origin is rejected here, at configuration time; render
/// calls never re-validate it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid origin URL '{origin}': {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Origin URL '{0}' cannot serve as a base for page URLs")]
    OpaqueOrigin(String),

    #[error("Resource name must not be empty")]
    EmptyResourceName,

    #[error("HTML file path must not be empty")]
    EmptyHtmlFile,
}

/// Errors a render call can return.
///
/// A timed-out render is not an error: it resolves with status code 500
/// and a diagnostic body, so callers branch on the status code instead of
/// catching.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to build page URL for '{pathname}': {source}")]
    Resolve {
        pathname: String,
        #[source]
        source: url::ParseError,
    },

    #[error("DOM environment failed to load '{file}'")]
    Engine {
        file: PathBuf,
        #[source]
        source: EngineError,
    },
}

/// Failure reported by the embedded DOM engine while loading a page.
///
/// Engines are external; their failures reach the coordinator as an
/// opaque message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Error surfaced to the rendered page for a failed outbound request.
///
/// The coordinator never intercepts these; the page's own script decides
/// what a failed fetch means.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid request URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

/// Errors raised while starting the live-reload channel.
///
/// These never cross into the render path: a failed start is logged and
/// the channel is left non-functional for that configuration.
#[derive(Debug, Error)]
pub enum LiveReloadError {
    #[error("Failed to bind live-reload listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Watched directory '{dir}' is not accessible: {source}")]
    WatchRoot {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
