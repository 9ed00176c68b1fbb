//! Boundary with the embedded browser-emulation engine.
//!
//! This crate never constructs DOM trees or executes JavaScript itself;
//! an engine implementing [`DomEngine`] owns those semantics. The render
//! coordinator hands the engine a [`PageBindings`] describing the globals
//! the loaded page must see:
//! - an outbound-fetch override routed back through the origin server
//! - a one-shot completion signal
//! - an SSR-context marker
//! - a mutable status-code cell

use std::path::Path;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use tokio::sync::oneshot;
use url::Url;

use crate::error::{EngineError, FetchError};
use crate::resolve::UrlResolver;

/// Factory for isolated, script-executing DOM environments.
///
/// `load` must create a fresh, disposable document context from the HTML
/// file, expose the bindings to the page's own script, and start script
/// execution before returning. Concurrent loads must not share state.
#[async_trait]
pub trait DomEngine: Send + Sync {
    async fn load(
        &self,
        html_file: &Path,
        bindings: PageBindings,
    ) -> Result<Box<dyn DomDocument>, EngineError>;
}

/// A loaded document, alive until its render session drops it.
pub trait DomDocument: Send {
    /// Append an inline `<script>` element at the end of the document body.
    fn append_body_script(&mut self, source: &str);

    /// Serialize the full document to an HTML string.
    fn serialize(&self) -> String;
}

/// The globals a rendered page sees while executing server-side.
pub struct PageBindings {
    /// Resolved absolute URL acting as the page's location.
    pub url: Url,
    /// Outbound-request override; see [`PageFetch`].
    pub fetch: PageFetch,
    /// Completion signal the page fires when its content is ready.
    pub finish: FinishSignal,
    /// Marks the context as server-side. Always true here.
    pub ssr: bool,
    /// Status code the page may overwrite before finishing.
    pub status: StatusCell,
}

/// Outbound fetch handle given to the rendered page.
///
/// Every URL the page requests is re-resolved against the origin server
/// before the real network call, so relative paths never resolve against
/// the DOM environment's synthetic location. Network failures pass
/// through to the page untouched; there are no retries.
#[derive(Clone)]
pub struct PageFetch {
    resolver: Arc<UrlResolver>,
    client: reqwest::Client,
}

impl PageFetch {
    pub(crate) fn new(resolver: Arc<UrlResolver>, client: reqwest::Client) -> Self {
        Self { resolver, client }
    }

    /// Resolve `url` against the origin and issue a GET request.
    pub async fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        let target = self.resolve(url)?;
        Ok(self.client.get(target).send().await?)
    }

    /// Resolve `url` against the origin and build a request for any
    /// method, for engines exposing the full fetch options surface.
    pub fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, FetchError> {
        let target = self.resolve(url)?;
        Ok(self.client.request(method, target))
    }

    fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        // Page fetches resolve at the origin root, not under the mount path.
        self.resolver
            .resolve(url, "")
            .map_err(|source| FetchError::Url {
                url: url.to_string(),
                source,
            })
    }
}

/// One-shot completion signal.
///
/// Cloneable so an engine can expose it through any number of
/// page-visible callbacks; only the first `finish` is observed, the rest
/// are no-ops.
#[derive(Clone)]
pub struct FinishSignal {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl FinishSignal {
    /// Create the signal and the receiving half the coordinator awaits.
    pub(crate) fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Fire the signal. Safe to call any number of times.
    pub fn finish(&self) {
        let sender = match self.tx.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
    }

    /// Whether the signal already fired.
    pub fn is_finished(&self) -> bool {
        self.tx.lock().map(|slot| slot.is_none()).unwrap_or(true)
    }
}

/// Status code cell shared between the rendered page and the coordinator.
///
/// The page's script is the only writer; the coordinator reads it once,
/// after the completion signal fires.
#[derive(Clone, Debug)]
pub struct StatusCell {
    value: Arc<AtomicU16>,
}

impl StatusCell {
    pub(crate) fn new(initial: u16) -> Self {
        Self {
            value: Arc::new(AtomicU16::new(initial)),
        }
    }

    pub fn set(&self, code: u16) {
        self.value.store(code, Ordering::Relaxed);
    }

    pub fn get(&self) -> u16 {
        self.value.load(Ordering::Relaxed)
    }
}
