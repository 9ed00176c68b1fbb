//! Server-side rendering harness.
//!
//! Loads a static HTML document into an isolated, script-executing DOM
//! environment, lets the page's own client-side code run to completion
//! (with its outbound requests routed back through the origin server),
//! then serializes the resulting document together with an HTTP status
//! code. In development mode a websocket live-reload channel tells
//! connected pages to refresh whenever files next to the HTML source
//! change on disk.
//!
//! The DOM environment itself is pluggable: implement [`DomEngine`] over
//! whatever browser-emulation layer the application embeds, and the
//! coordinator drives it.
//!
//! ```ignore
//! use std::sync::Arc;
//! use ssr_resource::{configure, SsrConfig};
//!
//! let render = configure(
//!     SsrConfig::new("https://example.com", "app", "www/index.html"),
//!     Arc::new(MyDomEngine::new()),
//! )?;
//! let page = render.render_page("/").await?;
//! assert_eq!(page.status_code, 200);
//! ```

pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod reload;
pub mod render;
pub mod resolve;

pub use config::{configure, SsrConfig};
pub use engine::{DomDocument, DomEngine, FinishSignal, PageBindings, PageFetch, StatusCell};
pub use error::{ConfigError, EngineError, FetchError, LiveReloadError, RenderError};
pub use reload::{LiveReloadState, SharedServer};
pub use render::{PageRenderer, RenderedPage};
