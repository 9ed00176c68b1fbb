//! Render coordination: one isolated DOM session per call, raced against
//! the configured timeout.

use std::sync::Arc;

use serde::Serialize;

use crate::config::SsrConfig;
use crate::consts::{DEFAULT_STATUS_CODE, TIMEOUT_DIAGNOSTIC, TIMEOUT_STATUS_CODE};
use crate::engine::{DomEngine, FinishSignal, PageBindings, PageFetch, StatusCell};
use crate::error::RenderError;
use crate::reload::{self, LiveReloadState};
use crate::resolve::UrlResolver;

/// A rendered document and the status code its script chose.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    /// Serialized HTML, or the timeout diagnostic.
    pub html: String,
    /// 200 unless the page overwrote it; 500 on timeout.
    pub status_code: u16,
}

/// Render handle for one configured SSR resource.
///
/// Cheap to clone; every `render_page` call drives a fully independent
/// session. Concurrent sessions share only the configuration and the
/// live-reload port cell.
#[derive(Clone)]
pub struct PageRenderer {
    inner: Arc<RendererInner>,
}

struct RendererInner {
    config: SsrConfig,
    engine: Arc<dyn DomEngine>,
    resolver: Arc<UrlResolver>,
    client: reqwest::Client,
    reload: Arc<LiveReloadState>,
}

impl PageRenderer {
    pub(crate) fn new(
        config: SsrConfig,
        engine: Arc<dyn DomEngine>,
        resolver: Arc<UrlResolver>,
        reload: Arc<LiveReloadState>,
    ) -> Self {
        Self {
            inner: Arc::new(RendererInner {
                config,
                engine,
                resolver,
                // One pooled client per configuration; sessions share it.
                client: reqwest::Client::new(),
                reload,
            }),
        }
    }

    /// Current live-reload channel port. 0 until the channel is up, or
    /// forever if it failed to start.
    pub fn live_reload_port(&self) -> u16 {
        self.inner.reload.port()
    }

    /// Render one page; `"/"` renders the resource root.
    ///
    /// Settles within `waiting_time` plus negligible overhead for any
    /// pathname: either the page fires its completion signal first and
    /// the serialized document is returned with the page's status code,
    /// or the timeout fires first and a diagnostic result with status 500
    /// is returned. Only URL-join and DOM-construction failures produce
    /// an `Err`.
    pub async fn render_page(&self, pathname: &str) -> Result<RenderedPage, RenderError> {
        let inner = &self.inner;
        let url = inner
            .resolver
            .resolve(pathname, &inner.config.resource_name)
            .map_err(|source| RenderError::Resolve {
                pathname: pathname.to_string(),
                source,
            })?;

        let (finish, finished) = FinishSignal::new();
        let status = StatusCell::new(DEFAULT_STATUS_CODE);
        let bindings = PageBindings {
            url,
            fetch: PageFetch::new(inner.resolver.clone(), inner.client.clone()),
            finish,
            ssr: true,
            status: status.clone(),
        };

        let mut dom = inner
            .engine
            .load(&inner.config.html_file, bindings)
            .await
            .map_err(|source| RenderError::Engine {
                file: inner.config.html_file.clone(),
                source,
            })?;

        if inner.config.development {
            let script = reload::render_script(inner.reload.port(), &inner.config.resource_name);
            dom.append_body_script(&script);
        }

        // Exactly one side of the race settles the session. The loser is
        // abandoned, not cancelled: page scripts and pending fetches keep
        // running until the session is dropped.
        let finished = async move {
            if finished.await.is_err() {
                // Every signal handle was dropped without firing; only the
                // timeout can settle this session now.
                std::future::pending::<()>().await;
            }
        };
        let timed_out = tokio::select! {
            _ = tokio::time::sleep(inner.config.waiting_time) => true,
            _ = finished => false,
        };

        if timed_out {
            return Ok(RenderedPage {
                html: TIMEOUT_DIAGNOSTIC.to_string(),
                status_code: TIMEOUT_STATUS_CODE,
            });
        }
        Ok(RenderedPage {
            html: dom.serialize(),
            status_code: status.get(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::config::{configure, SsrConfig};
    use crate::engine::DomDocument;
    use crate::error::EngineError;

    /// Document fake: serialized output is the loaded HTML plus any
    /// appended inline scripts.
    struct FakeDocument {
        html: String,
        scripts: Vec<String>,
    }

    impl DomDocument for FakeDocument {
        fn append_body_script(&mut self, source: &str) {
            self.scripts.push(source.to_string());
        }

        fn serialize(&self) -> String {
            let mut out = self.html.clone();
            for script in &self.scripts {
                out.push_str("<script>");
                out.push_str(script);
                out.push_str("</script>");
            }
            out
        }
    }

    /// Engine fake: reads the HTML file, then runs the given closure in
    /// place of the page's own script.
    struct ScriptedEngine<F>
    where
        F: Fn(&PageBindings) + Send + Sync,
    {
        page_script: F,
    }

    #[async_trait]
    impl<F> DomEngine for ScriptedEngine<F>
    where
        F: Fn(&PageBindings) + Send + Sync,
    {
        async fn load(
            &self,
            html_file: &Path,
            bindings: PageBindings,
        ) -> Result<Box<dyn DomDocument>, EngineError> {
            let html = std::fs::read_to_string(html_file)?;
            (self.page_script)(&bindings);
            Ok(Box::new(FakeDocument {
                html,
                scripts: Vec::new(),
            }))
        }
    }

    fn html_fixture(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.html");
        std::fs::write(&file, content).unwrap();
        (dir, file)
    }

    fn production_config(html_file: &Path, waiting_time: Duration) -> SsrConfig {
        let mut config = SsrConfig::new("https://example.com", "app", html_file);
        config.development = false;
        config.waiting_time = waiting_time;
        config
    }

    fn renderer<F>(config: SsrConfig, page_script: F) -> PageRenderer
    where
        F: Fn(&PageBindings) + Send + Sync + 'static,
    {
        configure(config, Arc::new(ScriptedEngine { page_script })).unwrap()
    }

    #[tokio::test]
    async fn test_completed_page_serializes_with_default_status() {
        let (_dir, file) = html_fixture("<html><body>hello</body></html>");
        let render = renderer(
            production_config(&file, Duration::from_secs(2)),
            |bindings| bindings.finish.finish(),
        );

        let page = render.render_page("/").await.unwrap();
        assert_eq!(page.html, "<html><body>hello</body></html>");
        assert_eq!(page.status_code, 200);
    }

    #[tokio::test]
    async fn test_page_written_status_code_is_reported() {
        let (_dir, file) = html_fixture("<html><body>missing</body></html>");
        let render = renderer(
            production_config(&file, Duration::from_millis(100)),
            |bindings| {
                bindings.status.set(404);
                bindings.finish.finish();
            },
        );

        let started = Instant::now();
        let page = render.render_page("/").await.unwrap();
        assert_eq!(page.status_code, 404);
        assert_eq!(page.html, "<html><body>missing</body></html>");
        // Completion settles the race well under the timeout.
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_silent_page_times_out_with_diagnostic() {
        let (_dir, file) = html_fixture("<html><body></body></html>");
        let render = renderer(
            production_config(&file, Duration::from_millis(100)),
            |_bindings| {},
        );

        let started = Instant::now();
        let page = render.render_page("/").await.unwrap();
        let elapsed = started.elapsed();
        assert_eq!(page.status_code, 500);
        assert_eq!(page.html, TIMEOUT_DIAGNOSTIC);
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_double_finish_equals_single_finish() {
        let (_dir, file) = html_fixture("<html><body>once</body></html>");
        let render = renderer(
            production_config(&file, Duration::from_secs(2)),
            |bindings| {
                bindings.finish.finish();
                bindings.finish.finish();
                bindings.finish.finish();
            },
        );

        let page = render.render_page("/").await.unwrap();
        assert_eq!(page.status_code, 200);
        assert_eq!(page.html, "<html><body>once</body></html>");
    }

    #[tokio::test]
    async fn test_late_finish_from_background_script_wins_race() {
        let (_dir, file) = html_fixture("<html><body>async</body></html>");
        let render = renderer(
            production_config(&file, Duration::from_secs(5)),
            |bindings| {
                let finish = bindings.finish.clone();
                let status = bindings.status.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    status.set(201);
                    finish.finish();
                });
            },
        );

        let started = Instant::now();
        let page = render.render_page("/").await.unwrap();
        assert_eq!(page.status_code, 201);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unreadable_html_file_rejects_the_call() {
        let render = renderer(
            production_config(Path::new("/nonexistent/page.html"), Duration::from_secs(1)),
            |_bindings| {},
        );

        let result = render.render_page("/").await;
        assert!(matches!(result, Err(RenderError::Engine { .. })));
    }

    #[tokio::test]
    async fn test_location_resolves_under_mount_path() {
        let (_dir, file) = html_fixture("<html></html>");
        let render = renderer(
            production_config(&file, Duration::from_secs(1)),
            |bindings| {
                assert_eq!(bindings.url.as_str(), "https://example.com/app/page");
                assert!(bindings.ssr);
                bindings.finish.finish();
            },
        );

        render.render_page("/page").await.unwrap();
    }

    #[tokio::test]
    async fn test_development_mode_appends_reload_client() {
        let (_dir, file) = html_fixture("<html><body></body></html>");
        let mut config = SsrConfig::new("https://example.com", "app", &file);
        config.waiting_time = Duration::from_secs(2);
        let render = renderer(config, |bindings| bindings.finish.finish());

        let page = render.render_page("/").await.unwrap();
        assert!(page.html.contains("<script>"));
        assert!(page.html.contains("/app'"));
        assert!(!page.html.contains("__PORT__"));
    }

    #[tokio::test]
    async fn test_rendered_page_serializes_with_wire_field_names() {
        let page = RenderedPage {
            html: "<html></html>".to_string(),
            status_code: 200,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["html"], "<html></html>");
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let (_dir, file) = html_fixture("<html><body>n</body></html>");
        let render = renderer(
            production_config(&file, Duration::from_secs(2)),
            |bindings| {
                bindings.status.set(203);
                bindings.finish.finish();
            },
        );

        let (a, b) = tokio::join!(render.render_page("/a"), render.render_page("/b"));
        assert_eq!(a.unwrap().status_code, 203);
        assert_eq!(b.unwrap().status_code, 203);
    }
}
