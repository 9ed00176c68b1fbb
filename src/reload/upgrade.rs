//! Path-routed websocket upgrades on a caller-owned listener.
//!
//! When the embedding application already runs its own HTTP listener, the
//! live-reload channel does not bind a port of its own. Instead the
//! application wraps its listener in a [`SharedServer`] and forwards every
//! incoming request through [`SharedServer::handle_upgrade`] before its
//! normal routing; registered upgrade routes claim matching websocket
//! handshakes and everything else stays with the application.

use std::sync::{Arc, RwLock};

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONNECTION};
use hyper::{Request, Response, StatusCode};
use hyper_tungstenite::HyperWebsocket;

type UpgradeCallback = Box<dyn Fn(HyperWebsocket) + Send + Sync>;

struct UpgradeRoute {
    path: String,
    on_upgrade: UpgradeCallback,
}

/// Handle to an externally owned HTTP listener that upgrade consumers
/// register websocket routes on.
///
/// Registration is append-only: a route, once registered, is never
/// removed or replaced by later registrations, so several consumers can
/// share one listener without interfering.
#[derive(Clone)]
pub struct SharedServer {
    port: u16,
    routes: Arc<RwLock<Vec<UpgradeRoute>>>,
}

impl SharedServer {
    /// Wrap an already-bound listener port.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            routes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// The port the wrapped listener is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Register an upgrade handler for an exact request path. The leading
    /// separator is normalized, so `app` and `/app` register the same
    /// path. The callback receives the pending websocket after a
    /// successful handshake.
    pub fn register_upgrade<F>(&self, path: &str, on_upgrade: F)
    where
        F: Fn(HyperWebsocket) + Send + Sync + 'static,
    {
        let route = UpgradeRoute {
            path: normalize_path(path),
            on_upgrade: Box::new(on_upgrade),
        };
        if let Ok(mut routes) = self.routes.write() {
            routes.push(route);
        }
    }

    /// Dispatch one request.
    ///
    /// Returns `None` for requests that are not websocket upgrades; the
    /// caller keeps handling those itself. An upgrade request matching a
    /// registered path is handshaken and handed to its callback. An
    /// upgrade request matching nothing is answered with a
    /// close-connection rejection before any websocket handshake happens.
    pub fn handle_upgrade<B>(&self, req: &mut Request<B>) -> Option<Response<Full<Bytes>>> {
        if !hyper_tungstenite::is_upgrade_request(req) {
            return None;
        }
        let path = normalize_path(req.uri().path());
        let routes = match self.routes.read() {
            Ok(routes) => routes,
            Err(_) => return Some(reject()),
        };
        let route = match routes.iter().find(|r| r.path == path) {
            Some(route) => route,
            None => return Some(reject()),
        };
        match hyper_tungstenite::upgrade(req, None) {
            Ok((response, websocket)) => {
                (route.on_upgrade)(websocket);
                Some(response)
            }
            Err(e) => {
                eprintln!("[live-reload] websocket upgrade failed: {}", e);
                Some(reject())
            }
        }
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("/{}", path)
}

fn reject() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
    response
}
