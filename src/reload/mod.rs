//! Live-reload notification channel.
//!
//! A background websocket broadcast service for development mode:
//! browsers connect, each accepted connection attaches its own recursive
//! watcher on the directory containing the rendered HTML file, and every
//! detected change pushes the literal text frame `reload` to that
//! connection.
//!
//! The channel is started at most once per configuration, in the
//! background. A channel that fails to start is logged and left dead;
//! it must never block or fail a render.

mod client;
mod upgrade;
mod watcher;

pub use client::{render_script, RELOAD_CLIENT_TEMPLATE};
pub use upgrade::SharedServer;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::WebSocketStream;
use tungstenite::Message;
use uuid::Uuid;

use crate::error::LiveReloadError;

/// Channel state shared with the render sessions of one configuration.
///
/// The port starts at 0 and is stored exactly once by the background
/// start task; render sessions only ever read it. Two configurations
/// never share a state.
#[derive(Debug, Default)]
pub struct LiveReloadState {
    port: AtomicU16,
    clients: Mutex<HashSet<Uuid>>,
}

impl LiveReloadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port the channel listens on. 0 while starting, and forever after a
    /// failed start; the injected client script then points at port 0 and
    /// simply fails to connect.
    pub fn port(&self) -> u16 {
        self.port.load(Ordering::Acquire)
    }

    pub(crate) fn set_port(&self, port: u16) {
        self.port.store(port, Ordering::Release);
    }

    /// Number of currently connected live-reload clients.
    pub fn client_count(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn add_client(&self, id: Uuid) {
        if let Ok(mut clients) = self.clients.lock() {
            clients.insert(id);
        }
    }

    fn remove_client(&self, id: &Uuid) {
        if let Ok(mut clients) = self.clients.lock() {
            clients.remove(id);
        }
    }
}

/// Start the channel for one configuration and resolve its port.
///
/// The watched root is the directory containing the HTML source file,
/// recursive. With an external [`SharedServer`] the channel binds no port
/// of its own: it registers an upgrade route for the mount path (exact
/// match, leading separator normalized) and resolves the server's
/// already-bound port. Without one it binds a private listener on an
/// ephemeral port and accepts every handshake on it.
pub async fn start(
    state: Arc<LiveReloadState>,
    html_file: &Path,
    resource_name: &str,
    external: Option<SharedServer>,
) -> Result<u16, LiveReloadError> {
    let dir = html_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    // Surface an unwatchable root at startup instead of per connection.
    std::fs::metadata(&dir).map_err(|source| LiveReloadError::WatchRoot {
        dir: dir.clone(),
        source,
    })?;
    let dir = Arc::new(dir);

    match external {
        Some(server) => {
            let route_dir = dir.clone();
            let route_state = state.clone();
            server.register_upgrade(resource_name, move |websocket| {
                let dir = route_dir.clone();
                let state = route_state.clone();
                tokio::spawn(async move {
                    match websocket.await {
                        Ok(ws) => serve_client(ws, &dir, &state).await,
                        Err(e) => eprintln!("[live-reload] websocket handshake failed: {}", e),
                    }
                });
            });
            Ok(server.port())
        }
        None => {
            let listener = TcpListener::bind(("127.0.0.1", 0))
                .await
                .map_err(LiveReloadError::Bind)?;
            let port = listener
                .local_addr()
                .map_err(LiveReloadError::Bind)?
                .port();

            tokio::spawn(async move {
                loop {
                    let (stream, _) = match listener.accept().await {
                        Ok(conn) => conn,
                        Err(_) => continue,
                    };
                    let dir = dir.clone();
                    let state = state.clone();
                    tokio::spawn(async move {
                        match tokio_tungstenite::accept_async(stream).await {
                            Ok(ws) => serve_client(ws, &dir, &state).await,
                            Err(e) => eprintln!("[live-reload] websocket handshake failed: {}", e),
                        }
                    });
                }
            });
            Ok(port)
        }
    }
}

/// Serve one connected client until it disconnects.
///
/// Every connection gets its own watcher registration on the shared
/// watched root; there is no de-duplication across connections. The
/// watcher detaches when the connection task returns.
async fn serve_client<S>(ws: WebSocketStream<S>, dir: &Path, state: &LiveReloadState)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (_watcher, mut changes) = match watcher::watch_dir(dir) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("[live-reload] failed to watch {}: {}", dir.display(), e);
            return;
        }
    };

    let id = Uuid::new_v4();
    state.add_client(id);
    println!("[live-reload] client connected ({} active)", state.client_count());

    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Some(()) => {
                    if sink.send(Message::Text("reload".to_string())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = stream.next() => match incoming {
                // Clients send nothing the channel cares about.
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }

    state.remove_client(&id);
    println!("[live-reload] client disconnected ({} active)", state.client_count());
}
