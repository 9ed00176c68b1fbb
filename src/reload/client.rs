//! Client script injected into rendered pages during development.
//!
//! The script opens a websocket to the live-reload channel and reloads
//! the page on the literal `reload` message. It reconnects immediately
//! whenever the socket closes, and degrades to a console error on
//! browsers without websocket support.

/// Live-reload client template. `__PORT__` and `__RESOURCE_NAME__` are
/// substituted at injection time.
pub const RELOAD_CLIENT_TEMPLATE: &str = r#"if ('WebSocket' in window) {
    function startSocket() {
        var socket = new WebSocket('ws://localhost:__PORT__/__RESOURCE_NAME__');
        socket.onclose = function () {
            console.log('Socket closed');
            startSocket();
        };
        socket.onmessage = function (msg) {
            if (msg.data == 'reload') window.location.reload();
        };
        console.log('Live reload enabled.');
    }
    startSocket();
} else {
    console.error('This browser does not support WebSocket, live reload is disabled.');
}
"#;

/// Render the client script for a channel port and mount path. A leading
/// `/` on the resource name is stripped before substitution.
pub fn render_script(port: u16, resource_name: &str) -> String {
    let name = resource_name.strip_prefix('/').unwrap_or(resource_name);
    RELOAD_CLIENT_TEMPLATE
        .replace("__PORT__", &port.to_string())
        .replace("__RESOURCE_NAME__", name)
}
