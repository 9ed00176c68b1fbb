/// Harness configuration constants
use std::time::Duration;

/// Default maximum wait for a page to signal render completion.
pub const DEFAULT_WAITING_TIME: Duration = Duration::from_millis(8000);

/// Status code reported when the completion signal never fires.
pub const TIMEOUT_STATUS_CODE: u16 = 500;

/// Status code a fresh render session starts with.
pub const DEFAULT_STATUS_CODE: u16 = 200;

/// Body returned with the timeout status code. The page most likely never
/// invoked its completion signal, or rendering is genuinely slow.
pub const TIMEOUT_DIAGNOSTIC: &str = "Maybe you forgot to run finishRender() in your \
     browser's JavaScript after your rendering is complete. Or SSR is very slow.";

/// Capacity of the per-connection file-change channel. A full channel
/// drops events; one queued reload per burst is enough.
pub const WATCH_EVENT_CHANNEL_CAPACITY: usize = 16;
