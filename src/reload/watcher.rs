//! Directory watching bridged into the async world.

use std::path::Path;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::consts::WATCH_EVENT_CHANNEL_CAPACITY;

/// Attach a recursive watcher on `dir`.
///
/// Each change-shaped event pushes a unit into the returned channel.
/// Bursts coalesce: a full channel drops the event, since one queued
/// reload already covers the burst. Dropping the returned watcher
/// detaches the watch.
pub fn watch_dir(dir: &Path) -> Result<(RecommendedWatcher, mpsc::Receiver<()>), notify::Error> {
    let (tx, rx) = mpsc::channel(WATCH_EVENT_CHANNEL_CAPACITY);
    let mut watcher =
        notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) if is_change(&event) => {
                let _ = tx.try_send(());
            }
            Ok(_) => {}
            Err(e) => eprintln!("[live-reload] watch error: {}", e),
        })?;
    watcher.watch(dir, RecursiveMode::Recursive)?;
    Ok((watcher, rx))
}

fn is_change(event: &Event) -> bool {
    event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove()
}
