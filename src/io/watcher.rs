use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Events sent from the file watcher to the watch loop.
#[derive(Debug)]
pub enum FileEvent {
    /// One or more payload files changed on disk.
    Changed(Vec<PathBuf>),
}

/// Watches a payload directory for changed `.json` files.
pub struct PayloadWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<FileEvent>,
}

impl PayloadWatcher {
    /// Start watching `dir` (non-recursive).
    pub fn start(dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let dir_owned = dir.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(_) => return,
                };

                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) => {}
                    _ => return,
                }

                let relevant: Vec<PathBuf> = event
                    .paths
                    .into_iter()
                    .filter(|p| p.starts_with(&dir_owned) && is_payload_file(p))
                    .collect();

                if !relevant.is_empty() {
                    let _ = tx.send(FileEvent::Changed(relevant));
                }
            },
            Config::default(),
        )?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(PayloadWatcher { _watcher: watcher, rx })
    }

    /// Block up to `timeout` for the next event, then drain whatever else
    /// is queued. Empty on timeout.
    pub fn wait(&self, timeout: Duration) -> Vec<FileEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(first) => {
                let mut events = vec![first];
                events.extend(self.rx.try_iter());
                events
            }
            Err(_) => Vec::new(),
        }
    }
}

/// `.json` files, skipping editor temp files like `.sync.json.swp`
pub fn is_payload_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'));
    !hidden && path.extension().and_then(|e| e.to_str()) == Some("json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_visible_json_files_count() {
        assert!(is_payload_file(Path::new("/tmp/feed/sync.json")));
        assert!(is_payload_file(Path::new("completed.json")));
        assert!(!is_payload_file(Path::new("/tmp/feed/.sync.json")));
        assert!(!is_payload_file(Path::new("/tmp/feed/sync.json.swp")));
        assert!(!is_payload_file(Path::new("/tmp/feed/notes.md")));
    }
}
