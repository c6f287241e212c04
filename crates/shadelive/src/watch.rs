use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use renderer::{DocumentId, LiveProxy};

/// Re-evaluates a shader file whenever it settles after a write.
///
/// Dropping the watcher stops the notify backend, which closes the channel
/// and lets the worker thread finish.
pub struct ShaderWatcher {
    _watcher: RecommendedWatcher,
    _worker: JoinHandle<()>,
}

impl ShaderWatcher {
    pub fn spawn(
        path: &Path,
        document: DocumentId,
        debounce: Duration,
        proxy: LiveProxy,
    ) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        let dir = path
            .parent()
            .ok_or_else(|| anyhow!("{} has no parent directory", path.display()))?
            .to_path_buf();
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("{} has no file name", path.display()))?
            .to_os_string();

        let (tx, rx) = unbounded::<()>();
        // Editors often replace the file instead of writing in place, so the
        // directory is watched and events are matched by name.
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if touches(&event, &file_name) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "file watch error"),
        })
        .context("failed to create file watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;

        let worker = thread::Builder::new()
            .name("shadelive-watch".into())
            .spawn(move || reload_loop(path, document, rx, debounce, proxy))
            .context("failed to spawn watch thread")?;

        tracing::info!(dir = %dir.display(), "watching for shader changes");
        Ok(Self {
            _watcher: watcher,
            _worker: worker,
        })
    }
}

fn touches(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name.as_os_str()))
}

fn reload_loop(
    path: PathBuf,
    document: DocumentId,
    rx: Receiver<()>,
    debounce: Duration,
    proxy: LiveProxy,
) {
    while rx.recv().is_ok() {
        if !settle(&rx, debounce) {
            break;
        }
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to read shader");
                continue;
            }
        };
        tracing::debug!(path = %path.display(), "shader changed; reloading");
        if proxy.eval(source, document.clone()).is_err() {
            break;
        }
    }
    tracing::debug!("watch worker finished");
}

/// Swallows events until the channel stays quiet for `quiet`.
///
/// Returns `false` once every sender is gone.
fn settle(rx: &Receiver<()>, quiet: Duration) -> bool {
    loop {
        match rx.recv_timeout(quiet) {
            Ok(()) => continue,
            Err(RecvTimeoutError::Timeout) => return true,
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    use super::*;

    #[test]
    fn settle_drains_bursts() {
        let (tx, rx) = unbounded();
        for _ in 0..5 {
            tx.send(()).unwrap();
        }
        let started = Instant::now();
        assert!(settle(&rx, Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert!(rx.is_empty());
    }

    #[test]
    fn settle_stops_when_senders_drop() {
        let (tx, rx) = unbounded::<()>();
        tx.send(()).unwrap();
        drop(tx);
        assert!(!settle(&rx, Duration::from_secs(5)));
    }

    #[test]
    fn matches_only_the_watched_file() {
        let name = OsString::from("demo.glsl");
        let modify = Event::new(EventKind::Modify(ModifyKind::Any)).add_path("/tmp/demo.glsl".into());
        let create = Event::new(EventKind::Create(CreateKind::File)).add_path("/tmp/demo.glsl".into());
        let other = Event::new(EventKind::Modify(ModifyKind::Any)).add_path("/tmp/other.glsl".into());
        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path("/tmp/demo.glsl".into());

        assert!(touches(&modify, &name));
        assert!(touches(&create, &name));
        assert!(!touches(&other, &name));
        assert!(!touches(&removed, &name));
    }
}
