use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Watches the trends config file and sends a notification on every write.
///
/// # Example
/// ```no_run
/// # async fn demo() {
/// use trend_config::ConfigWatcher;
///
/// let (_, mut rx) = ConfigWatcher::spawn("/home/user/.config/better-trends/trends.toml");
/// while rx.recv().await.is_some() {
///     println!("config changed — reloading");
/// }
/// # }
/// ```
pub struct ConfigWatcher {
    path: PathBuf,
}

impl ConfigWatcher {
    /// Spawn a filesystem watcher for `path`.
    /// Returns the watcher handle and a receiver that fires on every detected change.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(path: impl AsRef<Path>) -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        let path = path.as_ref().to_path_buf();
        let watcher = Self { path: path.clone() };

        tokio::spawn(watch_loop(path, tx));

        (watcher, rx)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn watch_loop(path: PathBuf, tx: mpsc::Sender<()>) {
    use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
    use std::time::Duration;

    let (sync_tx, mut sync_rx) = mpsc::channel::<notify::Result<Event>>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res| {
            let _ = sync_tx.blocking_send(res);
        },
        Config::default().with_poll_interval(Duration::from_secs(2)),
    ) {
        Ok(w) => w,
        Err(e) => {
            error!("Failed to create filesystem watcher: {e}");
            return;
        }
    };

    // Watch the parent: a replace-on-save drops any watch on the file itself.
    let target = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if let Err(e) = watcher.watch(&target, RecursiveMode::NonRecursive) {
        error!("Failed to watch '{}': {e}", target.display());
        return;
    }

    info!("Watching config file: {}", path.display());

    while let Some(event) = sync_rx.recv().await {
        match event {
            Ok(e) => {
                use notify::EventKind::*;
                let ours = e.paths.iter().any(|p| p.file_name() == path.file_name());
                if ours && matches!(e.kind, Modify(_) | Create(_)) {
                    // A full channel already holds a pending reload.
                    if let Err(mpsc::error::TrySendError::Closed(())) = tx.try_send(()) {
                        break; // receiver dropped
                    }
                }
            }
            Err(e) => warn!("Watcher error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn only_the_watched_file_triggers_reload() {
        let dir = std::env::temp_dir().join(format!("better-trends-watch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let target = dir.join("trends.toml");
        std::fs::write(&target, "steps = 3\n").unwrap();

        let (watcher, mut rx) = ConfigWatcher::spawn(&target);
        assert_eq!(watcher.path(), target.as_path());
        // Give the watch loop time to register with the OS.
        tokio::time::sleep(Duration::from_millis(300)).await;

        std::fs::write(dir.join("other.toml"), "steps = 4\n").unwrap();
        assert!(
            timeout(Duration::from_millis(500), rx.recv()).await.is_err(),
            "a sibling file must not trigger a reload"
        );

        std::fs::write(&target, "steps = 5\n").unwrap();
        let signal = timeout(Duration::from_secs(5), rx.recv()).await;
        assert_eq!(signal, Ok(Some(())));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
