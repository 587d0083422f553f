use super::session::Session;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Opaque identifier of a background replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplayHandle(u64);

impl std::fmt::Display for ReplayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "replay-{}", self.0)
    }
}

struct BackgroundReplay {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Table of running background replays.
///
/// Each replay streams its file over and over until stopped. A failed pass
/// is restarted after a fixed backoff unless the error is not retryable.
pub struct ReplayRegistry {
    next_id: AtomicU64,
    replays: Mutex<HashMap<ReplayHandle, BackgroundReplay>>,
    restart_backoff: Duration,
}

impl ReplayRegistry {
    pub fn new(restart_backoff: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            replays: Mutex::new(HashMap::new()),
            restart_backoff,
        }
    }

    /// Spawns a repeating replay of `path` over `session`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, session: Arc<Session>, path: impl Into<PathBuf>) -> ReplayHandle {
        let handle = ReplayHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();
        let path = path.into();

        info!("Starting {} for {}", handle, path.display());
        let task = tokio::spawn(repeat_file(
            handle,
            session,
            path,
            cancel.clone(),
            self.restart_backoff,
        ));

        self.replays
            .lock()
            .insert(handle, BackgroundReplay { cancel, task });
        handle
    }

    /// Cancels a replay and waits for it to wind down.
    ///
    /// Returns false when the handle is unknown or already stopped.
    pub async fn stop(&self, handle: ReplayHandle) -> bool {
        let replay = self.replays.lock().remove(&handle);
        match replay {
            Some(replay) => {
                replay.cancel.cancel();
                if let Err(e) = replay.task.await {
                    warn!("{} ended abnormally: {}", handle, e);
                }
                info!("Stopped {}", handle);
                true
            }
            None => false,
        }
    }

    pub async fn stop_all(&self) {
        let handles: Vec<ReplayHandle> = self.replays.lock().keys().copied().collect();
        for handle in handles {
            self.stop(handle).await;
        }
    }

    /// Whether `handle` is registered and its task has not exited.
    pub fn is_running(&self, handle: ReplayHandle) -> bool {
        self.replays
            .lock()
            .get(&handle)
            .is_some_and(|replay| !replay.task.is_finished())
    }

    pub fn running(&self) -> usize {
        self.replays
            .lock()
            .values()
            .filter(|replay| !replay.task.is_finished())
            .count()
    }
}

impl Default for ReplayRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Drop for ReplayRegistry {
    fn drop(&mut self) {
        for (_, replay) in self.replays.get_mut().drain() {
            replay.cancel.cancel();
        }
    }
}

async fn repeat_file(
    handle: ReplayHandle,
    session: Arc<Session>,
    path: PathBuf,
    cancel: CancellationToken,
    backoff: Duration,
) {
    let mut passes = 0u64;
    loop {
        let restart_after = match session.stream_file(&path, &cancel).await {
            Ok(report) if report.summary.is_cancelled() => break,
            Ok(report) => {
                passes += 1;
                debug!("{} finished pass {} of {}", handle, passes, path.display());
                // an empty file would otherwise spin
                (report.summary.chunks_written == 0).then_some(backoff)
            }
            Err(e) if !e.is_retryable() => {
                warn!("{} stopped: {} is unusable: {}", handle, path.display(), e);
                break;
            }
            Err(_) => {
                warn!("{} failed, restarting in {:?}", handle, backoff);
                Some(backoff)
            }
        };

        if let Some(delay) = restart_after {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        } else if cancel.is_cancelled() {
            break;
        }
    }
    debug!("{} exiting after {} passes", handle, passes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReplayConfig;
    use crate::format::ts::parser::test_utils::pcr_packet;
    use crate::format::ts::time_to_pcr;
    use crate::host::reporter::test_utils::CollectingReporter;
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    async fn session(reporter: Arc<CollectingReporter>) -> (UdpSocket, Arc<Session>) {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = ReplayConfig {
            endpoint: format!("udp://{}", receiver.local_addr().unwrap()),
            chunk_size: 188,
            ..Default::default()
        };
        let session = Session::connect(&config, reporter).await.unwrap();
        (receiver, Arc::new(session))
    }

    fn write_stream(dir: &tempfile::TempDir, name: &str, packets: u64) -> PathBuf {
        let data: Vec<u8> = (0..packets)
            .flat_map(|i| pcr_packet(0x100, time_to_pcr(Duration::from_millis(i * 2))))
            .collect();
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test]
    async fn test_background_replay_repeats_until_stopped() {
        let reporter = Arc::new(CollectingReporter::default());
        let (receiver, session) = session(reporter.clone()).await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_stream(&dir, "loop.ts", 3);

        let registry = ReplayRegistry::new(Duration::from_millis(10));
        let handle = registry.start(session.clone(), &path);
        assert!(registry.is_running(handle));
        assert_eq!(registry.running(), 1);

        // more datagrams than one pass holds proves the file restarted
        let mut buf = [0u8; 2048];
        for _ in 0..7 {
            timeout(Duration::from_secs(5), receiver.recv_from(&mut buf))
                .await
                .expect("replay stalled")
                .unwrap();
        }

        assert!(registry.stop(handle).await);
        assert!(!registry.is_running(handle));
        assert!(!registry.stop(handle).await);
        assert_eq!(registry.running(), 0);
        assert!(reporter.reports.lock().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_stops_without_restart() {
        let reporter = Arc::new(CollectingReporter::default());
        let (_receiver, session) = session(reporter.clone()).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ts");
        std::fs::write(&path, vec![0u8; 188]).unwrap();

        let registry = ReplayRegistry::new(Duration::from_millis(10));
        let handle = registry.start(session, &path);

        timeout(Duration::from_secs(5), async {
            while registry.is_running(handle) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("replay kept running");

        assert_eq!(reporter.reports.lock().len(), 1);
        // the entry stays until the host removes it
        assert!(registry.stop(handle).await);
    }

    #[tokio::test]
    async fn test_missing_file_is_retried_with_backoff() {
        let reporter = Arc::new(CollectingReporter::default());
        let (_receiver, session) = session(reporter.clone()).await;
        let dir = tempfile::tempdir().unwrap();

        let registry = ReplayRegistry::new(Duration::from_millis(20));
        let handle = registry.start(session, dir.path().join("later.ts"));

        timeout(Duration::from_secs(5), async {
            while reporter.reports.lock().len() < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("no restarts observed");

        assert!(registry.is_running(handle));
        registry.stop_all().await;
        assert_eq!(registry.running(), 0);
    }
}
