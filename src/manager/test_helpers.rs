//! Shared test helpers for creating JobManager instances in tests.

use crate::config::{Config, RetryPolicy};
use crate::error::{Error, Result};
use crate::extractor::{ExtractionProfile, Extractor, TransferRequest};
use crate::manager::JobManager;
use crate::progress::{ProgressSink, TransferSample};
use crate::types::{Event, FormatInfo, JobId, JobRecord, JobState, MediaMetadata};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{TempDir, tempdir};
use tokio::sync::{Notify, broadcast};

pub(crate) const TEST_URL: &str = "https://youtube.com/watch?v=abcdefghijk";
pub(crate) const TEST_TITLE: &str = "Test Clip";
pub(crate) const TEST_PAYLOAD: &[u8] = b"not really an mp4";

/// Extractor with scripted outcomes
///
/// By default every lookup succeeds and every transfer writes
/// [`TEST_PAYLOAD`] to `clip.mp4` in the work directory.
#[derive(Default)]
pub(crate) struct MockExtractor {
    metadata_failures: u32,
    transfer_failures: u32,
    phantom_output: bool,
    early_finish: bool,
    gate: Option<Arc<Notify>>,
    metadata_gate: Option<Arc<Notify>>,
    started: Arc<Notify>,
    pub(crate) metadata_calls: AtomicU32,
    pub(crate) transfer_calls: AtomicU32,
    pub(crate) profiles: Mutex<Vec<ExtractionProfile>>,
}

impl MockExtractor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// First `n` lookups fail with "metadata attempt <n> failed"
    pub(crate) fn with_metadata_failures(mut self, n: u32) -> Self {
        self.metadata_failures = n;
        self
    }

    /// First `n` transfers fail with "transfer attempt <n> failed"
    pub(crate) fn with_transfer_failures(mut self, n: u32) -> Self {
        self.transfer_failures = n;
        self
    }

    /// Transfers report success but leave no file behind
    pub(crate) fn with_phantom_output(mut self) -> Self {
        self.phantom_output = true;
        self
    }

    /// Transfers report [`TransferSample::Finished`] before deciding whether to fail
    pub(crate) fn with_early_finish(mut self) -> Self {
        self.early_finish = true;
        self
    }

    /// Lookups block until the returned gate is notified
    pub(crate) fn with_metadata_gate(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.metadata_gate = Some(gate.clone());
        (self, gate)
    }

    /// Transfers block after their first progress sample until the returned gate is notified
    pub(crate) fn with_gate(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Notified once a gated lookup or transfer is waiting
    pub(crate) fn started(&self) -> Arc<Notify> {
        self.started.clone()
    }
}

pub(crate) fn sample_metadata(url: &str) -> MediaMetadata {
    let format = |id: &str, quality: &str, vcodec: &str, acodec: &str| FormatInfo {
        format_id: id.to_string(),
        quality: quality.to_string(),
        ext: "mp4".to_string(),
        filesize: Some(1_000),
        note: String::new(),
        vcodec: Some(vcodec.to_string()),
        acodec: Some(acodec.to_string()),
    };
    MediaMetadata {
        title: TEST_TITLE.to_string(),
        thumbnail: "https://example.com/thumb.jpg".to_string(),
        duration: 212,
        uploader: "uploader".to_string(),
        view_count: 10,
        like_count: 2,
        formats: vec![
            format("18", "640x360", "avc1", "mp4a"),
            format("137", "1920x1080", "avc1", "none"),
            format("22", "1280x720", "avc1", "mp4a"),
        ],
        url: url.to_string(),
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn fetch_metadata(&self, url: &str, profile: ExtractionProfile) -> Result<MediaMetadata> {
        let call = self.metadata_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.profiles.lock().unwrap().push(profile);
        if let Some(gate) = &self.metadata_gate {
            self.started.notify_one();
            gate.notified().await;
        }
        if call <= self.metadata_failures {
            return Err(Error::Extraction(format!("metadata attempt {call} failed")));
        }
        Ok(sample_metadata(url))
    }

    async fn download(
        &self,
        request: &TransferRequest,
        sink: &dyn ProgressSink,
    ) -> Result<PathBuf> {
        let call = self.transfer_calls.fetch_add(1, Ordering::SeqCst) + 1;

        sink.report(
            &request.id,
            TransferSample::Transferring {
                transferred: 50,
                total: Some(100),
                rate: Some(1024.0),
            },
        )
        .await;

        if self.early_finish {
            sink.report(&request.id, TransferSample::Finished).await;
        }

        if let Some(gate) = &self.gate {
            self.started.notify_one();
            gate.notified().await;
        }

        if call <= self.transfer_failures {
            return Err(Error::Extraction(format!("transfer attempt {call} failed")));
        }

        let path = request.output_dir.join("clip.mp4");
        if !self.phantom_output {
            tokio::fs::write(&path, TEST_PAYLOAD).await?;
        }
        sink.report(
            &request.id,
            TransferSample::Transferring {
                transferred: 100,
                total: Some(100),
                rate: None,
            },
        )
        .await;
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Config rooted in `dir` with instant retries and a TTL long enough not to fire mid-test
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("downloads");
    config.download.temp_dir = dir.join("temp");
    config.retry.metadata = RetryPolicy::immediate(3);
    config.retry.download = RetryPolicy::immediate(3);
    config.expiry.ttl = Duration::from_secs(600);
    config.extractor.search_path = false;
    config
}

/// Helper to create a test JobManager around `extractor`.
/// Returns the manager, the extractor and the tempdir (which must be kept alive).
pub(crate) async fn create_test_manager(
    extractor: MockExtractor,
) -> (JobManager, Arc<MockExtractor>, TempDir) {
    let temp_dir = tempdir().unwrap();
    create_test_manager_with(extractor, test_config(temp_dir.path()), temp_dir).await
}

/// Like [`create_test_manager`] with a caller-adjusted config
pub(crate) async fn create_test_manager_with(
    extractor: MockExtractor,
    config: Config,
    temp_dir: TempDir,
) -> (JobManager, Arc<MockExtractor>, TempDir) {
    let extractor = Arc::new(extractor);
    let manager = JobManager::with_extractor(config, extractor.clone())
        .await
        .unwrap();
    (manager, extractor, temp_dir)
}

/// Poll until the job satisfies `done`, failing the test after five seconds
pub(crate) async fn wait_until(
    manager: &JobManager,
    id: &JobId,
    done: impl Fn(&JobRecord) -> bool,
) -> JobRecord {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(record) = manager.progress(id).await {
                if done(&record) {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job did not reach the expected state in time")
}

pub(crate) async fn wait_for_terminal(manager: &JobManager, id: &JobId) -> JobRecord {
    wait_until(manager, id, JobRecord::is_terminal).await
}

pub(crate) async fn wait_for_state(manager: &JobManager, id: &JobId, state: JobState) -> JobRecord {
    wait_until(manager, id, |r| r.state == state).await
}

/// Poll until `id` is no longer in the registry
pub(crate) async fn wait_until_gone(manager: &JobManager, id: &JobId) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while manager.progress(id).await.is_ok() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job was not evicted in time");
}

/// Receive events until one matches `last` (inclusive), failing the test after five seconds
pub(crate) async fn collect_events_until(
    events: &mut broadcast::Receiver<Event>,
    last: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    tokio::time::timeout(Duration::from_secs(5), async {
        let mut seen = Vec::new();
        loop {
            let event = events.recv().await.unwrap();
            let done = last(&event);
            seen.push(event);
            if done {
                return seen;
            }
        }
    })
    .await
    .expect("expected event was not emitted in time")
}
