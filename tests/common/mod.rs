//! Common test utilities for media-dl integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use media_dl::{
    Config, Error, Event, ExtractionProfile, Extractor, FormatInfo, JobId, JobManager, JobRecord,
    MediaMetadata, ProgressSink, Result, RetryPolicy, TransferRequest, TransferSample,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

pub const TEST_URL: &str = "https://youtube.com/watch?v=abcdefghijk";
pub const TEST_BYTES: &[u8] = b"integration payload";

/// Extractor whose first `failures` transfers fail
pub struct ScriptedExtractor {
    failures: u32,
    delay: Duration,
    pub transfers: AtomicU32,
}

impl ScriptedExtractor {
    pub fn succeeding() -> Self {
        Self::failing(0)
    }

    pub fn failing(failures: u32) -> Self {
        Self {
            failures,
            delay: Duration::ZERO,
            transfers: AtomicU32::new(0),
        }
    }

    /// Every transfer sleeps for `delay` after its first progress sample
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::failing(0)
        }
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn fetch_metadata(&self, url: &str, _profile: ExtractionProfile) -> Result<MediaMetadata> {
        Ok(MediaMetadata {
            title: "Integration: Clip/One".to_string(),
            thumbnail: String::new(),
            duration: 61,
            uploader: "tester".to_string(),
            view_count: 0,
            like_count: 0,
            formats: vec![FormatInfo {
                format_id: "18".to_string(),
                quality: "640x360".to_string(),
                ext: "mp4".to_string(),
                filesize: Some(TEST_BYTES.len() as u64),
                note: String::new(),
                vcodec: Some("avc1".to_string()),
                acodec: Some("mp4a".to_string()),
            }],
            url: url.to_string(),
        })
    }

    async fn download(
        &self,
        request: &TransferRequest,
        sink: &dyn ProgressSink,
    ) -> Result<PathBuf> {
        let call = self.transfers.fetch_add(1, Ordering::SeqCst) + 1;

        for transferred in [10, 40, 80] {
            sink.report(
                &request.id,
                TransferSample::Transferring {
                    transferred,
                    total: Some(100),
                    rate: Some(2048.0),
                },
            )
            .await;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        if call <= self.failures {
            return Err(Error::Extraction(format!("network hiccup #{call}")));
        }

        let path = request.output_dir.join("clip.mp4");
        tokio::fs::write(&path, TEST_BYTES).await?;
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Config rooted in `dir` with no retry delays
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.path().join("downloads");
    config.download.temp_dir = dir.path().join("temp");
    config.retry.metadata = RetryPolicy::immediate(3);
    config.retry.download = RetryPolicy::immediate(3);
    config.extractor.search_path = false;
    config
}

pub async fn create_manager(extractor: ScriptedExtractor) -> (JobManager, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    create_manager_with(extractor, config, dir).await
}

pub async fn create_manager_with(
    extractor: ScriptedExtractor,
    config: Config,
    dir: TempDir,
) -> (JobManager, TempDir) {
    let manager = JobManager::with_extractor(config, Arc::new(extractor))
        .await
        .unwrap();
    (manager, dir)
}

/// Poll until the job is terminal, failing after five seconds
pub async fn wait_for_terminal(manager: &JobManager, id: &JobId) -> JobRecord {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let record = manager.progress(id).await.unwrap();
            if record.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job did not finish in time")
}

/// Receive events until `last` matches (inclusive), failing after five seconds
pub async fn collect_events_until(
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
