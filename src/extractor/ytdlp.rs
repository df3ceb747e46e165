//! Extractor backed by the external yt-dlp binary

use super::{ExtractionProfile, Extractor, TransferRequest, describe_failure};
use crate::progress::{ProgressSink, TransferSample};
use crate::types::{FormatInfo, MediaMetadata};
use crate::utils::find_produced_file;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Prefix of the machine-readable progress lines requested from yt-dlp
const PROGRESS_PREFIX: &str = "[media-dl]";

const PROGRESS_TEMPLATE: &str = "download:[media-dl] %(progress.status)s \
     %(progress.downloaded_bytes)s %(progress.total_bytes)s \
     %(progress.total_bytes_estimate)s %(progress.speed)s";

/// Lines of stderr kept for error reporting
const STDERR_TAIL: usize = 50;

const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Extractor that shells out to `yt-dlp`
///
/// # Examples
///
/// ```no_run
/// use media_dl::extractor::{ExtractionProfile, Extractor, YtDlpExtractor};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = YtDlpExtractor::from_path(Duration::from_secs(30))
///     .expect("yt-dlp not found in PATH");
/// let info = extractor
///     .fetch_metadata("https://youtube.com/watch?v=abcdefghijk", ExtractionProfile::Mobile)
///     .await?;
/// println!("{}", info.title);
/// # Ok(())
/// # }
/// ```
pub struct YtDlpExtractor {
    binary_path: PathBuf,
    socket_timeout: Duration,
}

impl YtDlpExtractor {
    /// Create an extractor with an explicit binary path
    pub fn new(binary_path: PathBuf, socket_timeout: Duration) -> Self {
        Self {
            binary_path,
            socket_timeout,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path(socket_timeout: Duration) -> Option<Self> {
        which::which("yt-dlp")
            .ok()
            .map(|path| Self::new(path, socket_timeout))
    }

    fn common_args(&self, profile: ExtractionProfile) -> Vec<String> {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        vec![
            "--no-warnings".into(),
            "--no-playlist".into(),
            "--geo-bypass".into(),
            "--geo-bypass-country".into(),
            "US".into(),
            "--socket-timeout".into(),
            self.socket_timeout.as_secs().max(1).to_string(),
            "--user-agent".into(),
            user_agent.into(),
            "--extractor-args".into(),
            format!("youtube:{}", profile.extractor_args()),
        ]
    }

    fn download_args(&self, request: &TransferRequest) -> Vec<String> {
        let mut args = self.common_args(request.profile);
        let template = request.output_dir.join("%(title)s.%(ext)s");
        args.extend([
            "-f".into(),
            request.format.clone(),
            "-o".into(),
            template.to_string_lossy().into_owned(),
            "--merge-output-format".into(),
            request.merge_output_format.clone(),
            "--newline".into(),
            "--retries".into(),
            "15".into(),
            "--fragment-retries".into(),
            "15".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "--".into(),
            request.url.clone(),
        ]);
        args
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn fetch_metadata(
        &self,
        url: &str,
        profile: ExtractionProfile,
    ) -> crate::Result<MediaMetadata> {
        tracing::debug!(url, profile = %profile, "Fetching metadata with yt-dlp");

        let output = Command::new(&self.binary_path)
            .arg("-J")
            .args(self.common_args(profile))
            .arg("--")
            .arg(url)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(crate::Error::Extraction(describe_failure(&stderr)));
        }

        parse_metadata(&output.stdout, url)
    }

    async fn download(
        &self,
        request: &TransferRequest,
        sink: &dyn ProgressSink,
    ) -> crate::Result<PathBuf> {
        let args = self.download_args(request);
        tracing::debug!(job_id = %request.id, ?args, "Starting yt-dlp transfer");

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tail.len() == STDERR_TAIL {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Vec::from(tail).join("\n")
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                match parse_progress_line(&line) {
                    Some(sample) => sink.report(&request.id, sample).await,
                    None => tracing::trace!(job_id = %request.id, line, "yt-dlp output"),
                }
            }
        }

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(crate::Error::Extraction(describe_failure(&stderr)));
        }

        find_produced_file(&request.output_dir).await
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Parse one `--progress-template` line; anything else yields `None`
fn parse_progress_line(line: &str) -> Option<TransferSample> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split_whitespace();
    let status = fields.next()?;

    match status {
        "finished" => Some(TransferSample::Finished),
        "downloading" => {
            let transferred = parse_number(fields.next()).map_or(0, |n| n as u64);
            let total = parse_number(fields.next());
            let estimate = parse_number(fields.next());
            let rate = parse_number(fields.next());
            Some(TransferSample::Transferring {
                transferred,
                total: total.or(estimate).map(|n| n as u64),
                rate,
            })
        }
        _ => None,
    }
}

/// yt-dlp prints `NA` for unknown template fields
fn parse_number(field: Option<&str>) -> Option<f64> {
    field
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite() && *n >= 0.0)
}

#[derive(Deserialize)]
struct InfoJson {
    title: Option<String>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    view_count: Option<u64>,
    like_count: Option<u64>,
    #[serde(default)]
    formats: Vec<FormatJson>,
}

#[derive(Deserialize)]
struct FormatJson {
    format_id: String,
    resolution: Option<String>,
    format_note: Option<String>,
    ext: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    vcodec: Option<String>,
    acodec: Option<String>,
}

fn parse_metadata(stdout: &[u8], url: &str) -> crate::Result<MediaMetadata> {
    let info: InfoJson = serde_json::from_slice(stdout)?;

    let formats = info
        .formats
        .into_iter()
        .map(|f| {
            let note = f.format_note.unwrap_or_default();
            FormatInfo {
                format_id: f.format_id,
                quality: f
                    .resolution
                    .or_else(|| (!note.is_empty()).then(|| note.clone()))
                    .unwrap_or_else(|| "Unknown".to_string()),
                ext: f.ext.unwrap_or_else(|| "mp4".to_string()),
                filesize: f.filesize.or(f.filesize_approx),
                note,
                vcodec: f.vcodec,
                acodec: f.acodec,
            }
        })
        .collect();

    Ok(MediaMetadata {
        title: info.title.unwrap_or_else(|| "Unknown".to_string()),
        thumbnail: info.thumbnail.unwrap_or_default(),
        duration: info.duration.map_or(0, |d| d.max(0.0) as u64),
        uploader: info.uploader.unwrap_or_else(|| "Unknown".to_string()),
        view_count: info.view_count.unwrap_or(0),
        like_count: info.like_count.unwrap_or(0),
        formats,
        url: url.to_string(),
    })
}
