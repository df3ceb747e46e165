//! Media extraction
//!
//! The [`Extractor`] trait is the boundary to whatever actually talks to the
//! upstream site. Two implementations are provided:
//!
//! - [`YtDlpExtractor`]: drives the external `yt-dlp` binary
//! - [`UnavailableExtractor`]: refuses everything when no binary exists
//!
//! [`select_extractor`] picks one from configuration. Metadata returned by any
//! extractor is passed through [`shape_metadata`] before it reaches clients.

use crate::config::ExtractorConfig;
use crate::progress::ProgressSink;
use crate::types::{FormatInfo, JobId, MediaMetadata};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

mod profile;
mod unavailable;
mod ytdlp;

pub use profile::ExtractionProfile;
pub use unavailable::UnavailableExtractor;
pub use ytdlp::YtDlpExtractor;

/// Most formats returned by a metadata lookup
pub const MAX_FORMATS: usize = 20;

/// Everything the extractor needs for one transfer
#[derive(Clone, Debug)]
pub struct TransferRequest {
    /// Job the transfer belongs to; progress is reported under this id
    pub id: JobId,
    /// Source URL
    pub url: String,
    /// Opaque format selector
    pub format: String,
    /// Private directory the extractor writes into
    pub output_dir: PathBuf,
    /// Container for merged audio/video streams
    pub merge_output_format: String,
    /// Client profile to use
    pub profile: ExtractionProfile,
}

/// External capability that looks up media metadata and transfers media bytes
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Look up title, duration and formats for `url` using `profile`
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream refuses the lookup, the tool fails to
    /// run, or extraction is not supported.
    async fn fetch_metadata(
        &self,
        url: &str,
        profile: ExtractionProfile,
    ) -> crate::Result<MediaMetadata>;

    /// Transfer the media into `request.output_dir`, reporting progress to `sink`
    ///
    /// Returns the path of the produced file inside `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails or produces no media file.
    async fn download(
        &self,
        request: &TransferRequest,
        sink: &dyn ProgressSink,
    ) -> crate::Result<PathBuf>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Pick the extractor implementation for `config`
///
/// An explicit `ytdlp_path` wins; otherwise PATH is searched when allowed, and
/// [`UnavailableExtractor`] is the fallback.
pub fn select_extractor(config: &ExtractorConfig) -> Arc<dyn Extractor> {
    let extractor: Arc<dyn Extractor> = if let Some(ref path) = config.ytdlp_path {
        Arc::new(YtDlpExtractor::new(path.clone(), config.socket_timeout))
    } else if config.search_path {
        YtDlpExtractor::from_path(config.socket_timeout)
            .map(|e| Arc::new(e) as Arc<dyn Extractor>)
            .unwrap_or_else(|| Arc::new(UnavailableExtractor))
    } else {
        Arc::new(UnavailableExtractor)
    };

    tracing::info!(extractor = extractor.name(), "Extractor initialized");
    extractor
}

/// Keep only muxed formats, highest resolution first, at most [`MAX_FORMATS`]
pub fn shape_metadata(mut metadata: MediaMetadata) -> MediaMetadata {
    let mut formats: Vec<FormatInfo> = metadata
        .formats
        .into_iter()
        .filter(FormatInfo::has_video_and_audio)
        .collect();
    formats.sort_by_key(|f| std::cmp::Reverse(resolution_rank(&f.quality)));
    formats.truncate(MAX_FORMATS);
    metadata.formats = formats;
    metadata
}

/// Vertical resolution implied by a quality label
///
/// `"1280x720"` ranks by its height, `"720p60"` by its first number, and
/// labels without digits rank lowest.
pub fn resolution_rank(quality: &str) -> u32 {
    if let Some((w, h)) = quality.split_once('x') {
        if let (Ok(_), Ok(h)) = (w.trim().parse::<u32>(), h.trim().parse::<u32>()) {
            return h;
        }
    }
    quality
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Client-facing message for an extractor failure
pub fn describe_failure(raw: &str) -> String {
    if raw.contains("Failed to extract any player response") {
        return "upstream is blocking this request; try updating yt-dlp or try again later"
            .to_string();
    }
    raw.lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                "extractor exited without output".to_string()
            } else {
                trimmed.to_string()
            }
        })
}
