//! Extractor used when no yt-dlp binary is available

use super::{ExtractionProfile, Extractor, TransferRequest};
use crate::progress::ProgressSink;
use crate::types::MediaMetadata;
use async_trait::async_trait;
use std::path::PathBuf;

/// Extractor that refuses every request
///
/// Selected when yt-dlp is neither configured nor found in PATH, so the
/// service still starts and serves the API. Lookups fail with
/// `Error::NotSupported` and submitted jobs end in `error`.
///
/// # Examples
///
/// ```
/// use media_dl::extractor::{ExtractionProfile, Extractor, UnavailableExtractor};
///
/// # #[tokio::main]
/// # async fn main() {
/// let extractor = UnavailableExtractor;
/// let result = extractor
///     .fetch_metadata("https://example.com/v", ExtractionProfile::Mobile)
///     .await;
/// assert!(result.is_err());
/// # }
/// ```
pub struct UnavailableExtractor;

const MESSAGE: &str = "media extraction requires the yt-dlp binary. \
     Configure extractor.ytdlp_path or ensure yt-dlp is in PATH.";

#[async_trait]
impl Extractor for UnavailableExtractor {
    async fn fetch_metadata(
        &self,
        _url: &str,
        _profile: ExtractionProfile,
    ) -> crate::Result<MediaMetadata> {
        Err(crate::Error::NotSupported(MESSAGE.into()))
    }

    async fn download(
        &self,
        _request: &TransferRequest,
        _sink: &dyn ProgressSink,
    ) -> crate::Result<PathBuf> {
        Err(crate::Error::NotSupported(MESSAGE.into()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
