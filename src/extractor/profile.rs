//! Extraction profiles tried in order by the metadata retry loop

use serde::{Deserialize, Serialize};

/// Client configuration variant handed to the extractor
///
/// Upstreams block some client kinds more than others, so a failed lookup is
/// retried with the next profile in [`ExtractionProfile::ORDER`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionProfile {
    /// Mobile app clients with manifests skipped
    Mobile,
    /// Android client against the studio host
    StudioAndroid,
    /// iOS and embedded Android clients
    IosEmbedded,
}

impl ExtractionProfile {
    /// Fixed order in which profiles are attempted
    pub const ORDER: [ExtractionProfile; 3] = [
        ExtractionProfile::Mobile,
        ExtractionProfile::StudioAndroid,
        ExtractionProfile::IosEmbedded,
    ];

    /// Profile for the zero-based `attempt`, wrapping around past the last one
    pub fn for_attempt(attempt: u32) -> Self {
        Self::ORDER[attempt as usize % Self::ORDER.len()]
    }

    /// Value for yt-dlp's `--extractor-args youtube:<value>`
    pub fn extractor_args(&self) -> &'static str {
        match self {
            ExtractionProfile::Mobile => "player_client=android,ios,web;skip=configs,hls,dash",
            ExtractionProfile::StudioAndroid => {
                "player_client=android;player_skip=configs;innertube_host=studio.youtube.com"
            }
            ExtractionProfile::IosEmbedded => "player_client=ios,android_embed;skip=hls",
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionProfile::Mobile => "mobile",
            ExtractionProfile::StudioAndroid => "studio_android",
            ExtractionProfile::IosEmbedded => "ios_embedded",
        }
    }
}

impl std::fmt::Display for ExtractionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
