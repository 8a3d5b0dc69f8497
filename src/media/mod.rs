// Media processing (ffmpeg) behind a trait
//
// - Processor: ffmpeg-backed implementation of MediaProcessorTrait
// - Commands: command builders and filter escaping

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Re-encode `video_path` with the subtitles rendered into the frames,
    /// copying the audio stream verbatim, and write the result to `output_path`
    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
    ) -> Result<()>;

    /// Extract a 16 kHz mono PCM WAV from any media file
    async fn extract_audio(&self, media_path: &Path, audio_path: &Path) -> Result<()>;

    /// Check the processor can be run; returns its version line
    async fn check_availability(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Arc<dyn MediaProcessorTrait> {
        Arc::new(processor::MediaProcessorImpl::new(config))
    }
}
