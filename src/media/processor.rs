use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{Result, SubsError};
use super::{MediaCommandBuilder, MediaProcessorTrait};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        info!(
            "Burning subtitles from {} into {} -> {}",
            subtitle_path.display(),
            video_path.display(),
            output_path.display()
        );

        let force_style = self.config.force_style();
        let command = self.command_builder.burn_subtitles(
            video_path,
            subtitle_path,
            output_path,
            &self.config.video_codec,
            Some(force_style.as_str()),
            &self.config.subtitle_options,
        );

        command.execute().await?;

        info!("Subtitle burn-in completed successfully");
        Ok(())
    }

    async fn extract_audio(&self, media_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", media_path.display(), audio_path.display());

        let command = self.command_builder.extract_audio(media_path, audio_path);
        command.execute().await?;

        debug!("Audio extraction completed");
        Ok(())
    }

    async fn check_availability(&self) -> Result<String> {
        let stdout = self
            .command_builder
            .version_check()
            .execute()
            .await
            .map_err(|e| SubsError::Media(format!("Media processor not available: {}", e)))?;

        // The first line typically contains the version
        let version = stdout.lines().next().unwrap_or("Unknown version").to_string();
        info!("Media processor is available: {}", version);
        Ok(version)
    }
}
