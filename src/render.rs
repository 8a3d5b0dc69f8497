//! Writing subtitle files and, on request, burning them into video.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::discovery::MediaFile;
use crate::error::{Result, SubsError};
use crate::media::MediaProcessorTrait;
use crate::subtitle::{write_srt_atomic, SubtitleDocument};

/// Everything needed to finish one item.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub media: MediaFile,
    pub document: SubtitleDocument,
    pub burn_in: bool,
}

/// Files produced for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub subtitle_path: PathBuf,
    pub burned_path: Option<PathBuf>,
}

impl RenderOutcome {
    pub fn paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.subtitle_path.clone())
            .chain(self.burned_path.clone())
            .collect()
    }
}

pub struct RenderCoordinator {
    media: Arc<dyn MediaProcessorTrait>,
    burn_suffix: String,
    encode_timeout: Option<Duration>,
}

impl RenderCoordinator {
    pub fn new<S: Into<String>>(media: Arc<dyn MediaProcessorTrait>, burn_suffix: S) -> Self {
        Self {
            media,
            burn_suffix: burn_suffix.into(),
            encode_timeout: None,
        }
    }

    pub fn with_encode_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.encode_timeout = timeout;
        self
    }

    pub fn burn_suffix(&self) -> &str {
        &self.burn_suffix
    }

    /// Write the subtitle file next to the source, then burn it in if asked.
    ///
    /// The subtitle file is complete on disk before the encoder starts, and it
    /// is kept whatever happens afterwards.
    pub async fn render(&self, request: RenderRequest) -> Result<RenderOutcome> {
        let RenderRequest { media, document, burn_in } = request;

        let subtitle_path = media.subtitle_path();
        write_srt_atomic(&document, &subtitle_path).await?;

        if !burn_in {
            return Ok(RenderOutcome {
                subtitle_path,
                burned_path: None,
            });
        }

        if !media.is_video() {
            return Err(SubsError::UnsupportedOperation(format!(
                "cannot burn subtitles into audio-only file {}",
                media.path().display()
            )));
        }

        let burned_path = media.burned_path(&self.burn_suffix);
        if burned_path == media.path() {
            return Err(SubsError::UnsupportedOperation(format!(
                "burned output would overwrite the source {}; set a burn suffix",
                media.path().display()
            )));
        }

        self.encode(media.path(), &subtitle_path, &burned_path)
            .await
            .map_err(|e| SubsError::Render(e.to_string()))?;

        info!("Saved subtitled video to {}", burned_path.display());
        Ok(RenderOutcome {
            subtitle_path,
            burned_path: Some(burned_path),
        })
    }

    // The encoder writes to `<output>.part`, renamed once it exits cleanly.
    async fn encode(&self, video_path: &Path, subtitle_path: &Path, output_path: &Path) -> Result<()> {
        let partial_path = partial_path(output_path);
        let encode = self.media.burn_subtitles(video_path, subtitle_path, &partial_path);

        let result = match self.encode_timeout {
            Some(limit) => tokio::time::timeout(limit, encode)
                .await
                .unwrap_or(Err(SubsError::Timeout(limit))),
            None => encode.await,
        };

        match result {
            Ok(()) => {
                fs::rename(&partial_path, output_path).await?;
                Ok(())
            }
            Err(e) => {
                discard_partial(&partial_path).await;
                Err(e)
            }
        }
    }
}

fn partial_path(output_path: &Path) -> PathBuf {
    let mut name = OsString::from(output_path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

async fn discard_partial(partial_path: &Path) {
    match fs::remove_file(partial_path).await {
        Ok(()) => debug!("Removed partial output {}", partial_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {}: {}", partial_path.display(), e),
    }
}
