use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::discovery::{DiscoveredEntry, MediaDiscovery, MediaFile};
use crate::error::{Result, SubsError};
use crate::render::{RenderCoordinator, RenderRequest};
use crate::report::{BatchSummary, ItemReport, ItemStatus};
use crate::subtitle::{read_srt, Segment, SubtitleDocument};
use crate::transcribe::TranscriberTrait;

/// Knobs for a batch run.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Model size handed to the transcription engine
    pub model: String,
    /// Burn subtitles into a new video after writing the .srt
    pub burn_in: bool,
    /// Leave items whose outputs already exist and are valid
    pub skip_existing: bool,
    /// Limit on a single transcription attempt
    pub transcribe_timeout: Option<Duration>,
    /// Extra transcription attempts after a failure
    pub max_retries: u32,
    /// Draw a progress spinner on stderr
    pub progress: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            model: "small".to_string(),
            burn_in: false,
            skip_existing: false,
            transcribe_timeout: None,
            max_retries: 0,
            progress: false,
        }
    }
}

/// Runs every discovered item through transcribe → format → render, one at a time.
///
/// A failing item is recorded with the stage it failed in and the batch moves
/// on; nothing an item does can abort the run.
pub struct BatchDriver {
    transcriber: Box<dyn TranscriberTrait>,
    coordinator: RenderCoordinator,
    options: DriverOptions,
}

impl BatchDriver {
    pub fn new(
        transcriber: Box<dyn TranscriberTrait>,
        coordinator: RenderCoordinator,
        options: DriverOptions,
    ) -> Self {
        Self {
            transcriber,
            coordinator,
            options,
        }
    }

    pub async fn run(&self, discovery: &MediaDiscovery) -> BatchSummary {
        info!("Processing directory: {}", discovery.root().display());
        let mut summary = BatchSummary::new(discovery.root());
        let progress = self.progress_bar();

        for entry in discovery.entries() {
            if let Some(name) = entry.path().file_name() {
                progress.set_message(name.to_string_lossy().into_owned());
            }

            let report = match entry {
                DiscoveredEntry::Media(media) => self.process_item(media).await,
                DiscoveredEntry::Unsupported(path) => {
                    debug!("Skipping unsupported file: {}", path.display());
                    ItemReport::skipped_unsupported(path)
                }
                DiscoveredEntry::Unreadable { path, reason } => ItemReport::unreadable(path, reason),
            };
            summary.record(report);
            progress.inc(1);
        }

        progress.finish_and_clear();
        summary.finish();
        info!(
            "Batch finished: {} ok, {} failed, {} skipped",
            summary.count(ItemStatus::Ok),
            summary.failures().count(),
            summary.count(ItemStatus::SkippedUnsupported) + summary.count(ItemStatus::SkippedExisting)
        );
        summary
    }

    /// Process a single media file to completion.
    pub async fn process_item(&self, media: MediaFile) -> ItemReport {
        info!("Processing {} file: {}", media.kind(), media.path().display());

        if self.options.skip_existing && self.outputs_exist(&media).await {
            info!("Skipping {}: outputs already exist", media.path().display());
            return ItemReport::skipped_existing(&media);
        }

        let segments = match self.transcribe_with_retry(&media).await {
            Ok(segments) => segments,
            Err(e) => {
                warn!("Transcription failed for {}: {}", media.path().display(), e);
                return ItemReport::failed(&media, ItemStatus::TranscriptionFailed, &e);
            }
        };

        let document = match SubtitleDocument::from_segments(segments) {
            Ok(document) => document,
            Err(e) => {
                warn!("Formatting failed for {}: {}", media.path().display(), e);
                return ItemReport::failed(&media, ItemStatus::FormatFailed, &e);
            }
        };
        if document.is_empty() {
            info!("No speech detected in {}; writing an empty subtitle file", media.path().display());
        }

        let request = RenderRequest {
            media: media.clone(),
            document,
            burn_in: self.options.burn_in,
        };
        match self.coordinator.render(request).await {
            Ok(outcome) => {
                info!("Successfully processed: {}", media.path().display());
                ItemReport::ok(&media, outcome.paths())
            }
            Err(e) => {
                warn!("Rendering failed for {}: {}", media.path().display(), e);
                ItemReport::failed(&media, ItemStatus::RenderFailed, &e)
            }
        }
    }

    async fn transcribe_with_retry(&self, media: &MediaFile) -> Result<Vec<Segment>> {
        let attempts = self.options.max_retries + 1;
        let mut attempt = 1;
        loop {
            match self.transcribe_once(media).await {
                Ok(segments) => return Ok(segments),
                Err(e) if attempt < attempts => {
                    warn!(
                        "Transcription attempt {}/{} failed for {}: {}",
                        attempt,
                        attempts,
                        media.path().display(),
                        e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn transcribe_once(&self, media: &MediaFile) -> Result<Vec<Segment>> {
        let transcription = self.transcriber.transcribe(media.path(), &self.options.model);
        match self.options.transcribe_timeout {
            Some(limit) => tokio::time::timeout(limit, transcription)
                .await
                .unwrap_or(Err(SubsError::Timeout(limit))),
            None => transcription.await,
        }
    }

    /// A valid subtitle file exists, plus the burned video when one is wanted.
    async fn outputs_exist(&self, media: &MediaFile) -> bool {
        let subtitle_path = media.subtitle_path();
        if !subtitle_path.exists() {
            return false;
        }
        if let Err(e) = read_srt(&subtitle_path).await {
            warn!("Existing {} is not usable, regenerating: {}", subtitle_path.display(), e);
            return false;
        }
        if self.options.burn_in && media.is_video() {
            return media.burned_path(self.coordinator.burn_suffix()).exists();
        }
        true
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    }
}
