// whisper.cpp (`whisper-cli`) implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::error::{Result, SubsError};
use crate::media::{MediaCommand, MediaProcessorTrait};
use crate::subtitle::Segment;
use super::TranscriberTrait;
use super::common::{effective_language, extract_wav, read_engine_json, run_engine, sanitize_segments, TranscriptionMapper};

/// Base name of the JSON file whisper-cli writes into the work directory
const OUTPUT_BASE: &str = "transcript";

/// whisper.cpp `-oj` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    pub result: Option<WhisperCppResult>,
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub offsets: WhisperCppOffsets,
    pub text: String,
}

/// Offsets in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOffsets {
    pub from: i64,
    pub to: i64,
}

/// Mapper for whisper.cpp format
pub struct WhisperCppMapper;

impl TranscriptionMapper<WhisperCppOutput> for WhisperCppMapper {
    fn to_segments(whisper_output: WhisperCppOutput) -> Result<Vec<Segment>> {
        if let Some(result) = &whisper_output.result {
            debug!("whisper.cpp detected language: {}", result.language);
        }
        Ok(sanitize_segments(whisper_output.transcription.into_iter().map(|seg| {
            Segment::new(
                seg.offsets.from as f64 / 1000.0,
                seg.offsets.to as f64 / 1000.0,
                seg.text,
            )
        })))
    }
}

pub struct WhisperCppTranscriber {
    config: TranscriberConfig,
    media: Arc<dyn MediaProcessorTrait>,
}

impl WhisperCppTranscriber {
    pub fn new(config: TranscriberConfig, media: Arc<dyn MediaProcessorTrait>) -> Self {
        Self { config, media }
    }

    /// Resolve a model name such as `small` to `<models_dir>/ggml-small.bin`.
    /// Values that already look like a path are used as given.
    pub fn resolve_model_path(&self, model: &str) -> PathBuf {
        if model.contains('/') || model.contains('\\') || model.ends_with(".bin") {
            return PathBuf::from(model);
        }
        Path::new(&self.config.models_dir).join(format!("ggml-{}.bin", model))
    }

    fn build_command(&self, audio_path: &Path, model: &str, model_path: &Path, output_dir: &Path) -> MediaCommand {
        let mut command = MediaCommand::new(&self.config.binary_path, "whisper.cpp transcription")
            .arg("-m").arg(model_path.to_string_lossy().to_string())
            .arg("-f").arg(audio_path.to_string_lossy().to_string())
            .arg("-oj")
            .arg("-of").arg(output_dir.join(OUTPUT_BASE).to_string_lossy().to_string())
            .arg("-np");

        if let Some(language) = effective_language(model, self.config.language()) {
            command = command.arg("-l").arg(language);
        }
        command
    }
}

#[async_trait]
impl TranscriberTrait for WhisperCppTranscriber {
    async fn transcribe(&self, media_path: &Path, model: &str) -> Result<Vec<Segment>> {
        let model_path = self.resolve_model_path(model);
        if !model_path.is_file() {
            return Err(SubsError::Transcription(format!(
                "whisper.cpp model not found: {}",
                model_path.display()
            )));
        }
        info!("Transcribing {} with whisper.cpp model {}", media_path.display(), model_path.display());

        let work_dir = tempfile::tempdir()
            .map_err(|e| SubsError::Transcription(format!("Failed to create temp directory: {}", e)))?;
        let audio_path = extract_wav(self.media.as_ref(), media_path, work_dir.path()).await?;

        run_engine(self.build_command(&audio_path, model, &model_path, work_dir.path())).await?;

        let json_file = work_dir.path().join(format!("{}.json", OUTPUT_BASE));
        let output: WhisperCppOutput = read_engine_json(&json_file).await?;

        let segments = WhisperCppMapper::to_segments(output)?;
        info!("whisper.cpp returned {} segments for {}", segments.len(), media_path.display());
        Ok(segments)
    }

    async fn check_availability(&self) -> Result<()> {
        MediaCommand::new(&self.config.binary_path, "whisper.cpp availability check")
            .arg("--help")
            .execute()
            .await
            .map_err(|e| SubsError::Transcription(format!("whisper.cpp not available: {}", e)))?;
        info!("whisper.cpp is available");
        Ok(())
    }
}
