// OpenAI Whisper command-line implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::error::{Result, SubsError};
use crate::media::{MediaCommand, MediaProcessorTrait};
use crate::subtitle::Segment;
use super::TranscriberTrait;
use super::common::{effective_language, extract_wav, read_engine_json, run_engine, sanitize_segments, TranscriptionMapper};

/// OpenAI Whisper specific JSON output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperOutput {
    #[serde(default)]
    pub text: String,
    pub segments: Vec<OpenAIWhisperSegment>,
    pub language: Option<String>,
}

/// OpenAI Whisper specific segment format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperSegment {
    pub id: Option<u64>,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub avg_logprob: Option<f64>,
    pub no_speech_prob: Option<f64>,
}

/// Mapper for OpenAI Whisper format
pub struct OpenAIWhisperMapper;

impl TranscriptionMapper<OpenAIWhisperOutput> for OpenAIWhisperMapper {
    fn to_segments(whisper_output: OpenAIWhisperOutput) -> Result<Vec<Segment>> {
        if let Some(language) = &whisper_output.language {
            debug!("Whisper detected language: {}", language);
        }
        Ok(sanitize_segments(
            whisper_output
                .segments
                .into_iter()
                .map(|seg| Segment::new(seg.start, seg.end, seg.text)),
        ))
    }
}

/// OpenAI Whisper implementation
pub struct OpenAITranscriber {
    config: TranscriberConfig,
    media: Arc<dyn MediaProcessorTrait>,
}

impl OpenAITranscriber {
    pub fn new(config: TranscriberConfig, media: Arc<dyn MediaProcessorTrait>) -> Self {
        Self { config, media }
    }

    fn build_command(&self, audio_path: &Path, model: &str, output_dir: &Path) -> MediaCommand {
        let mut command = MediaCommand::new(&self.config.binary_path, "Whisper transcription")
            .arg(audio_path.to_string_lossy().to_string())
            .arg("--model").arg(model)
            .arg("--output_dir").arg(output_dir.to_string_lossy().to_string())
            .arg("--output_format").arg("json")
            .arg("--verbose").arg("False");

        if let Some(language) = effective_language(model, self.config.language()) {
            command = command.arg("--language").arg(language);
        }
        command
    }
}

#[async_trait]
impl TranscriberTrait for OpenAITranscriber {
    async fn transcribe(&self, media_path: &Path, model: &str) -> Result<Vec<Segment>> {
        info!("Transcribing {} with whisper model '{}'", media_path.display(), model);

        let work_dir = tempfile::tempdir()
            .map_err(|e| SubsError::Transcription(format!("Failed to create temp directory: {}", e)))?;
        let audio_path = extract_wav(self.media.as_ref(), media_path, work_dir.path()).await?;

        run_engine(self.build_command(&audio_path, model, work_dir.path())).await?;

        let audio_stem = audio_path
            .file_stem()
            .ok_or_else(|| SubsError::Transcription("Invalid audio filename".to_string()))?;
        let json_file = work_dir.path().join(format!("{}.json", audio_stem.to_string_lossy()));
        let output: OpenAIWhisperOutput = read_engine_json(&json_file).await?;

        let segments = OpenAIWhisperMapper::to_segments(output)?;
        info!("Whisper returned {} segments for {}", segments.len(), media_path.display());
        Ok(segments)
    }

    async fn check_availability(&self) -> Result<()> {
        MediaCommand::new(&self.config.binary_path, "Whisper availability check")
            .arg("--help")
            .execute()
            .await
            .map_err(|e| {
                SubsError::Transcription(format!(
                    "OpenAI Whisper not available (install with `pip install openai-whisper`): {}",
                    e
                ))
            })?;
        info!("OpenAI Whisper command-line tool is available");
        Ok(())
    }
}
