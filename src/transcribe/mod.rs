// Speech-to-text engines behind a common trait
//
// - OpenAI: the `whisper` Python command-line tool
// - WhisperCpp: the whisper.cpp `whisper-cli` binary
//
// Both extract a 16 kHz mono WAV through the media processor, run the engine
// into a temporary directory, and map its JSON output to segments. To add an
// engine, deserialize its output, implement TranscriptionMapper for it, and
// register it in TranscriberFactory.

pub mod common;
pub mod openai;
pub mod whisper_cpp;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use common::*;
use crate::config::{TranscriberConfig, TranscriberImplementation};
use crate::error::Result;
use crate::media::MediaProcessorTrait;
use crate::subtitle::Segment;

/// Main trait for transcription operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriberTrait: Send + Sync {
    /// Transcribe a media file into segments in playback order.
    /// `model` is handed to the engine untouched.
    async fn transcribe(&self, media_path: &Path, model: &str) -> Result<Vec<Segment>>;

    /// Check the engine can be run
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_transcriber(
        config: TranscriberConfig,
        media: Arc<dyn MediaProcessorTrait>,
    ) -> Box<dyn TranscriberTrait> {
        match config.implementation {
            TranscriberImplementation::OpenAI => Box::new(openai::OpenAITranscriber::new(config, media)),
            TranscriberImplementation::WhisperCpp => {
                Box::new(whisper_cpp::WhisperCppTranscriber::new(config, media))
            }
        }
    }
}
