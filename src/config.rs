use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::error::{Result, SubsError};

fn default_burn_suffix() -> String {
    "_subtitled".to_string()
}

fn default_outline_colour() -> String {
    "&H40000000".to_string()
}

fn default_border_style() -> u8 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub media: MediaConfig,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Which engine to drive
    pub implementation: TranscriberImplementation,
    /// Path to transcriber binary (e.g., whisper or whisper-cli)
    pub binary_path: String,
    /// Directory holding ggml model files (whisper.cpp only)
    pub models_dir: String,
    /// Source language hint; empty means auto-detect
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriberImplementation {
    /// OpenAI Whisper command-line tool
    OpenAI,
    /// whisper.cpp `whisper-cli`
    WhisperCpp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Video encoder used when burning subtitles
    pub video_codec: String,
    /// Additional encoding options for subtitle burn-in
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    /// - preset: encoding speed (ultrafast, fast, medium, slow, veryslow)
    /// - crf: quality (0-51, lower = better quality, 23 is default)
    /// - pix_fmt: pixel format for compatibility
    pub subtitle_options: Vec<String>,
    /// Appended to the base name of burned-in videos
    #[serde(default = "default_burn_suffix")]
    pub burn_suffix: String,
    /// ASS colour for the subtitle box outline
    #[serde(default = "default_outline_colour")]
    pub outline_colour: String,
    /// ASS border style (3 = opaque box)
    #[serde(default = "default_border_style")]
    pub border_style: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Model size handed to the engine when --model is not given
    pub default_model: String,
    /// Leave items alone whose outputs already exist and are valid
    pub skip_existing: bool,
    /// Per-attempt transcription timeout in seconds (0 = none)
    pub transcribe_timeout_secs: u64,
    /// Encode timeout in seconds (0 = none)
    pub encode_timeout_secs: u64,
    /// Extra transcription attempts after a failure
    pub max_retries: u32,
}

impl WorkflowConfig {
    pub fn transcribe_timeout(&self) -> Option<Duration> {
        (self.transcribe_timeout_secs > 0).then(|| Duration::from_secs(self.transcribe_timeout_secs))
    }

    pub fn encode_timeout(&self) -> Option<Duration> {
        (self.encode_timeout_secs > 0).then(|| Duration::from_secs(self.encode_timeout_secs))
    }
}

impl TranscriberConfig {
    pub fn language(&self) -> Option<&str> {
        let language = self.language.trim();
        (!language.is_empty()).then_some(language)
    }
}

impl MediaConfig {
    /// `force_style` value for the ffmpeg subtitles filter
    pub fn force_style(&self) -> String {
        format!("OutlineColour={},BorderStyle={}", self.outline_colour, self.border_style)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transcriber: TranscriberConfig {
                implementation: TranscriberImplementation::OpenAI,
                binary_path: "whisper".to_string(),
                models_dir: "models".to_string(),
                language: String::new(),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                video_codec: "libx264".to_string(),
                subtitle_options: vec![
                    // Example encoding options users can customize:
                    // "-preset".to_string(), "medium".to_string(),
                    // "-crf".to_string(), "23".to_string(),
                ],
                burn_suffix: default_burn_suffix(),
                outline_colour: default_outline_colour(),
                border_style: default_border_style(),
            },
            workflow: WorkflowConfig {
                default_model: "small".to_string(),
                skip_existing: false,
                transcribe_timeout_secs: 0,
                encode_timeout_secs: 0,
                max_retries: 0,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubsError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubsError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubsError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
