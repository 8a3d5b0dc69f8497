use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Generate .srt subtitles for every audio and video file under a directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Root directory to scan recursively
    #[arg(long)]
    pub root: PathBuf,

    /// Transcription model size (tiny, base, small, medium, large, ...)
    #[arg(long)]
    pub model: Option<String>,

    /// Only write .srt files; pass `false` to also burn subtitles into videos
    #[arg(long = "srt_only", default_value_t = true, action = ArgAction::Set)]
    pub srt_only: bool,

    /// Leave files whose outputs already exist
    #[arg(long = "skip_existing")]
    pub skip_existing: bool,

    /// Language hint for the transcription engine (e.g. en, ja)
    #[arg(long)]
    pub language: Option<String>,

    /// Write the batch summary as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn burn_in(&self) -> bool {
        !self.srt_only
    }
}
