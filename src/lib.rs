//! Subsweep - batch subtitle generation
//!
//! Walks a directory tree, transcribes every audio and video file with a
//! whisper engine, writes a SubRip `.srt` next to each source and optionally
//! burns the subtitles into a copy of each video with ffmpeg.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod media;
pub mod render;
pub mod report;
pub mod subtitle;
pub mod transcribe;
pub mod workflow;
