use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, SubsError};
use crate::media::{MediaCommand, MediaProcessorTrait};
use crate::subtitle::Segment;

/// Trait for converting engine-specific JSON output into segments
pub trait TranscriptionMapper<T> {
    fn to_segments(engine_output: T) -> Result<Vec<Segment>>;
}

/// Clean up raw engine segments before they reach the formatter.
///
/// Text is trimmed, `-->` is defused so it cannot be mistaken for a timing
/// line, blank lines inside a cue are dropped, and cues left without text are
/// removed. Order is preserved.
pub fn sanitize_segments<I>(raw: I) -> Vec<Segment>
where
    I: IntoIterator<Item = Segment>,
{
    raw.into_iter()
        .filter_map(|mut segment| {
            let text = segment
                .text
                .replace('\r', "")
                .replace("-->", "->")
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if text.is_empty() {
                debug!("Dropping empty segment at {:.3}s", segment.start);
                return None;
            }
            segment.text = text;
            Some(segment)
        })
        .collect()
}

/// Language to request from the engine.
///
/// English-only models (`*.en`) always get `en`.
pub fn effective_language<'a>(model: &str, configured: Option<&'a str>) -> Option<&'a str> {
    if model.ends_with(".en") {
        match configured {
            Some(language) if language != "en" => {
                warn!("{} is an English-only model; ignoring language '{}' and forcing English", model, language);
            }
            None => warn!("{} is an English-only model; forcing English detection", model),
            _ => {}
        }
        return Some("en");
    }
    configured
}

/// Extract whisper-ready audio from `media_path` into `work_dir`.
pub async fn extract_wav(
    media: &dyn MediaProcessorTrait,
    media_path: &Path,
    work_dir: &Path,
) -> Result<PathBuf> {
    let stem = media_path
        .file_stem()
        .ok_or_else(|| SubsError::Transcription(format!("Invalid media filename: {}", media_path.display())))?;
    let wav_path = work_dir.join(format!("{}.wav", stem.to_string_lossy()));

    media
        .extract_audio(media_path, &wav_path)
        .await
        .map_err(|e| SubsError::Transcription(format!("Audio extraction failed: {}", e)))?;

    Ok(wav_path)
}

/// Run an engine command, reporting any failure as a transcription error.
pub async fn run_engine(command: MediaCommand) -> Result<()> {
    command
        .execute()
        .await
        .map(|_| ())
        .map_err(|e| SubsError::Transcription(e.to_string()))
}

/// Read and deserialize the engine's JSON output file.
pub async fn read_engine_json<T: serde::de::DeserializeOwned>(json_path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(json_path).await.map_err(|e| {
        SubsError::Transcription(format!("Failed to read engine output {}: {}", json_path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        SubsError::Transcription(format!("Failed to parse engine output {}: {}", json_path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMediaProcessorTrait;

    #[test]
    fn test_sanitize_trims_defuses_and_drops_empty() {
        let raw = vec![
            Segment::new(0.0, 1.0, " Hello there "),
            Segment::new(1.0, 2.0, "   "),
            Segment::new(2.0, 3.0, "a --> b"),
            Segment::new(3.0, 4.0, "first\r\n\n  second "),
        ];
        let cleaned = sanitize_segments(raw);
        let texts: Vec<&str> = cleaned.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello there", "a -> b", "first\nsecond"]);
        assert_eq!(cleaned[2].start, 3.0);
    }

    #[test]
    fn test_effective_language() {
        assert_eq!(effective_language("small", None), None);
        assert_eq!(effective_language("small", Some("de")), Some("de"));
        assert_eq!(effective_language("medium.en", None), Some("en"));
        assert_eq!(effective_language("medium.en", Some("de")), Some("en"));
    }

    #[tokio::test]
    async fn test_extract_wav_targets_work_dir() {
        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_extract_audio()
            .withf(|input, output| {
                input.to_path_buf() == PathBuf::from("/rec/talk.mkv")
                    && output.to_path_buf() == PathBuf::from("/work/talk.wav")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let wav = extract_wav(&media, Path::new("/rec/talk.mkv"), Path::new("/work")).await.unwrap();
        assert_eq!(wav, PathBuf::from("/work/talk.wav"));
    }

    #[tokio::test]
    async fn test_extraction_failure_is_a_transcription_error() {
        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_extract_audio()
            .returning(|_, _| Err(SubsError::Media("no audio stream".to_string())));

        let err = extract_wav(&media, Path::new("/rec/silent.mp4"), Path::new("/work"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubsError::Transcription(message) if message.contains("no audio stream")));
    }

    #[tokio::test]
    async fn test_unparseable_engine_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result: Result<serde_json::Value> = read_engine_json(&path).await;
        assert!(matches!(result, Err(SubsError::Transcription(_))));

        let missing: Result<serde_json::Value> = read_engine_json(&dir.path().join("missing.json")).await;
        assert!(matches!(missing, Err(SubsError::Transcription(_))));
    }
}
