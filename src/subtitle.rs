//! SRT subtitle documents.
//!
//! A [`SubtitleDocument`] owns an ordered, validated and contiguously numbered
//! list of [`Segment`]s. It serialises to the SubRip block format:
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:02,500
//! Hello there
//!
//! 2
//! 00:00:03,000 --> 00:00:04,000
//! General Kenobi
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, SubsError};

const MILLIS_PER_HOUR: u64 = 3_600_000;
const MILLIS_PER_MINUTE: u64 = 60_000;
const MILLIS_PER_SECOND: u64 = 1_000;

/// A span of recognised speech. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    /// Create an unnumbered segment; numbering happens when a document takes ownership.
    pub fn new<S: Into<String>>(start: f64, end: f64, text: S) -> Self {
        Self {
            index: 0,
            start,
            end,
            text: text.into(),
        }
    }
}

/// A point in time with millisecond precision, rendered as `HH:MM:SS,mmm`.
///
/// The hours field is unbounded: 25 hours renders as `25:00:00,000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SrtTimestamp {
    millis: u64,
}

impl SrtTimestamp {
    /// Convert seconds to a timestamp, truncating any sub-millisecond remainder.
    ///
    /// The value is first snapped to the nearest microsecond, so anything
    /// within half a microsecond below a millisecond boundary lands on that
    /// boundary: `1.0009999999` becomes `00:00:01,001`.
    pub fn from_seconds(seconds: f64) -> Result<Self> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(SubsError::MalformedSegment(format!(
                "timestamp must be a non-negative number of seconds, got {}",
                seconds
            )));
        }
        Ok(Self::truncate(seconds))
    }

    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    pub fn as_seconds(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    /// Parse `H+:MM:SS,mmm`. A `.` millisecond separator is accepted too.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || SubsError::SubtitleParse(format!("invalid timestamp '{}'", value));

        let mut parts = value.trim().split(':');
        let (Some(hours), Some(minutes), Some(rest), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let (seconds, millis) = rest
            .split_once(',')
            .or_else(|| rest.split_once('.'))
            .ok_or_else(invalid)?;

        let field = |digits: &str, width: Option<usize>| -> Result<u64> {
            let well_formed = !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit())
                && width.is_none_or(|w| digits.len() == w);
            if !well_formed {
                return Err(invalid());
            }
            digits.parse::<u64>().map_err(|_| invalid())
        };

        let hours = field(hours, None)?;
        let minutes = field(minutes, Some(2))?;
        let seconds = field(seconds, Some(2))?;
        let millis = field(millis, Some(3))?;
        if minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }

        let total = hours
            .checked_mul(MILLIS_PER_HOUR)
            .and_then(|ms| ms.checked_add(minutes * MILLIS_PER_MINUTE + seconds * MILLIS_PER_SECOND + millis))
            .ok_or_else(invalid)?;
        Ok(Self::from_millis(total))
    }

    // Snap to whole microseconds first so that e.g. 3723.456 (stored as
    // 3723.45599999...) does not lose a millisecond, then truncate.
    fn truncate(seconds: f64) -> Self {
        let micros = (seconds * 1_000_000.0).round() as u64;
        Self { millis: micros / 1_000 }
    }
}

impl fmt::Display for SrtTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.millis / MILLIS_PER_HOUR;
        let minutes = (self.millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
        let secs = (self.millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
        let millis = self.millis % MILLIS_PER_SECOND;
        write!(f, "{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }
}

/// Ordered, validated subtitle cues for one media file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtitleDocument {
    segments: Vec<Segment>,
}

impl SubtitleDocument {
    /// Validate segments and renumber them 1..N in the order received.
    ///
    /// Any index supplied by the caller is discarded. A segment whose start is
    /// after its end, or whose times are negative or not finite, rejects the
    /// whole document; nothing is corrected silently.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self> {
        let mut segments = segments;
        for (position, segment) in segments.iter_mut().enumerate() {
            validate_segment(position + 1, segment)?;
            segment.index = position + 1;
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Serialise to SRT. An empty document yields an empty string.
    pub fn to_srt(&self) -> String {
        self.segments
            .iter()
            .map(|segment| {
                format!(
                    "{}\n{} --> {}\n{}\n",
                    segment.index,
                    SrtTimestamp::truncate(segment.start),
                    SrtTimestamp::truncate(segment.end),
                    segment.text.replace('\r', "")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse SRT text back into a document, renumbering cues from 1.
    pub fn parse_srt(content: &str) -> Result<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content).replace('\r', "");
        let mut lines = content.lines().enumerate().peekable();
        let mut segments = Vec::new();

        loop {
            // Skip separators; tolerate more than one blank line between cues.
            while lines.next_if(|(_, line)| line.trim().is_empty()).is_some() {}

            let Some((line_no, index_line)) = lines.next() else {
                break;
            };
            if index_line.trim().parse::<usize>().is_err() {
                return Err(SubsError::SubtitleParse(format!(
                    "line {}: expected cue number, found '{}'",
                    line_no + 1,
                    index_line
                )));
            }

            let (line_no, timing_line) = lines.next().ok_or_else(|| {
                SubsError::SubtitleParse(format!("line {}: cue has no timing line", line_no + 1))
            })?;
            let (start, end) = parse_timing_line(timing_line).map_err(|e| {
                SubsError::SubtitleParse(format!("line {}: {}", line_no + 1, e))
            })?;

            let mut text_lines = Vec::new();
            while let Some((_, line)) = lines.next_if(|(_, line)| !line.trim().is_empty()) {
                text_lines.push(line);
            }

            segments.push(Segment::new(start.as_seconds(), end.as_seconds(), text_lines.join("\n")));
        }

        Self::from_segments(segments)
    }
}

fn validate_segment(position: usize, segment: &Segment) -> Result<()> {
    let start = SrtTimestamp::from_seconds(segment.start)
        .map_err(|e| SubsError::MalformedSegment(format!("segment {}: start {}", position, e)))?;
    let end = SrtTimestamp::from_seconds(segment.end)
        .map_err(|e| SubsError::MalformedSegment(format!("segment {}: end {}", position, e)))?;

    // A blank line ends a cue in SRT, so it cannot appear inside one.
    let text = segment.text.replace('\r', "");
    if !text.is_empty() && text.split('\n').any(|line| line.trim().is_empty()) {
        return Err(SubsError::MalformedSegment(format!(
            "segment {}: text contains a blank line",
            position
        )));
    }

    if segment.start > segment.end {
        return Err(SubsError::MalformedSegment(format!(
            "segment {}: start {} is after end {}",
            position, start, end
        )));
    }
    Ok(())
}

fn parse_timing_line(line: &str) -> Result<(SrtTimestamp, SrtTimestamp)> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| SubsError::SubtitleParse(format!("expected timing line, found '{}'", line)))?;
    // Some writers append positioning hints after the end time.
    let end = rest.split_whitespace().next().unwrap_or_default();
    Ok((SrtTimestamp::parse(start)?, SrtTimestamp::parse(end)?))
}

/// Write a document so that `output_path` only ever holds a complete file.
///
/// The content goes to a temporary file in the same directory, is flushed to
/// disk, and is then renamed over the destination.
pub async fn write_srt_atomic<P: AsRef<Path>>(document: &SubtitleDocument, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref().to_path_buf();
    info!("Generating SRT file: {} ({} cues)", output_path.display(), document.len());

    let content = document.to_srt();
    let written = tokio::task::spawn_blocking(move || persist_atomically(&output_path, content.as_bytes()))
        .await
        .map_err(|e| SubsError::Io(std::io::Error::other(e)))?;
    written?;

    debug!("SRT file generated successfully");
    Ok(())
}

fn persist_atomically(output_path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = output_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(".subsweep-")
        .suffix(".srt.tmp")
        .tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(output_path).map_err(|e| SubsError::Io(e.error))?;
    Ok(())
}

/// Read and validate an existing SRT file.
pub async fn read_srt<P: AsRef<Path>>(path: P) -> Result<SubtitleDocument> {
    let content = fs::read_to_string(path.as_ref()).await?;
    SubtitleDocument::parse_srt(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(seconds: f64) -> String {
        SrtTimestamp::from_seconds(seconds).unwrap().to_string()
    }

    fn sample_segments() -> Vec<Segment> {
        vec![
            Segment::new(0.0, 1.5, "Good morning everyone"),
            Segment::new(1.5, 4.25, "Let's get started"),
            Segment::new(4.25, 7.0, "First item\non the agenda"),
        ]
    }

    #[test]
    fn test_format_srt_time() {
        assert_eq!(ts(0.0), "00:00:00,000");
        assert_eq!(ts(65.123), "00:01:05,123");
        assert_eq!(ts(3661.500), "01:01:01,500");
        assert_eq!(ts(3723.456), "01:02:03,456");
    }

    #[test]
    fn test_hours_do_not_wrap_past_a_day() {
        assert_eq!(ts(25.0 * 3600.0 + 0.001), "25:00:00,001");
        assert_eq!(ts(100.0 * 3600.0), "100:00:00,000");
    }

    #[test]
    fn test_sub_millisecond_remainder_is_truncated() {
        assert_eq!(ts(1.0009), "00:00:01,000");
        assert_eq!(ts(1.9999), "00:00:01,999");
        assert_eq!(ts(0.0004), "00:00:00,000");
    }

    #[test]
    fn test_negative_and_non_finite_times_are_rejected() {
        assert!(matches!(SrtTimestamp::from_seconds(-0.5), Err(SubsError::MalformedSegment(_))));
        assert!(matches!(SrtTimestamp::from_seconds(f64::NAN), Err(SubsError::MalformedSegment(_))));
        assert!(matches!(SrtTimestamp::from_seconds(f64::INFINITY), Err(SubsError::MalformedSegment(_))));
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(SrtTimestamp::parse("01:02:03,456").unwrap().as_millis(), 3_723_456);
        assert_eq!(SrtTimestamp::parse("25:00:00,001").unwrap().as_millis(), 90_000_001);
        assert_eq!(SrtTimestamp::parse("00:00:01.250").unwrap().as_millis(), 1_250);
        assert!(SrtTimestamp::parse("00:61:00,000").is_err());
        assert!(SrtTimestamp::parse("00:00:00").is_err());
        assert!(SrtTimestamp::parse("0:0:0,0").is_err());
    }

    #[test]
    fn test_parse_timestamp_with_huge_hours_is_an_error() {
        assert!(matches!(
            SrtTimestamp::parse("99999999999999999:00:00,000"),
            Err(SubsError::SubtitleParse(_))
        ));
        assert!(matches!(
            SubtitleDocument::parse_srt("1\n99999999999999999:00:00,000 --> 99999999999999999:00:01,000\nlate\n"),
            Err(SubsError::SubtitleParse(_))
        ));
    }

    #[test]
    fn test_snapping_to_microseconds_before_truncation() {
        assert_eq!(ts(1.0009999999), "00:00:01,001");
        assert_eq!(ts(1.0009990), "00:00:01,000");
    }

    #[test]
    fn test_document_layout() {
        let document = SubtitleDocument::from_segments(sample_segments()).unwrap();
        assert_eq!(
            document.to_srt(),
            "1\n00:00:00,000 --> 00:00:01,500\nGood morning everyone\n\
             \n\
             2\n00:00:01,500 --> 00:00:04,250\nLet's get started\n\
             \n\
             3\n00:00:04,250 --> 00:00:07,000\nFirst item\non the agenda\n"
        );
    }

    #[test]
    fn test_adapter_indices_are_replaced() {
        let mut segments = sample_segments();
        segments[0].index = 7;
        segments[1].index = 7;
        segments[2].index = 42;

        let document = SubtitleDocument::from_segments(segments).unwrap();
        let indices: Vec<usize> = document.segments().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_carriage_returns_are_stripped() {
        let document =
            SubtitleDocument::from_segments(vec![Segment::new(0.0, 1.0, "line one\r\nline two\r")]).unwrap();
        assert_eq!(document.to_srt(), "1\n00:00:00,000 --> 00:00:01,000\nline one\nline two\n");
    }

    #[test]
    fn test_empty_document_is_valid_and_empty() {
        let document = SubtitleDocument::from_segments(Vec::new()).unwrap();
        assert!(document.is_empty());
        assert_eq!(document.to_srt(), "");
    }

    #[test]
    fn test_start_after_end_is_rejected() {
        let segments = vec![
            Segment::new(0.0, 1.0, "fine"),
            Segment::new(5.0, 4.0, "backwards"),
        ];
        let err = SubtitleDocument::from_segments(segments).unwrap_err();
        match err {
            SubsError::MalformedSegment(message) => assert!(message.starts_with("segment 2")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_lines_inside_cue_text_are_rejected() {
        for text in ["para one\n\npara two", "\nleading", "  ", "trailing\n", "gap\r\n\r\nhere"] {
            let err = SubtitleDocument::from_segments(vec![
                Segment::new(0.0, 1.0, text),
                Segment::new(1.0, 2.0, "next"),
            ])
            .unwrap_err();
            assert!(matches!(err, SubsError::MalformedSegment(_)), "{text:?}");
        }
    }

    #[test]
    fn test_multi_line_and_empty_text_survive_parsing() {
        let original = SubtitleDocument::from_segments(vec![
            Segment::new(0.0, 1.0, "para one\npara two"),
            Segment::new(1.0, 2.0, ""),
            Segment::new(2.0, 3.0, "next"),
        ])
        .unwrap();

        let reparsed = SubtitleDocument::parse_srt(&original.to_srt()).unwrap();
        let texts: Vec<&str> = reparsed.segments().iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["para one\npara two", "", "next"]);
        assert_eq!(reparsed.to_srt(), original.to_srt());
    }

    #[test]
    fn test_zero_length_segment_is_accepted() {
        let document = SubtitleDocument::from_segments(vec![Segment::new(2.0, 2.0, "blip")]).unwrap();
        assert_eq!(document.len(), 1);
    }

    #[test]
    fn test_round_trip_preserves_timing_and_text() {
        let original = SubtitleDocument::from_segments(vec![
            Segment::new(0.25, 1.75, "one"),
            Segment::new(3600.0, 3601.123, "two\nlines"),
            Segment::new(90_000.001, 90_002.0, "after a day"),
        ])
        .unwrap();

        let reparsed = SubtitleDocument::parse_srt(&original.to_srt()).unwrap();
        assert_eq!(reparsed.len(), original.len());
        for (a, b) in original.segments().iter().zip(reparsed.segments()) {
            assert_eq!(SrtTimestamp::truncate(a.start), SrtTimestamp::truncate(b.start));
            assert_eq!(SrtTimestamp::truncate(a.end), SrtTimestamp::truncate(b.end));
            assert_eq!(a.text, b.text);
        }
        assert_eq!(reparsed.to_srt(), original.to_srt());
    }

    #[test]
    fn test_parse_renumbers_and_tolerates_crlf_and_bom() {
        let content = "\u{feff}5\r\n00:00:01,000 --> 00:00:02,000\r\nHello\r\n\r\n\r\n9\r\n00:00:03,000 --> 00:00:04,000 X1:10\r\nWorld\r\n";
        let document = SubtitleDocument::parse_srt(content).unwrap();
        let segments = document.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].index, 1);
        assert_eq!(segments[1].index, 2);
        assert_eq!(segments[1].text, "World");
        assert_eq!(segments[1].start, 3.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            SubtitleDocument::parse_srt("hello\nworld\n"),
            Err(SubsError::SubtitleParse(_))
        ));
        assert!(matches!(
            SubtitleDocument::parse_srt("1\n00:00:01,000 -> 00:00:02,000\ntext\n"),
            Err(SubsError::SubtitleParse(_))
        ));
        assert!(matches!(
            SubtitleDocument::parse_srt("1\n00:00:03,000 --> 00:00:02,000\ntext\n"),
            Err(SubsError::MalformedSegment(_))
        ));
    }

    #[tokio::test]
    async fn test_atomic_write_leaves_only_the_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture.srt");
        let document = SubtitleDocument::from_segments(sample_segments()).unwrap();

        write_srt_atomic(&document, &path).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), document.to_srt());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("lecture.srt")]);

        let reread = read_srt(&path).await.unwrap();
        assert_eq!(reread.to_srt(), document.to_srt());
    }

    #[tokio::test]
    async fn test_atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meeting.srt");
        std::fs::write(&path, "stale").unwrap();

        write_srt_atomic(&SubtitleDocument::default(), &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
