//! Per-item results and the end-of-run summary.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::discovery::{MediaFile, MediaKind};
use crate::error::{Result, SubsError};

/// Pipeline stage an item was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transcribing,
    Formatting,
    Rendering,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Transcribing => "transcribing",
            Stage::Formatting => "formatting",
            Stage::Rendering => "rendering",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Ok,
    TranscriptionFailed,
    FormatFailed,
    RenderFailed,
    SkippedUnsupported,
    SkippedExisting,
    Unreadable,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 7] = [
        ItemStatus::Ok,
        ItemStatus::TranscriptionFailed,
        ItemStatus::FormatFailed,
        ItemStatus::RenderFailed,
        ItemStatus::SkippedUnsupported,
        ItemStatus::SkippedExisting,
        ItemStatus::Unreadable,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Ok => "ok",
            ItemStatus::TranscriptionFailed => "transcription_failed",
            ItemStatus::FormatFailed => "format_failed",
            ItemStatus::RenderFailed => "render_failed",
            ItemStatus::SkippedUnsupported => "skipped_unsupported",
            ItemStatus::SkippedExisting => "skipped_existing",
            ItemStatus::Unreadable => "unreadable",
        }
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            ItemStatus::TranscriptionFailed => Some(Stage::Transcribing),
            ItemStatus::FormatFailed => Some(Stage::Formatting),
            ItemStatus::RenderFailed => Some(Stage::Rendering),
            _ => None,
        }
    }

    /// Failures the operator should re-run; unreadable entries count too.
    pub fn is_failure(&self) -> bool {
        self.failed_stage().is_some() || *self == ItemStatus::Unreadable
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome for a single discovered entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    pub path: PathBuf,
    pub kind: Option<MediaKind>,
    pub status: ItemStatus,
    pub error: Option<String>,
    pub outputs: Vec<PathBuf>,
}

impl ItemReport {
    pub fn ok(media: &MediaFile, outputs: Vec<PathBuf>) -> Self {
        Self {
            path: media.path().to_path_buf(),
            kind: Some(media.kind()),
            status: ItemStatus::Ok,
            error: None,
            outputs,
        }
    }

    pub fn failed(media: &MediaFile, status: ItemStatus, error: &SubsError) -> Self {
        Self {
            path: media.path().to_path_buf(),
            kind: Some(media.kind()),
            status,
            error: Some(error.to_string()),
            outputs: Vec::new(),
        }
    }

    pub fn skipped_existing(media: &MediaFile) -> Self {
        Self {
            path: media.path().to_path_buf(),
            kind: Some(media.kind()),
            status: ItemStatus::SkippedExisting,
            error: None,
            outputs: Vec::new(),
        }
    }

    pub fn skipped_unsupported(path: PathBuf) -> Self {
        Self {
            path,
            kind: None,
            status: ItemStatus::SkippedUnsupported,
            error: None,
            outputs: Vec::new(),
        }
    }

    pub fn unreadable(path: PathBuf, reason: String) -> Self {
        Self {
            path,
            kind: None,
            status: ItemStatus::Unreadable,
            error: Some(reason),
            outputs: Vec::new(),
        }
    }
}

/// Everything a batch run produced, in discovery order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub root: PathBuf,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub items: Vec<ItemReport>,
}

impl BatchSummary {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            started_at: Local::now(),
            finished_at: None,
            items: Vec::new(),
        }
    }

    pub fn record(&mut self, report: ItemReport) {
        self.items.push(report);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|item| item.status.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    fn display_path<'a>(&self, path: &'a Path) -> std::borrow::Cow<'a, str> {
        match pathdiff::diff_paths(path, &self.root) {
            Some(relative) if !relative.as_os_str().is_empty() => relative.to_string_lossy().into_owned().into(),
            _ => path.to_string_lossy(),
        }
    }

    /// Human-readable summary: counts per status, then every failure with its stage.
    pub fn render(&self) -> String {
        let mut out = format!("Batch summary for {}", self.root.display());
        if let Some(finished_at) = self.finished_at {
            let elapsed = finished_at.signed_duration_since(self.started_at);
            out.push_str(&format!(" ({:.1}s)", elapsed.num_milliseconds() as f64 / 1000.0));
        }
        out.push('\n');

        for status in ItemStatus::ALL {
            out.push_str(&format!("  {:<22} {}\n", status.label(), self.count(status)));
        }

        if self.has_failures() {
            out.push_str("Failures:\n");
            for item in self.failures() {
                let stage = item
                    .status
                    .failed_stage()
                    .map(|stage| stage.to_string())
                    .unwrap_or_else(|| item.status.to_string());
                out.push_str(&format!(
                    "  {} [{}] {}\n",
                    self.display_path(&item.path),
                    stage,
                    item.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
        out
    }

    pub async fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        info!("Wrote batch report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> BatchSummary {
        let mut summary = BatchSummary::new("/rec");
        let talk = MediaFile::from_path("/rec/talk.mp4").unwrap();
        let call = MediaFile::from_path("/rec/2024/call.wav").unwrap();
        summary.record(ItemReport::ok(&talk, vec![PathBuf::from("/rec/talk.srt")]));
        summary.record(ItemReport::skipped_unsupported(PathBuf::from("/rec/notes.txt")));
        summary.record(ItemReport::failed(
            &call,
            ItemStatus::RenderFailed,
            &SubsError::UnsupportedOperation("cannot burn subtitles into audio-only file".to_string()),
        ));
        summary.finish();
        summary
    }

    #[test]
    fn test_counts_and_failures() {
        let summary = summary();
        assert_eq!(summary.count(ItemStatus::Ok), 1);
        assert_eq!(summary.count(ItemStatus::SkippedUnsupported), 1);
        assert_eq!(summary.count(ItemStatus::RenderFailed), 1);
        assert_eq!(summary.failures().count(), 1);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_render_lists_failure_with_stage_and_relative_path() {
        let rendered = summary().render();
        assert!(rendered.contains("  ok                     1\n"));
        assert!(rendered.contains("  render_failed          1\n"));
        let failure_line = format!("  {} [rendering] Unsupported operation", Path::new("2024").join("call.wav").display());
        assert!(rendered.contains(&failure_line), "{rendered}");
    }

    #[test]
    fn test_stage_for_each_failed_status() {
        assert_eq!(ItemStatus::TranscriptionFailed.failed_stage(), Some(Stage::Transcribing));
        assert_eq!(ItemStatus::FormatFailed.failed_stage(), Some(Stage::Formatting));
        assert_eq!(ItemStatus::RenderFailed.failed_stage(), Some(Stage::Rendering));
        assert_eq!(ItemStatus::Ok.failed_stage(), None);
        assert!(ItemStatus::Unreadable.is_failure());
        assert!(!ItemStatus::SkippedUnsupported.is_failure());
    }

    #[tokio::test]
    async fn test_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        summary().write_json(&path).await.unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["items"][0]["status"], "ok");
        assert_eq!(value["items"][0]["kind"], "video");
        assert_eq!(value["items"][2]["status"], "render_failed");
    }
}
