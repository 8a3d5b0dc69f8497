//! Finding media files under a root directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, SubsError};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "wmv", "flv", "m4v"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "m4u", "flac", "ogg", "opus", "aac"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Classify a path by its extension, case-insensitively.
pub fn classify<P: AsRef<Path>>(path: P) -> Option<MediaKind> {
    let extension = path.as_ref().extension()?.to_str()?.to_lowercase();
    if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::Video)
    } else if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::Audio)
    } else {
        None
    }
}

/// A supported media file found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    path: PathBuf,
    kind: MediaKind,
    base_name: String,
}

impl MediaFile {
    /// Build a media file from a path, or `None` if the extension is not supported.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let kind = classify(path)?;
        let base_name = path.file_stem()?.to_string_lossy().into_owned();
        Some(Self {
            path: path.to_path_buf(),
            kind,
            base_name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// `<dir>/<base_name>.srt`
    pub fn subtitle_path(&self) -> PathBuf {
        self.directory().join(format!("{}.srt", self.base_name))
    }

    /// `<dir>/<base_name><suffix>.mp4`
    pub fn burned_path(&self, suffix: &str) -> PathBuf {
        self.directory().join(format!("{}{}.mp4", self.base_name, suffix))
    }
}

/// One item produced by a discovery walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveredEntry {
    Media(MediaFile),
    Unsupported(PathBuf),
    Unreadable { path: PathBuf, reason: String },
}

impl DiscoveredEntry {
    pub fn path(&self) -> &Path {
        match self {
            DiscoveredEntry::Media(media) => media.path(),
            DiscoveredEntry::Unsupported(path) => path,
            DiscoveredEntry::Unreadable { path, .. } => path,
        }
    }
}

/// Recursive, deterministic walk over a root directory.
#[derive(Debug, Clone)]
pub struct MediaDiscovery {
    root: PathBuf,
}

impl MediaDiscovery {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(SubsError::InvalidRoot(format!(
                "'{}' does not exist or is not a directory",
                root.display()
            )));
        }
        let root = root
            .canonicalize()
            .map_err(|e| SubsError::InvalidRoot(format!("'{}': {}", root.display(), e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a fresh walk. Entries arrive depth-first with siblings sorted by
    /// name, which is lexicographic order over the full path.
    pub fn entries(&self) -> impl Iterator<Item = DiscoveredEntry> + use<> {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => None,
                Ok(entry) => {
                    let path = entry.into_path();
                    match MediaFile::from_path(&path) {
                        Some(media) => {
                            debug!("Discovered {} file: {}", media.kind(), path.display());
                            Some(DiscoveredEntry::Media(media))
                        }
                        None => Some(DiscoveredEntry::Unsupported(path)),
                    }
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!("Cannot read {}: {}", path.display(), e);
                    Some(DiscoveredEntry::Unreadable {
                        path,
                        reason: e.to_string(),
                    })
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn names(discovery: &MediaDiscovery) -> Vec<String> {
        discovery
            .entries()
            .map(|entry| {
                pathdiff::diff_paths(entry.path(), discovery.root())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_classifies_video_audio_and_unsupported() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.mp4").touch().unwrap();
        temp.child("b.txt").touch().unwrap();
        temp.child("c.wav").touch().unwrap();

        let discovery = MediaDiscovery::new(temp.path()).unwrap();
        let entries: Vec<_> = discovery.entries().collect();
        assert_eq!(entries.len(), 3);

        let media: Vec<_> = entries
            .iter()
            .filter_map(|entry| match entry {
                DiscoveredEntry::Media(media) => Some((media.base_name().to_string(), media.kind())),
                _ => None,
            })
            .collect();
        assert_eq!(
            media,
            vec![("a".to_string(), MediaKind::Video), ("c".to_string(), MediaKind::Audio)]
        );

        let unsupported: Vec<_> = entries
            .iter()
            .filter(|entry| matches!(entry, DiscoveredEntry::Unsupported(_)))
            .collect();
        assert_eq!(unsupported.len(), 1);
        assert!(unsupported[0].path().ends_with("b.txt"));
    }

    #[test]
    fn test_walk_is_recursive_sorted_and_restartable() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("zeta.mp3").touch().unwrap();
        temp.child("talks/b.mkv").touch().unwrap();
        temp.child("talks/a.MP4").touch().unwrap();
        temp.child("alpha.wav").touch().unwrap();

        let discovery = MediaDiscovery::new(temp.path()).unwrap();
        let first = names(&discovery);
        assert_eq!(first, vec!["alpha.wav", "talks/a.MP4", "talks/b.mkv", "zeta.mp3"]);
        assert_eq!(names(&discovery), first);
    }

    #[test]
    fn test_media_paths_are_absolute() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.mp4").touch().unwrap();

        let discovery = MediaDiscovery::new(temp.path()).unwrap();
        for entry in discovery.entries() {
            assert!(entry.path().is_absolute());
        }
    }

    #[test]
    fn test_invalid_root() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("not-a-dir.mp4");
        file.touch().unwrap();

        assert!(matches!(MediaDiscovery::new(file.path()), Err(SubsError::InvalidRoot(_))));
        assert!(matches!(
            MediaDiscovery::new(temp.path().join("missing")),
            Err(SubsError::InvalidRoot(_))
        ));
    }

    #[test]
    fn test_output_paths() {
        let media = MediaFile::from_path("/recordings/standup.mkv").unwrap();
        assert_eq!(media.subtitle_path(), PathBuf::from("/recordings/standup.srt"));
        assert_eq!(
            media.burned_path("_subtitled"),
            PathBuf::from("/recordings/standup_subtitled.mp4")
        );
        assert!(MediaFile::from_path("/recordings/README").is_none());
        assert!(MediaFile::from_path("/recordings/notes.srt").is_none());
    }
}
