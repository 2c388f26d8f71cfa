use crate::model::UploadFile;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

const AUDIO_MEDIA_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("flac", "audio/flac"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("opus", "audio/opus"),
];

const OPAQUE_MEDIA_TYPE: &str = "application/octet-stream";
const URL_SCHEME: &str = "blob:harmony/";

/// Outcome of one `add_songs` batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Files whose declared media type was audio.
    pub total_eligible: usize,
    pub accepted: usize,
    /// Eligible files dropped as duplicates of the catalog or the batch.
    pub skipped: usize,
    /// Non-audio files, ignored before duplicate detection.
    pub rejected: usize,
}

impl UploadReport {
    pub fn nothing_eligible(&self) -> bool {
        self.total_eligible == 0
    }

    pub fn message(&self) -> String {
        if self.nothing_eligible() {
            return String::from("No audio files selected.");
        }

        match (self.accepted, self.skipped) {
            (0, skipped) => {
                format!("{skipped} duplicate file(s) were skipped; no new files were added.")
            }
            (added, 0) => format!("{added} file(s) added."),
            (added, skipped) => {
                format!("{added} file(s) added. {skipped} duplicate file(s) were skipped.")
            }
        }
    }
}

/// Registry of playable URLs handed out for uploaded files.
///
/// Every URL created here stays live until `revoke` is called for it.
#[derive(Debug, Default)]
pub struct BlobUrls {
    next: u64,
    live: HashMap<String, PathBuf>,
}

impl BlobUrls {
    pub fn create(&mut self, file: &UploadFile) -> String {
        self.next += 1;
        let url = format!("{URL_SCHEME}{}", self.next);
        self.live.insert(url.clone(), file.source.clone());
        url
    }

    pub fn revoke(&mut self, url: &str) -> bool {
        self.live.remove(url).is_some()
    }

    pub fn resolve(&self, url: &str) -> Option<&Path> {
        self.live.get(url).map(PathBuf::as_path)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

/// Default song title: the file name without its final extension.
pub fn title_from_file_name(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    };

    if stem.is_empty() {
        name.to_string()
    } else {
        stem.to_string()
    }
}

pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_MEDIA_TYPES
        .iter()
        .find(|(supported, _)| ext.eq_ignore_ascii_case(supported))
        .map(|(_, media_type)| *media_type)
        .unwrap_or(OPAQUE_MEDIA_TYPE)
}

pub fn upload_from_path(path: &Path) -> Result<UploadFile> {
    let metadata =
        fs::metadata(path).with_context(|| format!("failed to stat {}", path.display()))?;
    let last_modified = metadata
        .modified()
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|since| since.as_millis() as i64)
        .unwrap_or(0);
    let name = path
        .file_name()
        .map(|file| file.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(UploadFile {
        name,
        media_type: media_type_for_path(path).to_string(),
        size: metadata.len(),
        last_modified,
        source: path.to_path_buf(),
    })
}

/// Turns every regular file under `root` into an upload batch entry.
///
/// Non-audio files are kept so the catalog can count them as rejected.
pub fn scan_folder(root: &Path) -> Vec<UploadFile> {
    let mut batch = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }

        match upload_from_path(entry.path()) {
            Ok(file) => batch.push(file),
            Err(err) => tracing::debug!("skipping unreadable file: {err:#}"),
        }
    }

    batch.sort_by(|a, b| a.source.cmp(&b.source));
    batch
}

pub fn scan_many(roots: &[PathBuf]) -> Vec<UploadFile> {
    let mut batch = Vec::new();
    for root in roots {
        batch.extend(scan_folder(root));
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scan_keeps_non_audio_files_with_opaque_type() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("song.mp3"), b"abc").expect("write");
        fs::write(dir.path().join("notes.txt"), b"hello").expect("write");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");
        fs::write(dir.path().join("nested").join("b.FLAC"), b"x").expect("write");

        let batch = scan_folder(dir.path());
        let types: Vec<(&str, &str)> = batch
            .iter()
            .map(|file| (file.name.as_str(), file.media_type.as_str()))
            .collect();

        assert_eq!(
            types,
            vec![
                ("b.FLAC", "audio/flac"),
                ("notes.txt", OPAQUE_MEDIA_TYPE),
                ("song.mp3", "audio/mpeg"),
            ]
        );
        let song = batch.iter().find(|file| file.name == "song.mp3").expect("song");
        assert_eq!(song.size, 3);
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempdir().expect("tempdir");
        assert!(upload_from_path(&dir.path().join("gone.mp3")).is_err());
    }

    #[test]
    fn title_strips_only_last_extension() {
        assert_eq!(title_from_file_name("track.mp3"), "track");
        assert_eq!(title_from_file_name("a.b.flac"), "a.b");
        assert_eq!(title_from_file_name("no_extension"), "no_extension");
        assert_eq!(title_from_file_name("trailing."), "trailing.");
        assert_eq!(title_from_file_name(".mp3"), ".mp3");
    }

    #[test]
    fn report_messages_cover_each_outcome() {
        let none = UploadReport {
            rejected: 2,
            ..UploadReport::default()
        };
        assert_eq!(none.message(), "No audio files selected.");

        let dupes = UploadReport {
            total_eligible: 2,
            skipped: 2,
            ..UploadReport::default()
        };
        assert_eq!(
            dupes.message(),
            "2 duplicate file(s) were skipped; no new files were added."
        );

        let mixed = UploadReport {
            total_eligible: 3,
            accepted: 2,
            skipped: 1,
            rejected: 0,
        };
        assert_eq!(
            mixed.message(),
            "2 file(s) added. 1 duplicate file(s) were skipped."
        );

        let clean = UploadReport {
            total_eligible: 1,
            accepted: 1,
            ..UploadReport::default()
        };
        assert_eq!(clean.message(), "1 file(s) added.");
    }

    #[test]
    fn revoked_urls_stop_resolving() {
        let mut urls = BlobUrls::default();
        let file = UploadFile {
            name: String::from("a.mp3"),
            media_type: String::from("audio/mpeg"),
            size: 1,
            last_modified: 0,
            source: PathBuf::from("/music/a.mp3"),
        };
        let first = urls.create(&file);
        let second = urls.create(&file);
        assert_ne!(first, second);
        assert_eq!(urls.resolve(&first), Some(Path::new("/music/a.mp3")));

        assert!(urls.revoke(&first));
        assert!(!urls.revoke(&first));
        assert_eq!(urls.resolve(&first), None);
        assert_eq!(urls.live_count(), 1);
    }
}
