//! Photo index: maps filename stems to uploaded photo content.
//!
//! Stems are the join key against the dataset's identifier column. When two
//! uploads share a stem (`A1.jpg` and `A1.png`), the configured
//! [`DuplicatePolicy`] decides which one the index keeps.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::error::ReportError;

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Merge policy for uploads that share a stem.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The upload processed last replaces earlier ones.
    #[default]
    LastWins,
    /// The first upload for a stem is kept; later ones are ignored.
    FirstWins,
}

/// An uploaded photo file before indexing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl PhotoUpload {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// An indexed photo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoAsset {
    stem: String,
    file_name: String,
    content: Vec<u8>,
}

impl PhotoAsset {
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Returns the file name without its final extension.
pub fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}

/// Read-only stem → photo mapping built once per report.
#[derive(Clone, Debug, Default)]
pub struct PhotoIndex {
    entries: HashMap<String, PhotoAsset>,
}

impl PhotoIndex {
    /// Indexes uploads in the given order under `policy`.
    pub fn build<I>(uploads: I, policy: DuplicatePolicy) -> Self
    where
        I: IntoIterator<Item = PhotoUpload>,
    {
        let mut entries: HashMap<String, PhotoAsset> = HashMap::new();

        for upload in uploads {
            let stem = file_stem(&upload.file_name).to_string();
            let asset = PhotoAsset {
                stem: stem.clone(),
                file_name: upload.file_name,
                content: upload.content,
            };

            match (entries.get(&stem), policy) {
                (Some(existing), DuplicatePolicy::LastWins) => {
                    debug!(
                        "Photo {} shadows {} for stem '{}'",
                        asset.file_name, existing.file_name, stem
                    );
                    entries.insert(stem, asset);
                }
                (Some(existing), DuplicatePolicy::FirstWins) => {
                    debug!(
                        "Photo {} ignored; stem '{}' already taken by {}",
                        asset.file_name, stem, existing.file_name
                    );
                }
                (None, _) => {
                    entries.insert(stem, asset);
                }
            }
        }

        Self { entries }
    }

    /// Reads the given files in order and indexes them.
    pub fn from_paths<I, P>(paths: I, policy: DuplicatePolicy) -> Result<Self, ReportError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let uploads = paths
            .into_iter()
            .map(|path| read_upload(path.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::build(uploads, policy))
    }

    /// Indexes the photos of a directory in file-name order.
    ///
    /// Only regular files with a `.jpg`, `.jpeg` or `.png` extension are considered.
    pub fn from_directory(dir: impl AsRef<Path>, policy: DuplicatePolicy) -> Result<Self, ReportError> {
        let dir = dir.as_ref();
        let paths = photo_files_in(dir)?;
        let index = Self::from_paths(&paths, policy)?;
        info!(
            "Indexed {} photo stem(s) from {} file(s) in {}",
            index.len(),
            paths.len(),
            dir.display()
        );
        Ok(index)
    }

    /// Looks up a photo by row identifier. Matching is exact and case-sensitive.
    pub fn get(&self, id: &str) -> Option<&PhotoAsset> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Photo files of `dir` (not recursive), sorted by file name.
pub fn photo_files_in(dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    let listing = fs::read_dir(dir).map_err(|err| ReportError::io(dir, err))?;
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in listing {
        let path = entry.map_err(|err| ReportError::io(dir, err))?.path();
        if path.is_file() && is_photo(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

fn is_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            PHOTO_EXTENSIONS
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn read_upload(path: &Path) -> Result<PhotoUpload, ReportError> {
    let content = fs::read(path).map_err(|err| ReportError::io(path, err))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(PhotoUpload::new(file_name, content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploads() -> Vec<PhotoUpload> {
        vec![
            PhotoUpload::new("A1.jpg", b"first".to_vec()),
            PhotoUpload::new("B2.png", b"b".to_vec()),
            PhotoUpload::new("A1.png", b"second".to_vec()),
        ]
    }

    #[test]
    fn stem_strips_only_the_last_extension() {
        assert_eq!(file_stem("A1.jpg"), "A1");
        assert_eq!(file_stem("site.v2.png"), "site.v2");
        assert_eq!(file_stem("noext"), "noext");
    }

    #[test]
    fn last_wins_is_deterministic_for_a_fixed_order() {
        let first = PhotoIndex::build(uploads(), DuplicatePolicy::LastWins);
        let second = PhotoIndex::build(uploads(), DuplicatePolicy::LastWins);
        assert_eq!(first.len(), 2);
        assert_eq!(
            first.get("A1").map(PhotoAsset::file_name),
            second.get("A1").map(PhotoAsset::file_name)
        );
        assert_eq!(first.get("A1").unwrap().content(), b"second");
    }

    #[test]
    fn first_wins_keeps_the_earliest_upload() {
        let index = PhotoIndex::build(uploads(), DuplicatePolicy::FirstWins);
        assert_eq!(index.get("A1").unwrap().file_name(), "A1.jpg");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let index = PhotoIndex::build(uploads(), DuplicatePolicy::LastWins);
        assert!(index.contains("B2"));
        assert!(!index.contains("b2"));
        assert!(!index.contains("B2.png"));
    }

    #[test]
    fn extension_filter_ignores_case() {
        assert!(is_photo(Path::new("x/A1.JPG")));
        assert!(is_photo(Path::new("A1.jpeg")));
        assert!(!is_photo(Path::new("notes.txt")));
        assert!(!is_photo(Path::new("README")));
    }
}
