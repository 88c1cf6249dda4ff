// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    fmt,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use super::{AssetSource, UploadedFile, is_audio_file_path};

const REPOSITORY_KEY_PREFIX: &str = "repo:";

const UPLOADED_KEY_PREFIX: &str = "upload:";

/// Identifies a candidate across page renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    #[must_use]
    pub fn repository(file_name: &str) -> Self {
        Self(format!("{REPOSITORY_KEY_PREFIX}{file_name}"))
    }

    #[must_use]
    pub fn uploaded(index: usize) -> Self {
        Self(format!("{UPLOADED_KEY_PREFIX}{index}"))
    }

    /// Accepts only keys that could have been created by this type.
    #[must_use]
    pub fn parse(encoded: &str) -> Option<Self> {
        let encoded = encoded.trim();
        if let Some(file_name) = encoded.strip_prefix(REPOSITORY_KEY_PREFIX) {
            return (!file_name.is_empty()).then(|| Self::repository(file_name));
        }
        encoded
            .strip_prefix(UPLOADED_KEY_PREFIX)
            .and_then(|index| index.parse().ok())
            .map(Self::uploaded)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        let Self(encoded) = self;
        encoded
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: AssetKey,
    pub source: AssetSource,
}

impl Candidate {
    #[must_use]
    pub fn label(&self) -> String {
        self.source.identifier()
    }
}

/// Collects all audio files that are directly contained in `dir_path`.
///
/// Subdirectories are not visited. The result is ordered by file name.
/// A missing or unreadable directory results in an empty list.
#[must_use]
pub fn scan_directory(dir_path: &Path) -> Vec<PathBuf> {
    if !dir_path.is_dir() {
        log::debug!("Audio directory {} not available", dir_path.display());
        return Vec::new();
    }
    let file_paths = WalkDir::new(dir_path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|dir_entry| match dir_entry {
            Ok(dir_entry) => Some(dir_entry),
            Err(err) => {
                log::warn!("Skipping directory entry: {err}");
                None
            }
        })
        .filter(|dir_entry| dir_entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| is_audio_file_path(path))
        .collect::<Vec<_>>();
    log::debug!(
        "Found {count} audio file(s) in {dir}",
        count = file_paths.len(),
        dir = dir_path.display()
    );
    file_paths
}

/// All candidates that a visitor could select from.
///
/// Repository files come first followed by the session uploads in
/// upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    candidates: Vec<Candidate>,
}

impl Catalog {
    #[must_use]
    pub fn new(repository_files: Vec<PathBuf>, uploads: &[UploadedFile]) -> Self {
        let repository = repository_files.into_iter().filter_map(|path| {
            let key = AssetKey::repository(path.file_name()?.to_str()?);
            Some(Candidate {
                key,
                source: AssetSource::Repository(path),
            })
        });
        let uploaded = uploads
            .iter()
            .enumerate()
            .map(|(index, upload)| Candidate {
                key: AssetKey::uploaded(index),
                source: AssetSource::Uploaded(upload.clone()),
            });
        Self {
            candidates: repository.chain(uploaded).collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Picks the candidate with the given key or otherwise the first one.
    #[must_use]
    pub fn select(&self, key: Option<&AssetKey>) -> Option<&Candidate> {
        key.and_then(|key| self.candidates.iter().find(|candidate| &candidate.key == key))
            .or_else(|| self.candidates.first())
    }
}
