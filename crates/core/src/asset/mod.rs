// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Audio assets and their embeddable representation.
//!
//! An asset originates either from the read-only repository directory
//! or from a buffer that a visitor uploaded into the current session.
//! Both are resolved through [`AssetSource::resolve()`] into an
//! [`AudioAsset`] that owns the complete content. The page embeds
//! the content as a `data:` URL and never refers back to the server
//! for the audio bytes.

use std::{
    borrow::Cow,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use data_encoding::BASE64;
use mime::Mime;

use crate::{Error, Result};

pub mod background;
pub mod catalog;

/// Audio formats recognized by their file extension.
///
/// The content itself is never inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mpeg,
    Wav,
    Ogg,
    Mp4,
}

impl AudioFormat {
    pub const ALL: [Self; 4] = [Self::Mpeg, Self::Wav, Self::Ogg, Self::Mp4];

    /// Used for all files with an unrecognized or missing extension.
    pub const FALLBACK: Self = Self::Mpeg;

    #[must_use]
    pub const fn file_ext(self) -> &'static str {
        match self {
            Self::Mpeg => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Mp4 => "m4a",
        }
    }

    #[must_use]
    pub const fn essence_str(self) -> &'static str {
        match self {
            Self::Mpeg => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Ogg => "audio/ogg",
            Self::Mp4 => "audio/mp4",
        }
    }

    #[must_use]
    pub fn content_type(self) -> Mime {
        self.essence_str()
            .parse()
            .expect("valid audio content type")
    }

    #[must_use]
    pub fn from_file_ext(file_ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.file_ext().eq_ignore_ascii_case(file_ext))
    }

    #[must_use]
    pub fn from_file_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_file_ext)
    }

    #[must_use]
    pub fn from_file_path_or_fallback(path: impl AsRef<Path>) -> Self {
        Self::from_file_path(path).unwrap_or(Self::FALLBACK)
    }
}

/// Checks if a file name carries one of the recognized audio extensions.
#[must_use]
pub fn is_audio_file_path(path: impl AsRef<Path>) -> bool {
    AudioFormat::from_file_path(path).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Repository,
    Uploaded,
}

/// A file that has been uploaded into a session.
///
/// Cloning is cheap, the content is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Repository(PathBuf),
    Uploaded(UploadedFile),
}

impl AssetSource {
    #[must_use]
    pub const fn origin(&self) -> Origin {
        match self {
            Self::Repository(_) => Origin::Repository,
            Self::Uploaded(_) => Origin::Uploaded,
        }
    }

    #[must_use]
    pub fn file_name(&self) -> Cow<'_, str> {
        match self {
            Self::Repository(path) => path
                .file_name()
                .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy()),
            Self::Uploaded(UploadedFile { file_name, .. }) => Cow::Borrowed(file_name),
        }
    }

    /// The file name without its extension.
    #[must_use]
    pub fn identifier(&self) -> String {
        let file_name = self.file_name();
        Path::new(file_name.as_ref())
            .file_stem()
            .map_or_else(|| file_name.to_string(), |stem| stem.to_string_lossy().into_owned())
    }

    /// Reads and classifies the content.
    ///
    /// A repository file that does not exist results in [`Error::NotFound`].
    pub fn resolve(&self) -> Result<AudioAsset> {
        let content = match self {
            Self::Repository(path) => {
                log::debug!("Reading audio file {}", path.display());
                fs::read(path).map(Bytes::from).map_err(|err| {
                    if err.kind() == ErrorKind::NotFound {
                        Error::NotFound(path.clone())
                    } else {
                        Error::Io(err)
                    }
                })?
            }
            Self::Uploaded(UploadedFile { content, .. }) => content.clone(),
        };
        let format = AudioFormat::from_file_path_or_fallback(self.file_name().as_ref());
        Ok(AudioAsset {
            identifier: self.identifier(),
            origin: self.origin(),
            content,
            content_type: format.content_type(),
        })
    }
}

/// A fully resolved audio resource.
///
/// Lives for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    pub identifier: String,
    pub origin: Origin,
    pub content: Bytes,
    pub content_type: Mime,
}

impl AudioAsset {
    #[must_use]
    pub fn to_data_url(&self) -> String {
        encode_data_url(&self.content_type, &self.content)
    }
}

/// Encodes arbitrary content as a `data:` URL with a base64 payload.
#[must_use]
pub fn encode_data_url(content_type: &Mime, content: &[u8]) -> String {
    let payload = BASE64.encode(content);
    format!(
        "data:{content_type};base64,{payload}",
        content_type = content_type.essence_str()
    )
}
