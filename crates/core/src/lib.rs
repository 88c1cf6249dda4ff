// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

#![warn(rust_2018_idioms)]
#![warn(rustdoc::broken_intra_doc_links)]

use std::{io::Error as IoError, path::PathBuf, result::Result as StdResult};

use thiserror::Error;

pub mod asset;
pub mod dedication;
pub mod playback;
pub mod repeat;

#[derive(Error, Debug)]
pub enum Error {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = StdResult<T, Error>;
