// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{collections::HashSet, fs, path::Path};

/// Lines starting with this character are ignored.
pub const COMMENT_MARKER: char = '#';

pub const DEFAULT_NAMES: [&str; 7] = [
    "الشيخ الدكتور عبد الرحمن الناجي",
    "الشيخ عبد الحي البشير",
    "الدكتور عبد الباقي الناجي",
    "الباشمهندس عثمان عباس عبد العاطي",
    "البروفيسور مصطفى محمد الحاج",
    "الأستاذ عبد الرحمن أحمد عثمان",
    "الأخ بابكر محمد إبراهيم عيدروس",
];

/// Unique names in order of their first occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedicationList(Vec<String>);

impl DedicationList {
    #[must_use]
    pub fn builtin() -> Self {
        Self(DEFAULT_NAMES.into_iter().map(ToOwned::to_owned).collect())
    }

    #[must_use]
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut seen = HashSet::new();
        let names = lines
            .into_iter()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
            .filter(|name| seen.insert(*name))
            .map(ToOwned::to_owned)
            .collect();
        Self(names)
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        let Self(names) = self;
        names
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names().is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names().len()
    }
}

impl Default for DedicationList {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Loads the names from a text file with one name per line.
///
/// Falls back to the built-in names if no file is given, if the file
/// could not be read, or if it doesn't contain any names.
#[must_use]
pub fn load(file_path: Option<&Path>) -> DedicationList {
    let Some(file_path) = file_path else {
        return DedicationList::builtin();
    };
    match fs::read_to_string(file_path) {
        Ok(text) => {
            let list = DedicationList::from_lines(text.lines());
            if list.is_empty() {
                log::info!(
                    "No names found in {}, using built-in names",
                    file_path.display()
                );
                return DedicationList::builtin();
            }
            list
        }
        Err(err) => {
            log::warn!(
                "Failed to read names from {}: {err}",
                file_path.display()
            );
            DedicationList::builtin()
        }
    }
}
