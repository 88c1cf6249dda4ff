// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{fmt, num::NonZeroU64};

use serde::{Deserialize, Serialize};

/// Number of consecutive playthroughs, at least 1.
///
/// There is no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepeatCount(NonZeroU64);

impl RepeatCount {
    pub const MIN: Self = Self(NonZeroU64::MIN);

    pub const DEFAULT: Self = Self::from_const(100);

    const fn from_const(value: u64) -> Self {
        match NonZeroU64::new(value) {
            Some(value) => Self(value),
            None => panic!("zero repeat count"),
        }
    }

    #[must_use]
    pub const fn new(value: u64) -> Option<Self> {
        match NonZeroU64::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Values less than 1 are raised to 1.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        u64::try_from(value)
            .ok()
            .and_then(Self::new)
            .unwrap_or(Self::MIN)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        let Self(value) = self;
        value.get()
    }
}

impl Default for RepeatCount {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for RepeatCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// The fixed choices that are offered next to the manual entry.
pub const PRESETS: [RepeatCount; 6] = [
    RepeatCount::from_const(10),
    RepeatCount::from_const(100),
    RepeatCount::from_const(1000),
    RepeatCount::from_const(2000),
    RepeatCount::from_const(3000),
    RepeatCount::from_const(4000),
];

#[must_use]
pub fn preset(value: u64) -> Option<RepeatCount> {
    PRESETS.into_iter().find(|preset| preset.get() == value)
}

/// The repeat count of a single visitor.
///
/// Both mutators replace the current value unconditionally, the
/// most recent one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatCountState {
    value: RepeatCount,
}

impl RepeatCountState {
    #[must_use]
    pub const fn new(initial_value: RepeatCount) -> Self {
        Self {
            value: initial_value,
        }
    }

    #[must_use]
    pub const fn current_value(&self) -> RepeatCount {
        self.value
    }

    /// Only accepts one of the [`PRESETS`].
    ///
    /// Returns the new value or `None` if the value has been rejected.
    pub fn set_from_preset(&mut self, value: u64) -> Option<RepeatCount> {
        let preset = preset(value)?;
        self.value = preset;
        Some(preset)
    }

    pub fn set_from_manual_entry(&mut self, value: i64) -> RepeatCount {
        self.value = RepeatCount::clamped(value);
        self.value
    }

    /// Parses the raw text of the manual entry field.
    ///
    /// Input that is not an integer number is ignored and leaves
    /// the state unchanged.
    pub fn set_from_manual_input(&mut self, input: &str) -> Option<RepeatCount> {
        let value = input.trim().parse::<i64>().ok()?;
        Some(self.set_from_manual_entry(value))
    }
}

impl Default for RepeatCountState {
    fn default() -> Self {
        Self::new(RepeatCount::DEFAULT)
    }
}
