// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The repeat loop of the playback unit.
//!
//! The loop runs in the browser and is recreated from scratch whenever
//! the page is rendered. [`LoopState`] models the state machine that
//! the rendered script executes, including the optional restoration
//! of a [`LoopSnapshot`] that the script persists on the client.
//!
//! ```text
//!            play/restart            track ended (remaining > 1)
//!   Idle ──────────────────► Playing ◄──────────────┐
//!    ▲                        │  │  └───────────────┘
//!    │                  pause │  │ track ended (remaining == 1)
//!    │                        ▼  ▼
//!    │                   Paused  Finished
//!    │                        │      │
//!    └── new instantiation ───┴──────┘
//! ```
//!
//! `Paused` returns to `Playing` on play (resume) or restart (reset).
//! `Finished` only leaves through play or restart, both reset the count.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::repeat::RepeatCount;

/// A transport button that has been pressed during a request.
///
/// Requests without any button carry `None` instead, i.e.
/// `Option<TransportCommand>`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransportCommand {
    Play,
    Pause,
    Restart,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Idle,
    Playing,
    Paused,
    Finished,
}

/// What the media element needs to do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    /// Seek to the start and play.
    StartFromBeginning,
    /// Play from the current position.
    Resume,
    /// Stop playing and keep the position.
    Halt,
}

/// Controls whether loop progress survives a page render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumePolicy {
    /// Every render starts over with the full count.
    ResetOnEveryRender,
    /// Restore an interrupted loop from its snapshot.
    #[default]
    ResumeAfterPause,
}

/// Loop progress as persisted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopSnapshot {
    pub asset_key: String,
    pub total: u64,
    pub remaining: u64,
    /// Playback position in seconds.
    pub position: f64,
    pub phase: Phase,
}

impl LoopSnapshot {
    /// Checks if the snapshot belongs to the same loop and has been
    /// interrupted before finishing.
    ///
    /// A loop that was still playing when the page got replaced has
    /// been interrupted just like a paused one.
    #[must_use]
    pub fn is_resumable_for(&self, asset_key: &str, total: RepeatCount) -> bool {
        self.asset_key == asset_key
            && self.total == total.get()
            && (1..=self.total).contains(&self.remaining)
            && matches!(self.phase, Phase::Playing | Phase::Paused)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopState {
    total: RepeatCount,
    remaining: u64,
    phase: Phase,
}

impl LoopState {
    #[must_use]
    pub const fn new(total: RepeatCount) -> Self {
        Self {
            total,
            remaining: total.get(),
            phase: Phase::Idle,
        }
    }

    /// Restores an interrupted loop in phase [`Phase::Paused`].
    #[must_use]
    pub fn paused(total: RepeatCount, remaining: u64) -> Self {
        debug_assert!((1..=total.get()).contains(&remaining));
        Self {
            total,
            remaining: remaining.clamp(1, total.get()),
            phase: Phase::Paused,
        }
    }

    #[must_use]
    pub const fn total(&self) -> RepeatCount {
        self.total
    }

    /// The value of the "remaining / total" indicator.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    fn reset_and_start(&mut self) -> MediaAction {
        self.remaining = self.total.get();
        self.phase = Phase::Playing;
        MediaAction::StartFromBeginning
    }

    pub fn apply(&mut self, command: TransportCommand) -> Option<MediaAction> {
        match command {
            TransportCommand::Play => self.play(),
            TransportCommand::Pause => self.pause(),
            TransportCommand::Restart => Some(self.restart()),
        }
    }

    pub fn play(&mut self) -> Option<MediaAction> {
        match self.phase {
            Phase::Idle | Phase::Finished => Some(self.reset_and_start()),
            Phase::Paused => {
                self.phase = Phase::Playing;
                Some(MediaAction::Resume)
            }
            Phase::Playing => None,
        }
    }

    pub fn restart(&mut self) -> MediaAction {
        self.reset_and_start()
    }

    pub fn pause(&mut self) -> Option<MediaAction> {
        if self.phase != Phase::Playing {
            return None;
        }
        self.phase = Phase::Paused;
        Some(MediaAction::Halt)
    }

    /// Handles the end-of-track event of the media element.
    ///
    /// The count never drops below 1, the last playthrough finishes
    /// the loop instead.
    pub fn track_ended(&mut self) -> Option<MediaAction> {
        if self.phase != Phase::Playing {
            return None;
        }
        if self.remaining > 1 {
            self.remaining -= 1;
            Some(MediaAction::StartFromBeginning)
        } else {
            self.phase = Phase::Finished;
            Some(MediaAction::Halt)
        }
    }

    #[must_use]
    pub fn snapshot(&self, asset_key: &str, position: f64) -> LoopSnapshot {
        LoopSnapshot {
            asset_key: asset_key.to_owned(),
            total: self.total.get(),
            remaining: self.remaining,
            position,
            phase: self.phase,
        }
    }
}

/// The playback unit as instantiated on the client for a single render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instantiation {
    pub state: LoopState,
    pub action: Option<MediaAction>,
    /// Seek to the snapshot position before playing or while paused.
    pub restore_position: bool,
}

/// Creates the loop state for a fresh playback unit and applies the
/// command of the current request.
#[must_use]
pub fn instantiate(
    asset_key: &str,
    total: RepeatCount,
    command: Option<TransportCommand>,
    snapshot: Option<&LoopSnapshot>,
    policy: ResumePolicy,
) -> Instantiation {
    let resumable = match policy {
        ResumePolicy::ResetOnEveryRender => None,
        ResumePolicy::ResumeAfterPause => {
            snapshot.filter(|snapshot| snapshot.is_resumable_for(asset_key, total))
        }
    };
    let mut state = resumable.map_or_else(
        || LoopState::new(total),
        |snapshot| LoopState::paused(total, snapshot.remaining),
    );
    let action = command.and_then(|command| state.apply(command));
    let restore_position =
        resumable.is_some() && action != Some(MediaAction::StartFromBeginning);
    Instantiation {
        state,
        action,
        restore_position,
    }
}
