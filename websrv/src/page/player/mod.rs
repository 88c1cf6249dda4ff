// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The self-running playback unit.
//!
//! Every render emits a unit with a fresh identity. The loop itself is
//! executed by the browser, see `res/player.js`. The script is tested
//! against [`takrar_core::playback::instantiate()`] and
//! [`takrar_core::playback::LoopState`] in a JavaScript engine.

use serde::Serialize;
use uuid::Uuid;

use takrar_core::{
    asset::AudioAsset,
    playback::{Phase, ResumePolicy, TransportCommand, instantiate},
    repeat::RepeatCount,
};

use super::html::{escape, escape_script_json};

static PLAYER_JS: &str = include_str!("../../../res/player.js");

/// Key of the loop snapshot in the `sessionStorage` of the browser.
const SNAPSHOT_STORAGE_KEY: &str = "takrar.loop";

/// Initialization parameters of the client script.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnitConfig<'a> {
    wrapper_id: &'a str,
    audio_id: &'a str,
    remaining_id: &'a str,
    storage_key: &'a str,
    asset_key: &'a str,
    total: u64,
    command: Option<TransportCommand>,
    resume: bool,
}

#[derive(Debug)]
pub(crate) struct PlaybackUnit {
    id: Uuid,
    asset_key: String,
    total: RepeatCount,
    command: Option<TransportCommand>,
    policy: ResumePolicy,
    content_type: String,
    data_url: String,
}

impl PlaybackUnit {
    #[must_use]
    pub(crate) fn new(
        asset_key: String,
        asset: &AudioAsset,
        total: RepeatCount,
        command: Option<TransportCommand>,
        policy: ResumePolicy,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset_key,
            total,
            command,
            policy,
            content_type: asset.content_type.essence_str().to_owned(),
            data_url: asset.to_data_url(),
        }
    }

    /// The state as visible before the script has run.
    ///
    /// Snapshots only exist on the client and are not considered here.
    fn initial_phase_and_remaining(&self) -> (Phase, u64) {
        let instantiation = instantiate(&self.asset_key, self.total, self.command, None, self.policy);
        (
            instantiation.state.phase(),
            instantiation.state.remaining(),
        )
    }

    pub(crate) fn render_into(&self, html: &mut String) -> anyhow::Result<()> {
        let id = self.id.as_simple();
        let wrapper_id = format!("unit_{id}");
        let audio_id = format!("aud_{id}");
        let remaining_id = format!("remaining_{id}");
        let (phase, remaining) = self.initial_phase_and_remaining();
        let total = self.total.get();
        let config = UnitConfig {
            wrapper_id: &wrapper_id,
            audio_id: &audio_id,
            remaining_id: &remaining_id,
            storage_key: SNAPSHOT_STORAGE_KEY,
            asset_key: &self.asset_key,
            total,
            command: self.command,
            resume: self.policy == ResumePolicy::ResumeAfterPause,
        };
        let config_json = escape_script_json(&serde_json::to_string(&config)?);
        html.push_str(&format!(
            r#"<div class="unit" id="{wrapper_id}" data-phase="{phase}">
<audio id="{audio_id}" preload="auto" controls>
<source src="{data_url}" type="{content_type}">
متصفحك لا يدعم مشغل الصوت.
</audio>
<p class="remaining">المتبقي: <span id="{remaining_id}">{remaining}</span> / {total}</p>
</div>
<script>
{PLAYER_JS}
takrarPlaybackUnit({config_json});
</script>
"#,
            data_url = self.data_url,
            content_type = escape(&self.content_type),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests;
