// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use boa_engine::{Context, Source};
use serde::Deserialize;

use takrar_core::playback::{Instantiation, LoopSnapshot, LoopState, MediaAction};

use super::*;

const ASSET_KEY: &str = "repo:v1.ogg";

/// Just enough of the DOM for running a single playback unit.
///
/// The media element fires its events synchronously. Playback
/// positions are only changed explicitly.
const FAKE_BROWSER_JS: &str = r#"
var storageItems = {};
var elements = {};
var windowListeners = {};
var currentConfig = null;
var audio = null;

function hasOwn(object, key) {
  return Object.prototype.hasOwnProperty.call(object, key);
}

var window = {
  sessionStorage: {
    getItem: function (key) {
      return hasOwn(storageItems, key) ? storageItems[key] : null;
    },
    setItem: function (key, value) {
      storageItems[key] = String(value);
    },
  },
  addEventListener: function (type, listener) {
    (windowListeners[type] = windowListeners[type] || []).push(listener);
  },
};

var document = {
  getElementById: function (id) {
    return hasOwn(elements, id) ? elements[id] : null;
  },
};

function FakeAudio(readyState) {
  this.currentTime = 0;
  this.readyState = readyState;
  this.ended = false;
  this.paused = true;
  this.plays = 0;
  this.listeners = {};
}

FakeAudio.prototype.addEventListener = function (type, listener, options) {
  (this.listeners[type] = this.listeners[type] || []).push({
    listener: listener,
    once: Boolean(options && options.once),
  });
};

FakeAudio.prototype.dispatch = function (type) {
  var entries = this.listeners[type] || [];
  this.listeners[type] = entries.filter(function (entry) {
    return !entry.once;
  });
  entries.forEach(function (entry) {
    entry.listener();
  });
};

FakeAudio.prototype.play = function () {
  this.plays += 1;
  this.ended = false;
  if (this.paused) {
    this.paused = false;
    this.dispatch("play");
  }
  return { catch: function () {} };
};

FakeAudio.prototype.pause = function () {
  if (!this.paused) {
    this.paused = true;
    this.dispatch("pause");
  }
};

FakeAudio.prototype.finishTrack = function () {
  this.currentTime = 30;
  this.ended = true;
  this.paused = true;
  this.dispatch("pause");
  this.dispatch("ended");
};

FakeAudio.prototype.loadMetadata = function () {
  this.readyState = 1;
  this.dispatch("loadedmetadata");
};

function replaceStoredItem(key, value) {
  storageItems = {};
  if (value !== null) {
    storageItems[key] = JSON.stringify(value);
  }
}

function unitView() {
  var stored = window.sessionStorage.getItem(currentConfig.storageKey);
  return JSON.stringify({
    phase: elements[currentConfig.wrapperId].attributes["data-phase"],
    remaining: Number(elements[currentConfig.remainingId].textContent),
    plays: audio.plays,
    position: audio.currentTime,
    snapshot: stored === null ? null : JSON.parse(stored),
  });
}

// Replaces the page, only the session storage survives.
function mountUnit(config, readyState) {
  currentConfig = config;
  windowListeners = {};
  audio = new FakeAudio(readyState);
  elements = {};
  elements[config.audioId] = audio;
  elements[config.wrapperId] = {
    attributes: {},
    setAttribute: function (name, value) {
      this.attributes[name] = value;
    },
  };
  elements[config.remainingId] = { textContent: "" };
  takrarPlaybackUnit(config);
  return unitView();
}

function hidePage() {
  (windowListeners.pagehide || []).forEach(function (listener) {
    listener();
  });
  return unitView();
}
"#;

/// The observable state of the mounted unit.
#[derive(Debug, Deserialize)]
struct UnitView {
    phase: Phase,
    remaining: u64,
    plays: u64,
    position: f64,
    snapshot: Option<LoopSnapshot>,
}

/// Runs the shipped script in a JavaScript engine.
struct Browser {
    context: Context,
}

impl Browser {
    fn new() -> Self {
        let mut context = Context::default();
        context
            .eval(Source::from_bytes(FAKE_BROWSER_JS))
            .unwrap();
        context.eval(Source::from_bytes(PLAYER_JS)).unwrap();
        Self { context }
    }

    fn eval(&mut self, code: &str) {
        self.context.eval(Source::from_bytes(code)).unwrap();
    }

    fn eval_view(&mut self, code: &str) -> UnitView {
        let value = self.context.eval(Source::from_bytes(code)).unwrap();
        let json = value
            .to_string(&mut self.context)
            .unwrap()
            .to_std_string_escaped();
        serde_json::from_str(&json).unwrap()
    }

    fn store_snapshot(&mut self, snapshot: Option<&LoopSnapshot>) {
        let key = serde_json::to_string(SNAPSHOT_STORAGE_KEY).unwrap();
        let value = serde_json::to_string(&snapshot).unwrap();
        self.eval(&format!("replaceStoredItem({key}, {value});"));
    }

    fn mount_with_ready_state(
        &mut self,
        total: RepeatCount,
        command: Option<TransportCommand>,
        policy: ResumePolicy,
        ready_state: u8,
    ) -> UnitView {
        let config = UnitConfig {
            wrapper_id: "unit",
            audio_id: "aud",
            remaining_id: "remaining",
            storage_key: SNAPSHOT_STORAGE_KEY,
            asset_key: ASSET_KEY,
            total: total.get(),
            command,
            resume: policy == ResumePolicy::ResumeAfterPause,
        };
        let config_json = serde_json::to_string(&config).unwrap();
        self.eval_view(&format!("mountUnit({config_json}, {ready_state})"))
    }

    fn mount(
        &mut self,
        total: RepeatCount,
        command: Option<TransportCommand>,
        policy: ResumePolicy,
    ) -> UnitView {
        self.mount_with_ready_state(total, command, policy, 4)
    }

    fn finish_track(&mut self) -> UnitView {
        self.eval_view("audio.finishTrack(); unitView()")
    }

    /// Uses the native controls of the media element.
    fn pause_at(&mut self, position: f64) -> UnitView {
        self.eval_view(&format!(
            "audio.currentTime = {position}; audio.pause(); unitView()"
        ))
    }

    /// Uses the native controls of the media element.
    fn play(&mut self) -> UnitView {
        self.eval_view("audio.play(); unitView()")
    }

    fn hide_page_at(&mut self, position: f64) -> UnitView {
        self.eval_view(&format!("audio.currentTime = {position}; hidePage()"))
    }
}

fn count(value: u64) -> RepeatCount {
    RepeatCount::new(value).unwrap()
}

fn assert_position(expected: f64, actual: f64) {
    assert!(
        (expected - actual).abs() < 1e-9,
        "expected position {expected}, actual {actual}"
    );
}

fn assert_state(expected: &LoopState, view: &UnitView) {
    assert_eq!(expected.phase(), view.phase, "{view:?}");
    assert_eq!(expected.remaining(), view.remaining, "{view:?}");
}

fn assert_instantiation(
    expected: &Instantiation,
    snapshot: Option<&LoopSnapshot>,
    view: &UnitView,
) {
    assert_state(&expected.state, view);
    let expected_plays = match expected.action {
        Some(MediaAction::StartFromBeginning | MediaAction::Resume) => 1,
        Some(MediaAction::Halt) | None => 0,
    };
    assert_eq!(expected_plays, view.plays, "{view:?}");
    let expected_position = match snapshot {
        Some(snapshot) if expected.restore_position => snapshot.position,
        _ => 0.0,
    };
    assert_position(expected_position, view.position);
}

/// Plays 10 times, pauses after 2 playthroughs at 3.5 s.
fn browser_with_paused_loop() -> (Browser, LoopSnapshot) {
    let total = count(10);
    let policy = ResumePolicy::ResumeAfterPause;
    let mut browser = Browser::new();
    let mut state = instantiate(ASSET_KEY, total, Some(TransportCommand::Play), None, policy).state;
    browser.mount(total, Some(TransportCommand::Play), policy);
    browser.finish_track();
    state.track_ended();
    browser.finish_track();
    state.track_ended();
    let view = browser.pause_at(3.5);
    assert_eq!(Some(MediaAction::Halt), state.pause());
    assert_state(&state, &view);
    let snapshot = state.snapshot(ASSET_KEY, 3.5);
    assert_eq!(Some(&snapshot), view.snapshot.as_ref());
    (browser, snapshot)
}

#[test]
fn loop_finishes_after_n_playthroughs_without_replaying() {
    for n in [1, 2, 5] {
        let total = count(n);
        let policy = ResumePolicy::ResetOnEveryRender;
        let mut browser = Browser::new();
        let mut state =
            instantiate(ASSET_KEY, total, Some(TransportCommand::Play), None, policy).state;
        let view = browser.mount(total, Some(TransportCommand::Play), policy);
        assert_state(&state, &view);
        assert_eq!(1, view.plays);
        for played in 1..n {
            state.track_ended();
            let view = browser.finish_track();
            assert_state(&state, &view);
            assert_eq!(Phase::Playing, view.phase, "n = {n}, played = {played}");
            assert_eq!(n - played, view.remaining);
            assert_eq!(played + 1, view.plays);
            assert_position(0.0, view.position);
        }
        state.track_ended();
        let view = browser.finish_track();
        assert_state(&state, &view);
        assert_eq!(Phase::Finished, view.phase, "n = {n}");
        assert_eq!(1, view.remaining);
        assert_eq!(n, view.plays);
        // Nothing happens on further end events
        let view = browser.finish_track();
        assert_eq!(Phase::Finished, view.phase);
        assert_eq!(n, view.plays);
        assert!(view.snapshot.is_none());
    }
}

#[test]
fn unit_without_command_stays_idle() {
    let total = count(7);
    let policy = ResumePolicy::default();
    let mut browser = Browser::new();
    let view = browser.mount(total, None, policy);
    assert_instantiation(&instantiate(ASSET_KEY, total, None, None, policy), None, &view);
    assert_eq!(Phase::Idle, view.phase);
    assert_eq!(7, view.remaining);
    assert_eq!(0, view.plays);
    // End events of an idle unit are ignored
    let view = browser.finish_track();
    assert_eq!(Phase::Idle, view.phase);
    assert_eq!(7, view.remaining);
    assert_eq!(0, view.plays);
}

#[test]
fn native_pause_keeps_remaining_and_native_play_resumes() {
    let (mut browser, snapshot) = browser_with_paused_loop();
    assert_eq!(Phase::Paused, snapshot.phase);
    assert_eq!(8, snapshot.remaining);
    let mut state = LoopState::paused(count(10), 8);
    assert_eq!(Some(MediaAction::Resume), state.play());
    let view = browser.play();
    assert_state(&state, &view);
    assert_position(3.5, view.position);
    // The loop continues counting down
    state.track_ended();
    let view = browser.finish_track();
    assert_state(&state, &view);
    assert_eq!(7, view.remaining);
}

#[test]
fn play_after_render_resumes_paused_loop() {
    let (mut browser, snapshot) = browser_with_paused_loop();
    let expected = instantiate(
        ASSET_KEY,
        count(10),
        Some(TransportCommand::Play),
        Some(&snapshot),
        ResumePolicy::ResumeAfterPause,
    );
    assert_eq!(Some(MediaAction::Resume), expected.action);
    assert!(expected.restore_position);
    let view = browser.mount(count(10), Some(TransportCommand::Play), ResumePolicy::ResumeAfterPause);
    assert_instantiation(&expected, Some(&snapshot), &view);
    assert_eq!(Phase::Playing, view.phase);
    assert_eq!(8, view.remaining);
    assert_position(3.5, view.position);
}

#[test]
fn restart_after_render_resets_paused_loop() {
    let (mut browser, snapshot) = browser_with_paused_loop();
    let expected = instantiate(
        ASSET_KEY,
        count(10),
        Some(TransportCommand::Restart),
        Some(&snapshot),
        ResumePolicy::ResumeAfterPause,
    );
    assert!(!expected.restore_position);
    let view = browser.mount(
        count(10),
        Some(TransportCommand::Restart),
        ResumePolicy::ResumeAfterPause,
    );
    assert_instantiation(&expected, Some(&snapshot), &view);
    assert_eq!(Phase::Playing, view.phase);
    assert_eq!(10, view.remaining);
    assert_position(0.0, view.position);
    assert_eq!(1, view.plays);
}

#[test]
fn hidden_page_saves_playing_loop_as_interrupted() {
    let total = count(4);
    let policy = ResumePolicy::ResumeAfterPause;
    let mut browser = Browser::new();
    let mut state =
        instantiate(ASSET_KEY, total, Some(TransportCommand::Play), None, policy).state;
    browser.mount(total, Some(TransportCommand::Play), policy);
    browser.finish_track();
    state.track_ended();
    let view = browser.hide_page_at(1.25);
    let snapshot = state.snapshot(ASSET_KEY, 1.25);
    assert_eq!(Phase::Playing, snapshot.phase);
    assert_eq!(Some(&snapshot), view.snapshot.as_ref());
    assert!(snapshot.is_resumable_for(ASSET_KEY, total));

    let expected = instantiate(ASSET_KEY, total, None, Some(&snapshot), policy);
    let view = browser.mount(total, None, policy);
    assert_instantiation(&expected, Some(&snapshot), &view);
    assert_eq!(Phase::Paused, view.phase);
    assert_eq!(3, view.remaining);
    assert_position(1.25, view.position);
}

#[test]
fn position_is_restored_once_metadata_has_been_loaded() {
    let (mut browser, snapshot) = browser_with_paused_loop();
    let view = browser.mount_with_ready_state(count(10), None, ResumePolicy::ResumeAfterPause, 0);
    assert_eq!(Phase::Paused, view.phase);
    assert_position(0.0, view.position);
    let view = browser.eval_view("audio.loadMetadata(); unitView()");
    assert_position(snapshot.position, view.position);
}

#[test]
fn snapshots_are_neither_saved_nor_restored_without_resuming() {
    let (mut browser, _) = browser_with_paused_loop();
    let policy = ResumePolicy::ResetOnEveryRender;
    let view = browser.mount(count(10), Some(TransportCommand::Play), policy);
    assert_eq!(10, view.remaining);
    assert_position(0.0, view.position);

    let mut browser = Browser::new();
    browser.mount(count(10), Some(TransportCommand::Play), policy);
    browser.finish_track();
    let view = browser.pause_at(2.0);
    assert_eq!(Phase::Paused, view.phase);
    assert!(view.snapshot.is_none());
    let view = browser.hide_page_at(2.0);
    assert!(view.snapshot.is_none());
}

#[test]
fn instantiation_matches_loop_model() {
    let total = count(6);
    let stored = |phase, remaining| LoopSnapshot {
        asset_key: ASSET_KEY.to_owned(),
        total: total.get(),
        remaining,
        position: 2.5,
        phase,
    };
    let snapshots = [
        None,
        Some(stored(Phase::Paused, 4)),
        Some(stored(Phase::Playing, 1)),
        Some(stored(Phase::Finished, 1)),
        Some(stored(Phase::Idle, 6)),
        Some(LoopSnapshot {
            total: 7,
            ..stored(Phase::Paused, 4)
        }),
        Some(LoopSnapshot {
            asset_key: "upload:0".to_owned(),
            ..stored(Phase::Paused, 4)
        }),
        Some(stored(Phase::Paused, 0)),
        Some(stored(Phase::Paused, 9)),
    ];
    let commands = [
        None,
        Some(TransportCommand::Play),
        Some(TransportCommand::Pause),
        Some(TransportCommand::Restart),
    ];
    let policies = [
        ResumePolicy::ResetOnEveryRender,
        ResumePolicy::ResumeAfterPause,
    ];
    let mut browser = Browser::new();
    for snapshot in &snapshots {
        for command in commands {
            for policy in policies {
                browser.store_snapshot(snapshot.as_ref());
                let mut expected =
                    instantiate(ASSET_KEY, total, command, snapshot.as_ref(), policy);
                let view = browser.mount(total, command, policy);
                assert_instantiation(&expected, snapshot.as_ref(), &view);
                // Subsequent transitions continue in lockstep
                expected.state.track_ended();
                assert_state(&expected.state, &browser.finish_track());
                expected.state.pause();
                assert_state(&expected.state, &browser.pause_at(1.0));
                expected.state.play();
                assert_state(&expected.state, &browser.play());
            }
        }
    }
}
