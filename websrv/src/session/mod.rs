// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-visitor state, keyed by a cookie.
//!
//! Nothing in here is ever shared between visitors. Sessions live in
//! memory and vanish after they have not been accessed for a while or
//! when the process terminates. When the configured maximum number of
//! sessions is reached the least recently accessed one is evicted.

use std::{
    collections::HashMap,
    fmt,
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use uuid::Uuid;

use takrar_core::{
    asset::{UploadedFile, catalog::AssetKey, is_audio_file_path},
    repeat::{RepeatCount, RepeatCountState},
};

pub(crate) const SESSION_COOKIE_NAME: &str = "takrar_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SessionId(Uuid);

impl SessionId {
    fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub(crate) fn parse(encoded: &str) -> Option<Self> {
        Uuid::try_parse(encoded.trim()).ok().map(Self)
    }

    /// The value of the `Set-Cookie` response header.
    pub(crate) fn set_cookie_header_value(self) -> String {
        format!("{SESSION_COOKIE_NAME}={self}; Path=/; HttpOnly; SameSite=Lax")
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(uuid) = self;
        write!(f, "{}", uuid.as_simple())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) repeat_count: RepeatCountState,
    pub(crate) uploads: Vec<UploadedFile>,
    pub(crate) selected: Option<AssetKey>,
    last_accessed_at: Instant,
}

impl Session {
    fn new(default_repeat_count: RepeatCount, now: Instant) -> Self {
        Self {
            repeat_count: RepeatCountState::new(default_repeat_count),
            uploads: Vec::new(),
            selected: None,
            last_accessed_at: now,
        }
    }

    fn is_expired(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_accessed_at) > idle_timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UploadOutcome {
    pub(crate) accepted: usize,
    pub(crate) rejected: usize,
    /// Index of the first accepted file.
    pub(crate) first_index: Option<usize>,
}

/// Evicts the least recently accessed sessions until there is room
/// for another one.
fn make_room_for_new_session(sessions: &mut HashMap<SessionId, Session>, max_sessions: usize) {
    while sessions.len() >= max_sessions {
        let Some(oldest_id) = sessions
            .iter()
            .min_by_key(|(_, session)| session.last_accessed_at)
            .map(|(id, _)| *id)
        else {
            break;
        };
        log::info!("Evicting least recently accessed session {oldest_id}");
        sessions.remove(&oldest_id);
    }
}

#[derive(Debug)]
pub(crate) struct SessionStore {
    default_repeat_count: RepeatCount,
    max_uploads: usize,
    max_sessions: NonZeroUsize,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionStore {
    pub(crate) fn new(
        default_repeat_count: RepeatCount,
        max_uploads: usize,
        max_sessions: NonZeroUsize,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            default_repeat_count,
            max_uploads,
            max_sessions,
            idle_timeout,
            sessions: Default::default(),
        }
    }

    /// Continues the session of the cookie or starts a new one.
    ///
    /// Expired sessions of all visitors are discarded on the way.
    pub(crate) fn resolve(&self, cookie: Option<&str>) -> SessionId {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        let count_before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, self.idle_timeout));
        let expired_count = count_before - sessions.len();
        if expired_count > 0 {
            log::debug!("Discarded {expired_count} expired session(s)");
        }
        if let Some(id) = cookie.and_then(SessionId::parse) {
            if let Some(session) = sessions.get_mut(&id) {
                session.last_accessed_at = now;
                return id;
            }
        }
        make_room_for_new_session(&mut sessions, self.max_sessions.get());
        let id = SessionId::new_random();
        log::debug!("Starting session {id}");
        sessions.insert(id, Session::new(self.default_repeat_count, now));
        id
    }

    /// Accesses a session exclusively.
    ///
    /// A session that has vanished in the meantime is started over.
    pub(crate) fn update<T>(&self, id: SessionId, update: impl FnOnce(&mut Session) -> T) -> T {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        if !sessions.contains_key(&id) {
            log::debug!("Restarting vanished session {id}");
            make_room_for_new_session(&mut sessions, self.max_sessions.get());
        }
        let session = sessions
            .entry(id)
            .or_insert_with(|| Session::new(self.default_repeat_count, now));
        session.last_accessed_at = now;
        update(session)
    }

    /// A copy of the current session state.
    ///
    /// Uploaded content is shared and not copied.
    pub(crate) fn snapshot(&self, id: SessionId) -> Session {
        self.update(id, |session| session.clone())
    }

    /// Keeps only the first files up to the configured maximum per
    /// session. Files without a recognized audio extension are skipped.
    pub(crate) fn add_uploads(
        &self,
        id: SessionId,
        files: impl IntoIterator<Item = UploadedFile>,
    ) -> UploadOutcome {
        let max_uploads = self.max_uploads;
        self.update(id, |session| {
            let mut outcome = UploadOutcome {
                accepted: 0,
                rejected: 0,
                first_index: None,
            };
            for file in files {
                if session.uploads.len() >= max_uploads
                    || !is_audio_file_path(&file.file_name)
                {
                    log::info!("Rejecting uploaded file {}", file.file_name);
                    outcome.rejected += 1;
                    continue;
                }
                log::info!(
                    "Accepting uploaded file {name} ({size} bytes)",
                    name = file.file_name,
                    size = file.content.len()
                );
                if outcome.first_index.is_none() {
                    outcome.first_index = Some(session.uploads.len());
                }
                session.uploads.push(file);
                outcome.accepted += 1;
            }
            outcome
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.sessions.lock().len()
    }
}
