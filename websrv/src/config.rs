// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    net::{IpAddr, Ipv6Addr, SocketAddr},
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use takrar_core::{playback::ResumePolicy, repeat::RepeatCount};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) network: NetworkConfig,
    pub(crate) content: ContentConfig,
    pub(crate) session: SessionConfig,
    pub(crate) player: PlayerConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct NetworkConfig {
    pub(crate) endpoint: EndpointConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct EndpointConfig {
    pub(crate) ip_addr: IpAddr,
    pub(crate) port: u16,
}

pub(crate) const ENDPOINT_PORT_DEFAULT: u16 = 8080;

impl EndpointConfig {
    pub(crate) const fn new_v6() -> Self {
        Self {
            ip_addr: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            port: ENDPOINT_PORT_DEFAULT,
        }
    }

    pub(crate) fn socket_addr(self) -> SocketAddr {
        let Self { ip_addr, port } = self;
        SocketAddr::new(ip_addr, port)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::new_v6()
    }
}

/// Read-only files that are shared by all visitors.
///
/// Relative paths are resolved against the current working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ContentConfig {
    pub(crate) audio_dir: PathBuf,
    pub(crate) background_image: Option<PathBuf>,
    pub(crate) dedications_file: Option<PathBuf>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("audio"),
            background_image: Some(PathBuf::from("assets/bg.jpg")),
            dedications_file: Some(PathBuf::from("dedications.txt")),
        }
    }
}

const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: NonZeroU64 = NonZeroU64::new(2 * 60 * 60).unwrap();

const DEFAULT_MAX_SESSIONS: NonZeroUsize = NonZeroUsize::new(1000).unwrap();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SessionConfig {
    pub(crate) default_repeat_count: RepeatCount,
    pub(crate) max_uploads: usize,
    pub(crate) max_upload_request_bytes: u64,
    /// The least recently accessed session is evicted when exceeded.
    pub(crate) max_sessions: NonZeroUsize,
    pub(crate) idle_timeout_secs: NonZeroU64,
}

impl SessionConfig {
    pub(crate) fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.get())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_repeat_count: RepeatCount::DEFAULT,
            max_uploads: 3,
            max_upload_request_bytes: 64 * 1024 * 1024,
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout_secs: DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct PlayerConfig {
    /// Continue an interrupted loop instead of starting over.
    pub(crate) resume_after_pause: bool,
}

impl PlayerConfig {
    pub(crate) const fn resume_policy(self) -> ResumePolicy {
        if self.resume_after_pause {
            ResumePolicy::ResumeAfterPause
        } else {
            ResumePolicy::ResetOnEveryRender
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            resume_after_pause: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_filled_with_defaults() {
        let config: Config =
            ron::from_str("(player: (resume_after_pause: false), session: (max_uploads: 5))")
                .unwrap();
        assert_eq!(ResumePolicy::ResetOnEveryRender, config.player.resume_policy());
        assert_eq!(5, config.session.max_uploads);
        assert_eq!(DEFAULT_MAX_SESSIONS, config.session.max_sessions);
        assert_eq!(RepeatCount::DEFAULT, config.session.default_repeat_count);
        assert_eq!(ContentConfig::default(), config.content);
        assert_eq!(ENDPOINT_PORT_DEFAULT, config.network.endpoint.port);
    }

    #[test]
    fn default_resumes_after_pause() {
        assert_eq!(
            ResumePolicy::ResumeAfterPause,
            Config::default().player.resume_policy()
        );
    }
}
