// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    env,
    net::IpAddr,
    num::NonZeroUsize,
    path::PathBuf,
    str::{FromStr, ParseBoolError},
};

use anyhow::Error;
use tracing::{Subscriber, subscriber::set_global_default};
use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

use takrar_core::repeat::RepeatCount;

use crate::config::Config;

pub(crate) fn init_environment() {
    if let Ok(path) = dotenvy::dotenv() {
        // Print to stderr because logging has not been initialized yet
        eprintln!("Loaded environment from dotenv file {}", path.display());
    }
}

const TRACING_SUBSCRIBER_ENV_FILTER_DEFAULT: &str = "info";

fn create_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|err| {
        let rust_log_from_env = env::var("RUST_LOG").ok();
        if let Some(rust_log_from_env) = rust_log_from_env {
            if !rust_log_from_env.is_empty() {
                eprintln!(
                    "Failed to parse RUST_LOG environment variable '{rust_log_from_env}': {err}"
                );
            }
        }
        EnvFilter::new(TRACING_SUBSCRIBER_ENV_FILTER_DEFAULT)
    })
}

fn create_tracing_subscriber() -> impl Subscriber {
    let env_filter = create_env_filter();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish()
}

pub(crate) fn init_tracing_and_logging() -> anyhow::Result<()> {
    // Capture and redirect all log messages as tracing events
    LogTracer::init()?;

    let subscriber = create_tracing_subscriber();
    set_global_default(subscriber)?;

    Ok(())
}

fn parse_bool_var(var: &str) -> Result<bool, ParseBoolError> {
    var.to_lowercase().parse::<bool>().or_else(|err| {
        if let Ok(val) = var.parse::<u8>() {
            match val {
                0 => return Ok(false),
                1 => return Ok(true),
                _ => (),
            }
        }
        Err(err)
    })
}

/// Reads and parses an optional environment variable.
///
/// Empty values are treated like missing values. Values that could
/// not be parsed are logged and ignored.
fn parse_var<T, E>(name: &str, parse: impl FnOnce(&str) -> Result<T, E>) -> Option<T>
where
    E: Into<Error>,
{
    let var = env::var(name).ok()?;
    tracing::debug!("{name} = {var}");
    let var = var.trim();
    if var.is_empty() {
        return None;
    }
    parse(var)
        .map_err(|err| {
            let err: Error = err.into();
            tracing::warn!("Failed to parse {name} = {var}: {err}");
        })
        .ok()
}

fn parse_from_str_var<T>(name: &str) -> Option<T>
where
    T: FromStr,
    <T as FromStr>::Err: Into<Error>,
{
    parse_var(name, |var| var.parse::<T>())
}

fn parse_path_var(name: &str) -> Option<PathBuf> {
    parse_var(name, |var| Ok::<_, Error>(PathBuf::from(var)))
}

const DEFAULT_CONFIG_ENV: &str = "DEFAULT_CONFIG";

/// Ignore the configuration file.
pub(crate) fn parse_default_config() -> Option<bool> {
    parse_var(DEFAULT_CONFIG_ENV, parse_bool_var)
}

const ENDPOINT_IP_ENV: &str = "ENDPOINT_IP";

const ENDPOINT_PORT_ENV: &str = "ENDPOINT_PORT";

const AUDIO_DIR_ENV: &str = "AUDIO_DIR";

const BACKGROUND_IMAGE_ENV: &str = "BACKGROUND_IMAGE";

const DEDICATIONS_FILE_ENV: &str = "DEDICATIONS_FILE";

const DEFAULT_REPEAT_COUNT_ENV: &str = "DEFAULT_REPEAT_COUNT";

const MAX_UPLOADS_ENV: &str = "MAX_UPLOADS";

const MAX_SESSIONS_ENV: &str = "MAX_SESSIONS";

const RESUME_AFTER_PAUSE_ENV: &str = "RESUME_AFTER_PAUSE";

pub(crate) fn parse_config_into(config: &mut Config) {
    if let Some(ip_addr) = parse_from_str_var::<IpAddr>(ENDPOINT_IP_ENV) {
        config.network.endpoint.ip_addr = ip_addr;
    }
    if let Some(port) = parse_from_str_var::<u16>(ENDPOINT_PORT_ENV) {
        config.network.endpoint.port = port;
    }
    if let Some(audio_dir) = parse_path_var(AUDIO_DIR_ENV) {
        config.content.audio_dir = audio_dir;
    }
    if let Some(background_image) = parse_path_var(BACKGROUND_IMAGE_ENV) {
        config.content.background_image = Some(background_image);
    }
    if let Some(dedications_file) = parse_path_var(DEDICATIONS_FILE_ENV) {
        config.content.dedications_file = Some(dedications_file);
    }
    if let Some(value) = parse_from_str_var::<u64>(DEFAULT_REPEAT_COUNT_ENV) {
        if let Some(repeat_count) = RepeatCount::new(value) {
            config.session.default_repeat_count = repeat_count;
        } else {
            tracing::warn!("Invalid {DEFAULT_REPEAT_COUNT_ENV} = {value} < {}", RepeatCount::MIN);
        }
    }
    if let Some(max_uploads) = parse_from_str_var::<usize>(MAX_UPLOADS_ENV) {
        config.session.max_uploads = max_uploads;
    }
    if let Some(max_sessions) = parse_from_str_var::<NonZeroUsize>(MAX_SESSIONS_ENV) {
        config.session.max_sessions = max_sessions;
    }
    if let Some(resume_after_pause) = parse_var(RESUME_AFTER_PAUSE_ENV, parse_bool_var) {
        config.player.resume_after_pause = resume_after_pause;
    }
}

#[cfg(test)]
mod tests {
    use super::parse_bool_var;

    #[test]
    fn parse_bool_var_accepts_digits() {
        assert_eq!(Ok(true), parse_bool_var("1"));
        assert_eq!(Ok(false), parse_bool_var("0"));
        assert_eq!(Ok(true), parse_bool_var("TRUE"));
        assert_eq!(Ok(false), parse_bool_var("false"));
        assert!(parse_bool_var("2").is_err());
        assert!(parse_bool_var("yes").is_err());
    }
}
