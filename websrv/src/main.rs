// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

#![warn(rust_2018_idioms)]
#![warn(rustdoc::broken_intra_doc_links)]

use std::{
    env::current_exe,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use ron::ser::PrettyConfig;

use crate::{config::Config, runtime::State};

mod config;
mod env;
mod error;
mod page;
mod routing;
mod runtime;
mod session;

#[must_use]
fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

#[must_use]
fn app_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "takrar", app_name())
}

#[must_use]
fn app_config_dir(app_dirs: &ProjectDirs) -> &Path {
    app_dirs.config_dir()
}

#[must_use]
fn new_config_file_path(app_dirs: &ProjectDirs, file_suffix: &str) -> PathBuf {
    let mut path_buf = app_config_dir(app_dirs).to_path_buf();
    path_buf.push("config");
    path_buf.set_extension(file_suffix);
    path_buf
}

#[must_use]
fn load_app_config(app_dirs: &ProjectDirs) -> Config {
    let file_path = new_config_file_path(app_dirs, "ron");
    log::info!("Loading configuration from file: {}", file_path.display());
    match fs::read_to_string(&file_path) {
        Ok(text) => ron::from_str(&text)
            .map_err(|err| {
                log::warn!("Failed to parse configuration data: {err}");
            })
            .unwrap_or_default(),
        Err(err) if err.kind() == ErrorKind::NotFound => Default::default(),
        Err(err) => {
            log::warn!("Failed to read configuration data from file: {err}");
            Default::default()
        }
    }
}

fn save_app_config(app_dirs: &ProjectDirs, config: &Config) {
    let file_path = new_config_file_path(app_dirs, "ron");
    log::info!(
        "Saving current configuration into file: {}",
        file_path.display()
    );
    let text = match ron::ser::to_string_pretty(config, PrettyConfig::default()) {
        Ok(text) => text,
        Err(err) => {
            log::warn!("Failed to store configuration data: {err}");
            return;
        }
    };
    if let Some(parent_path) = file_path.parent() {
        if let Err(err) = fs::create_dir_all(parent_path) {
            log::warn!("Failed to create parent directories for configuration file: {err}");
        }
    }
    if let Err(err) = fs::write(&file_path, text) {
        log::warn!("Failed to write configuration data into file: {err}");
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(runtime::run(config, |state| {
        log::debug!("Runtime state: {state:?}");
        if let State::Listening { socket_addr } = state {
            // Publish socket address on stdout
            println!("{socket_addr}");
        }
    }))
}

fn main() {
    env::init_environment();

    if let Err(err) = env::init_tracing_and_logging() {
        eprintln!("Failed to initialize tracing and logging: {err}");
        return;
    }

    if let Ok(exe_path) = current_exe() {
        log::info!("Executable: {}", exe_path.display());
    }
    log::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let app_dirs = app_dirs();
    let initial_config: Config = if env::parse_default_config().unwrap_or(false) {
        log::info!("Using initial default configuration");
        Default::default()
    } else {
        app_dirs.as_ref().map(load_app_config).unwrap_or_default()
    };
    log::debug!("Initial configuration: {initial_config:?}");

    // Override config with environment variables
    log::info!("Patching configuration from .env file and environment variables");
    let mut config = initial_config.clone();
    env::parse_config_into(&mut config);
    let save_config_on_exit = if config == initial_config {
        true
    } else {
        log::debug!("Patched configuration: {config:?}");
        // Don't save on exit if using a temporary configuration
        false
    };

    if let Err(err) = run(config.clone()) {
        log::error!("Runtime terminated with error: {err}");
        return;
    }

    if save_config_on_exit {
        if let Some(app_dirs) = &app_dirs {
            save_app_config(app_dirs, &config);
        }
    } else {
        log::info!("Discarding current configuration");
    }

    log::info!("Exiting");
}
