use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use shared::{bus::DEFAULT_BUS_CAPACITY, domain::Line, protocol::DisplaySettings};
use tracing::warn;

pub const SETTINGS_FILE: &str = "controller.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind_addr: String,
    pub line_file: Option<PathBuf>,
    pub display_settings_file: Option<PathBuf>,
    pub autoplay_interval_ms: Option<u64>,
    pub channel_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8765".into(),
            line_file: None,
            display_settings_file: None,
            autoplay_interval_ms: None,
            channel_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    line_file: Option<PathBuf>,
    display_settings_file: Option<PathBuf>,
    autoplay_interval_ms: Option<u64>,
    channel_capacity: Option<usize>,
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then `path` if it exists and parses, then the environment.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.bind_addr {
                    settings.bind_addr = v;
                }
                if let Some(v) = file_cfg.line_file {
                    settings.line_file = Some(v);
                }
                if let Some(v) = file_cfg.display_settings_file {
                    settings.display_settings_file = Some(v);
                }
                if let Some(v) = file_cfg.autoplay_interval_ms {
                    settings.autoplay_interval_ms = (v > 0).then_some(v);
                }
                if let Some(v) = file_cfg.channel_capacity {
                    settings.channel_capacity = v;
                }
            }
            Err(error) => warn!(path = %path.display(), %error, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("PIDS_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }

    if let Some(v) = env("PIDS_LINE_FILE") {
        settings.line_file = Some(PathBuf::from(v));
    }
    if let Some(v) = env("APP__LINE_FILE") {
        settings.line_file = Some(PathBuf::from(v));
    }

    if let Some(v) = env("APP__DISPLAY_SETTINGS_FILE") {
        settings.display_settings_file = Some(PathBuf::from(v));
    }

    if let Some(v) = env("APP__AUTOPLAY_INTERVAL_MS") {
        match v.parse::<u64>() {
            Ok(0) => settings.autoplay_interval_ms = None,
            Ok(parsed) => settings.autoplay_interval_ms = Some(parsed),
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__AUTOPLAY_INTERVAL_MS"),
        }
    }

    if let Some(v) = env("APP__CHANNEL_CAPACITY") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.channel_capacity = parsed;
        }
    }

    settings
}

pub fn load_line(path: &Path) -> anyhow::Result<Line> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read line definition '{}'", path.display()))?;
    let line: Line = serde_json::from_str(&raw)
        .with_context(|| format!("invalid line definition '{}'", path.display()))?;
    line.validate()
        .with_context(|| format!("unusable line definition '{}'", path.display()))?;
    Ok(line)
}

pub fn load_display_settings(path: &Path) -> anyhow::Result<DisplaySettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read display settings '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid display settings '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
