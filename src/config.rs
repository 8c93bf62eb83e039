use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::monitor::DEFAULT_INTERVAL_SECS;
use crate::system::collector::CollectorSettings;
use crate::system::process::NameRules;
use crate::system::reader::SourcePaths;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub sources: SourcesConfig,
    pub process: ProcessConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub interval_secs: u64,
    pub start_paused: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            interval_secs: DEFAULT_INTERVAL_SECS,
            start_paused: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
    pub battery: PathBuf,
    pub thermal_zone: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        let paths = SourcePaths::default();
        SourcesConfig {
            proc_root: paths.proc_root,
            sys_root: paths.sys_root,
            battery: paths.battery,
            thermal_zone: paths.thermal_zone,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub package_prefix: String,
    pub package_marker: String,
    pub default_sort: String,
    pub top: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        let rules = NameRules::default();
        ProcessConfig {
            package_prefix: rules.package_prefix,
            package_marker: rules.package_marker,
            default_sort: "cpu".to_string(),
            top: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    pub fn source_paths(&self) -> SourcePaths {
        SourcePaths {
            proc_root: self.sources.proc_root.clone(),
            sys_root: self.sources.sys_root.clone(),
            battery: self.sources.battery.clone(),
            thermal_zone: self.sources.thermal_zone.clone(),
        }
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            paths: self.source_paths(),
            name_rules: NameRules {
                package_prefix: self.process.package_prefix.clone(),
                package_marker: self.process.package_marker.clone(),
            },
            ..CollectorSettings::default()
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("procpulse").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}
