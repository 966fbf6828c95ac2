use std::env;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const CONFIG_ENV_VAR: &str = "TOWERCLIMB_CONFIG";
const MAX_LEVELS: u32 = 100;
const MAX_VOLUME: u8 = 100;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Difficulty {
    #[default]
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    /// Divisor applied to the random window and hazard rolls.
    pub(crate) fn factor(self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Normal => 2,
            Difficulty::Hard => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub(crate) enum Aspect {
    #[default]
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "16:9")]
    Wide,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Detail {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub(crate) difficulty: Difficulty,
    pub(crate) levels: u32,
    pub(crate) aspect: Aspect,
    pub(crate) detail: Detail,
    pub(crate) volume: u8,
    pub(crate) fullscreen: bool,
    pub(crate) demo_idle_secs: u64,
    pub(crate) start_in_demo: bool,
    /// Explicit level codes, rows listed top to bottom.
    pub(crate) layout: Option<Vec<Vec<Option<f64>>>>,
    pub(crate) seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Easy,
            levels: 25,
            aspect: Aspect::Standard,
            detail: Detail::Low,
            volume: 75,
            fullscreen: false,
            demo_idle_secs: 15,
            start_in_demo: false,
            layout: None,
            seed: None,
        }
    }
}

impl GameConfig {
    pub(crate) fn resolution(&self) -> (u32, u32) {
        match (self.aspect, self.detail) {
            (Aspect::Standard, Detail::Low) => (800, 600),
            (Aspect::Standard, Detail::Medium) => (1024, 768),
            (Aspect::Standard, Detail::High) => (1280, 1024),
            (Aspect::Wide, Detail::Low) => (1280, 720),
            (Aspect::Wide, Detail::Medium) => (1366, 768),
            (Aspect::Wide, Detail::High) => (1920, 1080),
        }
    }

    pub(crate) fn columns(&self) -> usize {
        match self.aspect {
            Aspect::Standard => 8,
            Aspect::Wide => 10,
        }
    }

    pub(crate) fn volume_fraction(&self) -> f32 {
        f32::from(self.volume) / f32::from(MAX_VOLUME)
    }
}

/// Config location: the env override when set, else the project default.
pub(crate) fn config_path(default_path: &Path) -> PathBuf {
    match env::var(CONFIG_ENV_VAR) {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_path.to_path_buf(),
    }
}

pub(crate) fn load_config(path: &Path) -> Result<GameConfig, ConfigError> {
    if !path.exists() {
        warn!(path = %path.display(), "config_missing_using_defaults");
        return Ok(GameConfig::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config_json(&raw)?;
    validate_config(&config)?;
    info!(
        path = %path.display(),
        difficulty = ?config.difficulty,
        levels = config.levels,
        columns = config.columns(),
        custom_layout = config.layout.is_some(),
        "config_loaded"
    );
    Ok(config)
}

fn parse_config_json(raw: &str) -> Result<GameConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(ConfigError::Parse(format!("parse config: {source}")))
            } else {
                Err(ConfigError::Parse(format!("parse config at {path}: {source}")))
            }
        }
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(format!("validation failed at {path}: {}", message.into()))
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> ConfigError {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

fn validate_config(config: &GameConfig) -> Result<(), ConfigError> {
    if !(1..=MAX_LEVELS).contains(&config.levels) {
        return Err(expected_actual("levels", format!("1..={MAX_LEVELS}"), config.levels));
    }
    if config.volume > MAX_VOLUME {
        return Err(expected_actual("volume", format!("0..={MAX_VOLUME}"), config.volume));
    }
    let Some(layout) = &config.layout else {
        return Ok(());
    };
    if layout.len() < 2 {
        return Err(expected_actual("layout", "at least 2 rows", layout.len()));
    }
    let columns = layout[0].len();
    if columns < 2 {
        return Err(expected_actual("layout[0]", "at least 2 columns", columns));
    }
    for (row_index, row) in layout.iter().enumerate() {
        if row.len() != columns {
            return Err(expected_actual(
                &format!("layout[{row_index}]"),
                format!("{columns} columns"),
                row.len(),
            ));
        }
        for (col_index, code) in row.iter().enumerate() {
            if let Some(code) = code {
                if super::gameplay::CellKind::from_code(*code).is_none() {
                    return Err(validation_err(
                        &format!("layout[{row_index}][{col_index}]"),
                        format!("unknown cell code {code}"),
                    ));
                }
            }
        }
    }
    Ok(())
}
