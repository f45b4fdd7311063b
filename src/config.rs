use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    #[strum(serialize = "kg")]
    Kg,
    #[strum(serialize = "lb")]
    Lb,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub tick_rate_ms: u64,
    pub weight_unit: WeightUnit,
    pub weight_step: f64,
    pub templates_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate_ms: crate::TICK_RATE_MS,
            weight_unit: WeightUnit::Kg,
            weight_step: 2.5,
            templates_dir: None,
            db_path: None,
        }
    }
}

impl Config {
    pub fn templates_dir(&self) -> Option<PathBuf> {
        self.templates_dir.clone().or_else(AppDirs::templates_dir)
    }

    pub fn db_path(&self) -> Option<PathBuf> {
        self.db_path.clone().or_else(AppDirs::db_path)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("setwise_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("ignoring malformed config {}: {e}", self.path.display());
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_tick_once_a_second_in_kg() {
        let cfg = Config::default();
        assert_eq!(cfg.tick_rate_ms, 1000);
        assert_eq!(cfg.weight_unit.to_string(), "kg");
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            tick_rate_ms: 250,
            weight_unit: WeightUnit::Lb,
            weight_step: 5.0,
            templates_dir: Some(dir.path().join("templates")),
            db_path: Some(dir.path().join("s.db")),
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
        assert_eq!(cfg.db_path(), Some(dir.path().join("s.db")));
    }

    #[test]
    fn missing_or_malformed_config_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        std::fs::write(&path, b"{ nope").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, br#"{ "weight_unit": "lb" }"#).unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.weight_unit, WeightUnit::Lb);
        assert_eq!(cfg.weight_step, 2.5);
        assert_eq!(cfg.weight_unit.to_string(), "lb");
    }
}
