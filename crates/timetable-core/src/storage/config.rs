//! TOML-based application configuration.
//!
//! Holds the scheduler window and grid plus view preferences. Stored at
//! `<data_dir>/config.toml`:
//!
//! ```toml
//! [scheduler]
//! day_start = "08:00"
//! day_end = "18:00"
//! step_minutes = 5
//! default_duration_min = 60
//!
//! [view]
//! hidden_weekdays = ["sat", "sun"]
//! week_start = "mon"
//! row_height_px = 9.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::data_dir;
use crate::error::ConfigError;
use crate::scheduler::SchedulerConfig;
use crate::timetable::Weekday;

/// Keys that may be absent from the serialized form but can still be set.
const OPTIONAL_NUMBER_KEYS: &[&str] = &["scheduler.min_duration_min"];

/// Week view preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_hidden_weekdays")]
    pub hidden_weekdays: Vec<Weekday>,
    #[serde(default = "default_week_start")]
    pub week_start: Weekday,
    /// Pixel height of one grid row; converts drag distance into rows.
    #[serde(default = "default_row_height_px")]
    pub row_height_px: f64,
}

fn default_hidden_weekdays() -> Vec<Weekday> {
    vec![Weekday::Sat, Weekday::Sun]
}
fn default_week_start() -> Weekday {
    Weekday::Mon
}
fn default_row_height_px() -> f64 {
    9.0
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            hidden_weekdays: default_hidden_weekdays(),
            week_start: default_week_start(),
            row_height_px: default_row_height_px(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }
        key.split('.').try_fold(root, |current, part| current.get(part))
    }

    fn parse_leaf(
        existing: Option<&serde_json::Value>,
        key: &str,
        value: &str,
    ) -> Result<serde_json::Value, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let as_number = || -> Result<serde_json::Value, ConfigError> {
            if let Ok(n) = value.parse::<i64>() {
                Ok(serde_json::Value::Number(n.into()))
            } else {
                value
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))
            }
        };

        let blank = value.trim().is_empty() || value.trim() == "null";
        if blank && OPTIONAL_NUMBER_KEYS.contains(&key) {
            return Ok(serde_json::Value::Null);
        }

        match existing {
            None | Some(serde_json::Value::Number(_)) => as_number(),
            Some(serde_json::Value::Bool(_)) => value
                .parse::<bool>()
                .map(serde_json::Value::Bool)
                .map_err(|e| invalid(e.to_string())),
            Some(serde_json::Value::Array(_)) => match serde_json::from_str(value) {
                Ok(parsed @ serde_json::Value::Array(_)) => Ok(parsed),
                // Plain `sat,sun` lists are accepted too.
                _ => Ok(serde_json::Value::Array(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| serde_json::Value::String(s.to_string()))
                        .collect(),
                )),
            },
            Some(serde_json::Value::Object(_)) => {
                serde_json::from_str(value).map_err(|e| invalid(e.to_string()))
            }
            Some(serde_json::Value::Null) => Ok(serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.into()))),
            Some(serde_json::Value::String(_)) => Ok(serde_json::Value::String(value.into())),
        }
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent_path) = parent_path {
            for part in parent_path.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf);
        if existing.is_none() && !OPTIONAL_NUMBER_KEYS.contains(&key) {
            return Err(unknown());
        }
        let new_value = Self::parse_leaf(existing, key, value)?;
        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from `<data_dir>/config.toml`, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate().map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `<data_dir>/config.toml`.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Check the scheduler invariants and view settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                key: "scheduler".to_string(),
                message: e.to_string(),
            })?;
        if !(self.view.row_height_px.is_finite() && self.view.row_height_px > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "view.row_height_px".to_string(),
                message: format!("must be a positive number, got {}", self.view.row_height_px),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// The config is left untouched if the key is unknown, the value does
    /// not parse, or the result violates the scheduler invariants.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let next: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// [`set_value`](Self::set_value), then save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Weekdays shown in the week view, in display order.
    pub fn visible_days(&self) -> Vec<Weekday> {
        Weekday::week_from(self.view.week_start)
            .into_iter()
            .filter(|d| !self.view.hidden_weekdays.contains(d))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        assert!(toml_str.contains("day_start = \"08:00\""));
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[scheduler]\nday_end = \"16:00\"\n").unwrap();
        assert_eq!(parsed.scheduler.day_end, 960);
        assert_eq!(parsed.scheduler.day_start, 480);
        assert_eq!(parsed.view, ViewConfig::default());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("scheduler.day_start").as_deref(), Some("08:00"));
        assert_eq!(cfg.get("scheduler.step_minutes").as_deref(), Some("5"));
        assert_eq!(cfg.get("view.week_start").as_deref(), Some("mon"));
        assert!(cfg.get("view.nope").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_value_updates_nested_fields() {
        let mut cfg = Config::default();
        cfg.set_value("scheduler.day_end", "17:00").unwrap();
        cfg.set_value("scheduler.step_minutes", "15").unwrap();
        cfg.set_value("view.row_height_px", "12.5").unwrap();
        cfg.set_value("view.hidden_weekdays", "sun").unwrap();
        cfg.set_value("scheduler.min_duration_min", "30").unwrap();
        assert_eq!(cfg.scheduler.day_end, 1020);
        assert_eq!(cfg.scheduler.step_minutes, 15);
        assert_eq!(cfg.view.row_height_px, 12.5);
        assert_eq!(cfg.view.hidden_weekdays, vec![Weekday::Sun]);
        assert_eq!(cfg.scheduler.min_duration_min, Some(30));
    }

    #[test]
    fn optional_key_can_be_cleared() {
        let mut cfg = Config::default();
        cfg.set_value("scheduler.min_duration_min", "30").unwrap();
        cfg.set_value("scheduler.min_duration_min", "null").unwrap();
        assert_eq!(cfg.scheduler.min_duration_min, None);
        assert_eq!(cfg.get("scheduler.min_duration_min"), None);

        cfg.set_value("scheduler.min_duration_min", "15").unwrap();
        cfg.set_value("scheduler.min_duration_min", "").unwrap();
        assert_eq!(cfg.scheduler.min_duration_min, None);

        // required numbers still refuse it
        assert!(cfg.set_value("scheduler.step_minutes", "null").is_err());
        assert_eq!(cfg.scheduler.step_minutes, 5);
    }

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("scheduler.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set_value("", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_value_rejects_broken_invariants() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("scheduler.day_start", "19:00").is_err());
        assert!(cfg.set_value("scheduler.step_minutes", "7").is_err());
        assert!(cfg.set_value("scheduler.day_start", "8am").is_err());
        assert!(cfg.set_value("view.row_height_px", "0").is_err());
        assert!(cfg.set_value("view.week_start", "someday").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn visible_days_respect_start_and_hidden() {
        let mut cfg = Config::default();
        assert_eq!(
            cfg.visible_days(),
            vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
        );
        cfg.view.week_start = Weekday::Sun;
        cfg.view.hidden_weekdays = vec![Weekday::Sat];
        assert_eq!(cfg.visible_days()[0], Weekday::Sun);
        assert_eq!(cfg.visible_days().len(), 6);
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg;
        changed.set_value("scheduler.day_start", "07:00").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().scheduler.day_start, 420);
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scheduler]\nstep_minutes = 0\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
