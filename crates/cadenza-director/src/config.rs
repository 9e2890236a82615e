//! Director configuration.
//!
//! Default transition timings and the engine paths of the three volume
//! buses. Embedded as the `[director]` table of the host configuration;
//! missing keys keep their defaults.

use cadenza_common::BusCategory;
use serde::{Deserialize, Serialize};

/// Engine paths of the volume buses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusPaths {
    /// Master bus path.
    pub master: String,
    /// BGM bus path.
    pub bgm: String,
    /// SFX bus path.
    pub sfx: String,
}

impl Default for BusPaths {
    fn default() -> Self {
        Self {
            master: BusCategory::Master.default_path().to_string(),
            bgm: BusCategory::Bgm.default_path().to_string(),
            sfx: BusCategory::Sfx.default_path().to_string(),
        }
    }
}

impl BusPaths {
    /// Path configured for a category.
    #[must_use]
    pub fn path(&self, category: BusCategory) -> &str {
        match category {
            BusCategory::Master => &self.master,
            BusCategory::Bgm => &self.bgm,
            BusCategory::Sfx => &self.sfx,
        }
    }
}

/// Bus volumes applied once at startup. Unset entries keep the engine's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusLevels {
    /// Master volume.
    pub master: Option<f32>,
    /// BGM volume.
    pub bgm: Option<f32>,
    /// SFX volume.
    pub sfx: Option<f32>,
}

impl BusLevels {
    /// Level configured for a category.
    #[must_use]
    pub const fn level(&self, category: BusCategory) -> Option<f32> {
        match category {
            BusCategory::Master => self.master,
            BusCategory::Bgm => self.bgm,
            BusCategory::Sfx => self.sfx,
        }
    }
}

/// Audio director configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    /// Fade duration used when none is given, in seconds.
    pub default_fade: f32,
    /// Delay used when none is given, in seconds.
    pub default_delay: f32,
    /// Engine bus paths.
    pub buses: BusPaths,
    /// Startup bus volumes.
    pub initial_volumes: BusLevels,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            default_fade: 1.0,
            default_delay: 0.0,
            buses: BusPaths::default(),
            initial_volumes: BusLevels::default(),
        }
    }
}

impl DirectorConfig {
    /// Set the default fade duration.
    #[must_use]
    pub fn with_default_fade(mut self, seconds: f32) -> Self {
        self.default_fade = seconds;
        self
    }

    /// Set the default delay.
    #[must_use]
    pub fn with_default_delay(mut self, seconds: f32) -> Self {
        self.default_delay = seconds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DirectorConfig::default();
        assert!((config.default_fade - 1.0).abs() < f32::EPSILON);
        assert!(config.default_delay.abs() < f32::EPSILON);
        assert_eq!(config.buses.path(BusCategory::Bgm), "bus:/BGM");
        assert_eq!(config.initial_volumes.level(BusCategory::Sfx), None);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = DirectorConfig::default().with_default_fade(2.5);
        config.buses.sfx = "bus:/Effects".to_string();
        config.initial_volumes.bgm = Some(0.6);

        let text = toml::to_string_pretty(&config).expect("serialize");
        let parsed: DirectorConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let parsed: DirectorConfig =
            toml::from_str("default_delay = 0.5\n[buses]\nbgm = \"bus:/Music\"\n").expect("parse");
        assert!((parsed.default_delay - 0.5).abs() < f32::EPSILON);
        assert!((parsed.default_fade - 1.0).abs() < f32::EPSILON);
        assert_eq!(parsed.buses.bgm, "bus:/Music");
        assert_eq!(parsed.buses.master, "bus:/");
    }
}
