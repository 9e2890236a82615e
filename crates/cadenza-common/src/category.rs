//! Bus categories and voice stop modes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mixer bus category exposed to callers for volume control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusCategory {
    /// Master bus (affects all audio).
    Master,
    /// Background music bus.
    Bgm,
    /// Sound effects bus.
    Sfx,
}

impl BusCategory {
    /// Default engine path of the bus for this category.
    #[must_use]
    pub const fn default_path(self) -> &'static str {
        match self {
            Self::Master => "bus:/",
            Self::Bgm => "bus:/BGM",
            Self::Sfx => "bus:/SFX",
        }
    }

    /// Get all categories.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Master, Self::Bgm, Self::Sfx]
    }

    /// Short lowercase name, as used in config files and commands.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Bgm => "bgm",
            Self::Sfx => "sfx",
        }
    }

    /// Parse a category from its short name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for BusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Master => "MASTER",
            Self::Bgm => "BGM",
            Self::Sfx => "SFX",
        })
    }
}

/// How a voice should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StopMode {
    /// Let the engine play the voice's natural fade-out tail.
    #[default]
    AllowFadeOut,
    /// Cut the voice immediately.
    Immediate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(BusCategory::from_name("bgm"), Some(BusCategory::Bgm));
        assert_eq!(BusCategory::from_name("MASTER"), Some(BusCategory::Master));
        assert_eq!(BusCategory::from_name("voice"), None);
    }

    #[test]
    fn test_display_is_uppercase() {
        assert_eq!(BusCategory::Sfx.to_string(), "SFX");
    }

    #[test]
    fn test_stop_mode_default() {
        assert_eq!(StopMode::default(), StopMode::AllowFadeOut);
    }
}
