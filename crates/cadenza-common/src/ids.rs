//! ID types for tracks and emitters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for emitter IDs.
static EMITTER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an object that sounds can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmitterId(u64);

impl EmitterId {
    /// Creates a new unique emitter ID.
    #[must_use]
    pub fn new() -> Self {
        Self(EMITTER_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates an emitter ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl Default for EmitterId {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference to a playable track in the audio engine.
///
/// A track is addressed by its event path (`event:/Music/Level 02`) and may
/// also carry the engine's content id. An empty path is the "no track"
/// reference: handing it to a BGM transition means "stop".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackRef {
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    guid: Option<u128>,
}

impl TrackRef {
    /// Creates a track reference from an event path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            guid: None,
        }
    }

    /// Creates a reference that carries both the engine content id and its path.
    #[must_use]
    pub fn with_guid(guid: u128, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            guid: Some(guid),
        }
    }

    /// The "no track" reference.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            path: String::new(),
            guid: None,
        }
    }

    /// Event path of the track.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Engine content id, if known.
    #[must_use]
    pub const fn guid(&self) -> Option<u128> {
        self.guid
    }

    /// Returns true if this reference points at nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.trim().is_empty() && self.guid.is_none()
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<none>")
        } else {
            f.write_str(&self.path)
        }
    }
}

impl From<&str> for TrackRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for TrackRef {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<&TrackRef> for TrackRef {
    fn from(track: &TrackRef) -> Self {
        track.clone()
    }
}

impl<T: Into<TrackRef>> From<Option<T>> for TrackRef {
    fn from(track: Option<T>) -> Self {
        track.map_or_else(Self::none, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_track_refs() {
        assert!(TrackRef::none().is_empty());
        assert!(TrackRef::from("").is_empty());
        assert!(TrackRef::from("   ").is_empty());
        assert!(TrackRef::from(None::<&str>).is_empty());
    }

    #[test]
    fn test_guid_only_reference_is_not_empty() {
        let track = TrackRef::with_guid(7, "");
        assert!(!track.is_empty());
        assert_eq!(track.guid(), Some(7));
    }

    #[test]
    fn test_display() {
        assert_eq!(TrackRef::none().to_string(), "<none>");
        assert_eq!(TrackRef::from("event:/Weapons/Pistol").to_string(), "event:/Weapons/Pistol");
    }

    #[test]
    fn test_emitter_id_raw() {
        let id = EmitterId::from_raw(42);
        assert_eq!(id.raw(), 42);
    }
}
