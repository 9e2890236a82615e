//! Audio engine capability interface.
//!
//! The director never talks to an audio library directly. Everything it needs
//! from the engine is expressed by [`AudioBackend`]:
//!
//! ```text
//! ┌──────────────────────┐        ┌────────────────────────────┐
//! │    AudioDirector     │        │        AudioBackend        │
//! │  BGM / loops / buses │──────▶│ voices · buses · one-shots │
//! └──────────────────────┘        └────────────────────────────┘
//!                                    │                    │
//!                                    ▼                    ▼
//!                            HeadlessBackend        RodioBackend
//!                            (bookkeeping)          (rodio sinks)
//! ```
//!
//! Voice lifecycle is `create → start → (volume/pause)* → stop → release`.
//! Release is terminal: the handle becomes invalid and must not be released
//! again.

use std::path::PathBuf;

use cadenza_common::{Anchor, StopMode, TrackRef};
use glam::Vec3;
use thiserror::Error;

use crate::handle::{BusHandle, VoiceHandle};

/// Audio engine error types.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to initialize audio device.
    #[error("Failed to initialize audio device: {0}")]
    DeviceInitFailed(String),

    /// Failed to create audio sink.
    #[error("Failed to create audio sink: {0}")]
    SinkCreationFailed(String),

    /// The track reference does not resolve to any playable content.
    #[error("Track not found: '{0}'")]
    TrackNotFound(String),

    /// Failed to load audio file.
    #[error("Failed to load audio file '{path}': {message}")]
    LoadFailed {
        /// Path to the file that failed to load.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Invalid (unknown or released) voice handle.
    #[error("Invalid voice handle: {0}")]
    InvalidHandle(VoiceHandle),

    /// Invalid bus handle.
    #[error("Invalid bus handle: {0:?}")]
    InvalidBus(BusHandle),

    /// Bus path not present in the engine project.
    #[error("Bus not found: '{0}'")]
    BusNotFound(String),

    /// The engine does not implement this capability.
    #[error("Unsupported engine operation: {0}")]
    Unsupported(&'static str),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Capabilities the director consumes from an audio engine.
pub trait AudioBackend {
    /// Create a (stopped) voice for a track.
    fn create_voice(&mut self, track: &TrackRef) -> AudioResult<VoiceHandle>;

    /// Start playback of a created voice.
    fn start_voice(&mut self, voice: VoiceHandle) -> AudioResult<()>;

    /// Stop a voice.
    fn stop_voice(&mut self, voice: VoiceHandle, mode: StopMode) -> AudioResult<()>;

    /// Release a voice. The handle is invalid afterwards.
    fn release_voice(&mut self, voice: VoiceHandle) -> AudioResult<()>;

    /// Check whether a handle refers to a live (unreleased) voice.
    fn is_valid(&self, voice: VoiceHandle) -> bool;

    /// Get the voice volume.
    fn voice_volume(&self, voice: VoiceHandle) -> AudioResult<f32>;

    /// Set the voice volume.
    fn set_voice_volume(&mut self, voice: VoiceHandle, volume: f32) -> AudioResult<()>;

    /// Pause or resume a voice.
    fn set_voice_paused(&mut self, voice: VoiceHandle, paused: bool) -> AudioResult<()>;

    /// Attach a voice to a moving emitter.
    ///
    /// Engines without 3D support return [`AudioError::Unsupported`].
    fn attach_voice_to_anchor(&mut self, voice: VoiceHandle, anchor: &Anchor) -> AudioResult<()>;

    /// Look up a mixer bus by path.
    fn resolve_bus(&mut self, path: &str) -> AudioResult<BusHandle>;

    /// Get a bus volume.
    fn bus_volume(&self, bus: BusHandle) -> AudioResult<f32>;

    /// Set a bus volume.
    fn set_bus_volume(&mut self, bus: BusHandle, volume: f32) -> AudioResult<()>;

    /// Play a sound without returning a handle; the engine owns its lifetime.
    fn fire_and_forget(&mut self, track: &TrackRef, position: Option<Vec3>) -> AudioResult<()>;

    /// Advance engine-side housekeeping by `dt` seconds.
    fn update(&mut self, _dt: f32) {}
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn create_voice(&mut self, track: &TrackRef) -> AudioResult<VoiceHandle> {
        (**self).create_voice(track)
    }

    fn start_voice(&mut self, voice: VoiceHandle) -> AudioResult<()> {
        (**self).start_voice(voice)
    }

    fn stop_voice(&mut self, voice: VoiceHandle, mode: StopMode) -> AudioResult<()> {
        (**self).stop_voice(voice, mode)
    }

    fn release_voice(&mut self, voice: VoiceHandle) -> AudioResult<()> {
        (**self).release_voice(voice)
    }

    fn is_valid(&self, voice: VoiceHandle) -> bool {
        (**self).is_valid(voice)
    }

    fn voice_volume(&self, voice: VoiceHandle) -> AudioResult<f32> {
        (**self).voice_volume(voice)
    }

    fn set_voice_volume(&mut self, voice: VoiceHandle, volume: f32) -> AudioResult<()> {
        (**self).set_voice_volume(voice, volume)
    }

    fn set_voice_paused(&mut self, voice: VoiceHandle, paused: bool) -> AudioResult<()> {
        (**self).set_voice_paused(voice, paused)
    }

    fn attach_voice_to_anchor(&mut self, voice: VoiceHandle, anchor: &Anchor) -> AudioResult<()> {
        (**self).attach_voice_to_anchor(voice, anchor)
    }

    fn resolve_bus(&mut self, path: &str) -> AudioResult<BusHandle> {
        (**self).resolve_bus(path)
    }

    fn bus_volume(&self, bus: BusHandle) -> AudioResult<f32> {
        (**self).bus_volume(bus)
    }

    fn set_bus_volume(&mut self, bus: BusHandle, volume: f32) -> AudioResult<()> {
        (**self).set_bus_volume(bus, volume)
    }

    fn fire_and_forget(&mut self, track: &TrackRef, position: Option<Vec3>) -> AudioResult<()> {
        (**self).fire_and_forget(track, position)
    }

    fn update(&mut self, dt: f32) {
        (**self).update(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::BusNotFound("bus:/BGM".to_string());
        assert!(err.to_string().contains("bus:/BGM"));

        let err = AudioError::InvalidHandle(VoiceHandle::new(42));
        assert!(err.to_string().contains("42"));

        let err = AudioError::Unsupported("3D attachment");
        assert!(err.to_string().contains("3D attachment"));
    }
}
