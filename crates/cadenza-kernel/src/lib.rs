//! # Cadenza Kernel
//!
//! Audio engine layer for the Cadenza director.
//!
//! This crate provides:
//! - The [`AudioBackend`](backend::AudioBackend) capability trait the director drives
//! - Voice and bus handles
//! - A headless engine with full bookkeeping (no device required)
//! - A rodio engine that plays tracks from disk
//!
//! ## Voices
//!
//! A voice is one playing instance of a track. The engine hands out
//! [`VoiceHandle`](handle::VoiceHandle)s and owns the underlying resource
//! until the voice is released. Releasing twice is an error every backend
//! reports.
//!
//! ## Buses
//!
//! Buses are addressed by path (`bus:/`, `bus:/BGM`, `bus:/SFX`). A bus
//! volume scales every voice routed to it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod handle;
pub mod headless;
pub mod rodio_backend;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::*;
    pub use crate::handle::*;
    pub use crate::headless::*;
    pub use crate::rodio_backend::*;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use cadenza_common::{BusCategory, StopMode, TrackRef};

    #[test]
    fn test_boxed_backend_forwards() {
        let mut engine: Box<dyn AudioBackend> = Box::new(HeadlessBackend::new());
        let voice = engine
            .create_voice(&TrackRef::from("event:/Music/Level 01"))
            .expect("create");
        engine.start_voice(voice).expect("start");
        engine.set_voice_volume(voice, 0.4).expect("volume");
        assert!((engine.voice_volume(voice).expect("volume") - 0.4).abs() < f32::EPSILON);

        engine.stop_voice(voice, StopMode::AllowFadeOut).expect("stop");
        engine.release_voice(voice).expect("release");
        assert!(!engine.is_valid(voice));
    }

    #[test]
    fn test_standard_buses_resolve() {
        let mut engine = HeadlessBackend::new();
        for category in BusCategory::all() {
            let bus = engine
                .resolve_bus(category.default_path())
                .expect("standard bus");
            assert!((engine.bus_volume(bus).expect("volume") - 1.0).abs() < f32::EPSILON);
        }
        assert!(engine.resolve_bus("bus:/Voice").is_err());
    }
}
