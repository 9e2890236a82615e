//! Named looping voices.
//!
//! Ambient beds, engine hums, rain: anything that plays until told to stop.
//! Each loop is keyed by a caller-chosen id and owns exactly one voice.

use ahash::AHashMap;
use cadenza_common::{Anchor, StopMode, TrackRef};
use cadenza_kernel::backend::AudioBackend;
use cadenza_kernel::handle::VoiceHandle;
use tracing::{debug, warn};

use crate::error::{DirectorError, DirectorResult};
use crate::transition::retire;

/// Registry of looping voices by id.
#[derive(Debug, Default)]
pub struct LoopRegistry {
    loops: AHashMap<String, VoiceHandle>,
}

impl LoopRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a loop under `id`. Does nothing if `id` is already playing.
    ///
    /// With an anchor the voice follows that emitter; engines without 3D
    /// support play it unattached.
    pub fn play_loop<B: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut B,
        id: &str,
        track: &TrackRef,
        anchor: Option<&Anchor>,
    ) -> DirectorResult<()> {
        if self.loops.contains_key(id) {
            debug!("Loop '{}' already playing", id);
            return Ok(());
        }

        let voice = engine.create_voice(track).map_err(|e| {
            warn!("Could not create loop '{}' for {}: {}", id, track, e);
            DirectorError::from(e)
        })?;

        if let Some(anchor) = anchor {
            if let Err(e) = engine.attach_voice_to_anchor(voice, anchor) {
                debug!("Loop '{}' plays unattached: {}", id, e);
            }
        }

        if let Err(e) = engine.start_voice(voice) {
            warn!("Could not start loop '{}': {}", id, e);
            retire(engine, voice);
            return Err(e.into());
        }

        debug!("Loop '{}' started as {}", id, voice);
        self.loops.insert(id.to_string(), voice);
        Ok(())
    }

    /// Stop and release the loop under `id`.
    pub fn stop_loop<B: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut B,
        id: &str,
        mode: StopMode,
    ) -> DirectorResult<()> {
        let Some(voice) = self.loops.remove(id) else {
            warn!("Tried to stop a loop that is not playing: '{}'", id);
            return Err(DirectorError::LoopNotFound(id.to_string()));
        };

        if let Err(e) = engine.stop_voice(voice, mode) {
            debug!("Stopping loop '{}' failed: {}", id, e);
        }
        if let Err(e) = engine.release_voice(voice) {
            warn!("Releasing loop '{}' failed: {}", id, e);
        }
        debug!("Loop '{}' stopped ({:?})", id, mode);
        Ok(())
    }

    /// Pause the loop under `id`. Unknown ids are ignored.
    pub fn pause_loop<B: AudioBackend + ?Sized>(&self, engine: &mut B, id: &str) {
        self.set_paused(engine, id, true);
    }

    /// Resume the loop under `id`. Unknown ids are ignored.
    pub fn resume_loop<B: AudioBackend + ?Sized>(&self, engine: &mut B, id: &str) {
        self.set_paused(engine, id, false);
    }

    /// Whether a loop is registered under `id`.
    #[must_use]
    pub fn is_looping(&self, id: &str) -> bool {
        self.loops.contains_key(id)
    }

    /// Voice of the loop under `id`.
    #[must_use]
    pub fn voice(&self, id: &str) -> Option<VoiceHandle> {
        self.loops.get(id).copied()
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn loop_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.loops.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of loops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    /// Whether no loop is playing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Stop and release every loop immediately.
    pub fn shutdown<B: AudioBackend + ?Sized>(&mut self, engine: &mut B) {
        for (id, voice) in self.loops.drain() {
            debug!("Tearing down loop '{}'", id);
            retire(engine, voice);
        }
    }

    fn set_paused<B: AudioBackend + ?Sized>(&self, engine: &mut B, id: &str, paused: bool) {
        let Some(&voice) = self.loops.get(id) else {
            debug!("No loop '{}' to pause or resume", id);
            return;
        };
        if let Err(e) = engine.set_voice_paused(voice, paused) {
            warn!("Loop '{}' pause={} failed: {}", id, paused, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_kernel::headless::{HeadlessBackend, HeadlessVoice, VoiceState};
    use glam::Vec3;

    fn rain() -> TrackRef {
        TrackRef::from("event:/Ambience/Rain")
    }

    #[test]
    fn test_play_loop_is_idempotent() {
        let mut engine = HeadlessBackend::new();
        let mut loops = LoopRegistry::new();

        loops.play_loop(&mut engine, "rain", &rain(), None).expect("play");
        loops.play_loop(&mut engine, "rain", &rain(), None).expect("play again");

        assert_eq!(loops.len(), 1);
        assert_eq!(engine.stats().created, 1);
        assert_eq!(engine.playing().len(), 1);
    }

    #[test]
    fn test_stop_loop_then_missing() {
        let mut engine = HeadlessBackend::new();
        let mut loops = LoopRegistry::new();
        loops.play_loop(&mut engine, "rain", &rain(), None).expect("play");
        let voice = loops.voice("rain").expect("voice");

        loops
            .stop_loop(&mut engine, "rain", StopMode::AllowFadeOut)
            .expect("stop");
        assert_eq!(
            engine.voice(voice).map(|v| v.state),
            Some(VoiceState::Stopped(StopMode::AllowFadeOut))
        );
        assert!(!engine.is_valid(voice));

        let err = loops
            .stop_loop(&mut engine, "rain", StopMode::AllowFadeOut)
            .expect_err("second stop");
        assert!(matches!(err, DirectorError::LoopNotFound(id) if id == "rain"));
        assert_eq!(engine.stats().double_releases, 0);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut engine = HeadlessBackend::new();
        let mut loops = LoopRegistry::new();
        loops.play_loop(&mut engine, "hum", &rain(), None).expect("play");
        let voice = loops.voice("hum").expect("voice");

        loops.pause_loop(&mut engine, "hum");
        assert_eq!(engine.voice(voice).map(|v| v.paused), Some(true));
        loops.resume_loop(&mut engine, "hum");
        assert_eq!(engine.voice(voice).map(|v| v.paused), Some(false));

        loops.pause_loop(&mut engine, "missing");
        loops.resume_loop(&mut engine, "missing");
    }

    #[test]
    fn test_anchor_attach() {
        let anchor = Anchor::new(Vec3::new(1.0, 2.0, 3.0));

        let mut engine = HeadlessBackend::new().with_3d(true);
        let mut loops = LoopRegistry::new();
        loops
            .play_loop(&mut engine, "fire", &rain(), Some(&anchor))
            .expect("play");
        let voice = loops.voice("fire").expect("voice");
        assert_eq!(engine.voice(voice).and_then(HeadlessVoice::emitter), Some(anchor.id()));

        let mut flat = HeadlessBackend::new().with_3d(false);
        let mut loops = LoopRegistry::new();
        loops
            .play_loop(&mut flat, "fire", &rain(), Some(&anchor))
            .expect("attach failure is not fatal");
        assert!(loops.is_looping("fire"));
    }

    #[test]
    fn test_create_failure_is_reported() {
        let mut engine = HeadlessBackend::new().with_failing_track("event:/Broken");
        let mut loops = LoopRegistry::new();
        let result = loops.play_loop(&mut engine, "x", &TrackRef::from("event:/Broken"), None);

        assert!(matches!(result, Err(DirectorError::Audio(_))));
        assert!(loops.is_empty());
    }

    #[test]
    fn test_shutdown_releases_all() {
        let mut engine = HeadlessBackend::new();
        let mut loops = LoopRegistry::new();
        for id in ["a", "b", "c"] {
            loops.play_loop(&mut engine, id, &rain(), None).expect("play");
        }
        assert_eq!(loops.loop_ids(), vec!["a", "b", "c"]);

        loops.shutdown(&mut engine);
        assert!(loops.is_empty());
        assert_eq!(engine.live_count(), 0);
        assert_eq!(engine.stats().released, 3);
    }
}
