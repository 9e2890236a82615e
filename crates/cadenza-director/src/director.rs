//! Audio director facade.
//!
//! [`AudioDirector`] owns the engine together with the BGM transitions, the
//! loop registry and the bus table, and is the only type callers normally
//! touch. Call [`AudioDirector::update`] once per frame.

use cadenza_common::{Anchor, BusCategory, StopMode, TrackRef};
use cadenza_kernel::backend::AudioBackend;
use cadenza_kernel::handle::VoiceHandle;
use glam::Vec3;
use tracing::{debug, info, warn};

use crate::buses::BusVolumes;
use crate::config::DirectorConfig;
use crate::error::{DirectorError, DirectorResult};
use crate::loops::LoopRegistry;
use crate::token::TransitionToken;
use crate::transition::{BgmTransitions, TransitionPhase};

/// Snapshot of director state.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorStatus {
    /// Voice in the BGM slot.
    pub bgm: Option<VoiceHandle>,
    /// Phase of the latest BGM request.
    pub phase: TransitionPhase,
    /// Voices still fading out.
    pub fading_out: usize,
    /// Loop ids, sorted.
    pub loops: Vec<String>,
    /// Transition generation.
    pub generation: u64,
    /// Whether the director has been torn down.
    pub shut_down: bool,
}

/// Coordinates BGM, loops, one-shots and bus volumes on one engine.
#[derive(Debug)]
pub struct AudioDirector<B: AudioBackend> {
    engine: B,
    config: DirectorConfig,
    transitions: BgmTransitions,
    loops: LoopRegistry,
    buses: BusVolumes,
    shut_down: bool,
}

impl<B: AudioBackend> AudioDirector<B> {
    /// Create a director. Buses are resolved here and never again.
    pub fn new(mut engine: B, config: DirectorConfig) -> Self {
        let buses = BusVolumes::resolve(&mut engine, &config.buses);

        for category in BusCategory::all() {
            if let Some(level) = config.initial_volumes.level(category) {
                if let Err(e) = buses.set_volume(&mut engine, category, level) {
                    warn!("Initial {} volume not applied: {}", category, e);
                }
            }
        }

        info!("Audio director ready");
        Self {
            engine,
            config,
            transitions: BgmTransitions::new(),
            loops: LoopRegistry::new(),
            buses,
            shut_down: false,
        }
    }

    /// Get the engine.
    #[must_use]
    pub const fn engine(&self) -> &B {
        &self.engine
    }

    /// Get the engine mutably.
    pub fn engine_mut(&mut self) -> &mut B {
        &mut self.engine
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// Whether [`Self::shutdown`] has run.
    #[must_use]
    pub const fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn ensure_live(&self) -> DirectorResult<()> {
        if self.shut_down {
            Err(DirectorError::ShutDown)
        } else {
            Ok(())
        }
    }

    /// Advance fades and delays by `dt` seconds, then the engine.
    pub fn update(&mut self, dt: f32) -> DirectorResult<()> {
        self.ensure_live()?;
        self.transitions.update(&mut self.engine, dt);
        self.engine.update(dt);
        Ok(())
    }

    // === BGM ===

    /// Switch the BGM to `track`, fading over `fade` seconds after `delay`.
    /// An empty track stops the BGM.
    pub fn play_bgm(
        &mut self,
        track: impl Into<TrackRef>,
        fade: f32,
        delay: f32,
    ) -> DirectorResult<TransitionToken> {
        self.ensure_live()?;
        let track = track.into();
        Ok(self
            .transitions
            .play_bgm(&mut self.engine, &track, fade, delay))
    }

    /// Switch the BGM using the configured fade and delay.
    pub fn play_bgm_default(
        &mut self,
        track: impl Into<TrackRef>,
    ) -> DirectorResult<TransitionToken> {
        let (fade, delay) = (self.config.default_fade, self.config.default_delay);
        self.play_bgm(track, fade, delay)
    }

    /// Fade out and release the current BGM.
    pub fn stop_bgm(&mut self, fade: f32, delay: f32) -> DirectorResult<TransitionToken> {
        self.ensure_live()?;
        Ok(self.transitions.stop_bgm(&mut self.engine, fade, delay))
    }

    /// Stop the BGM using the configured fade.
    pub fn stop_bgm_default(&mut self) -> DirectorResult<TransitionToken> {
        let (fade, delay) = (self.config.default_fade, self.config.default_delay);
        self.stop_bgm(fade, delay)
    }

    /// Voice currently in the BGM slot.
    #[must_use]
    pub const fn current_bgm(&self) -> Option<VoiceHandle> {
        self.transitions.current()
    }

    // === One-shots ===

    /// Fire a sound without keeping a handle.
    pub fn play_one_shot(&mut self, track: impl Into<TrackRef>) -> DirectorResult<()> {
        self.ensure_live()?;
        let track = track.into();
        self.engine.fire_and_forget(&track, None)?;
        debug!("One-shot {}", track);
        Ok(())
    }

    /// Fire a sound at a world position.
    pub fn play_one_shot_at(
        &mut self,
        track: impl Into<TrackRef>,
        position: Vec3,
    ) -> DirectorResult<()> {
        self.ensure_live()?;
        let track = track.into();
        self.engine.fire_and_forget(&track, Some(position))?;
        debug!("One-shot {} at {:?}", track, position);
        Ok(())
    }

    // === Loops ===

    /// Start a named loop, optionally following an emitter. Does nothing if
    /// `id` is already playing.
    pub fn play_loop(
        &mut self,
        id: &str,
        track: impl Into<TrackRef>,
        anchor: Option<&Anchor>,
    ) -> DirectorResult<()> {
        self.ensure_live()?;
        self.loops
            .play_loop(&mut self.engine, id, &track.into(), anchor)
    }

    /// Stop and release a named loop.
    pub fn stop_loop(&mut self, id: &str, mode: StopMode) -> DirectorResult<()> {
        self.ensure_live()?;
        self.loops.stop_loop(&mut self.engine, id, mode)
    }

    /// Pause a named loop. Unknown ids are ignored.
    pub fn pause_loop(&mut self, id: &str) -> DirectorResult<()> {
        self.ensure_live()?;
        self.loops.pause_loop(&mut self.engine, id);
        Ok(())
    }

    /// Resume a named loop. Unknown ids are ignored.
    pub fn resume_loop(&mut self, id: &str) -> DirectorResult<()> {
        self.ensure_live()?;
        self.loops.resume_loop(&mut self.engine, id);
        Ok(())
    }

    /// Whether a loop is playing under `id`.
    #[must_use]
    pub fn is_looping(&self, id: &str) -> bool {
        self.loops.is_looping(id)
    }

    /// The loop registry.
    #[must_use]
    pub const fn loops(&self) -> &LoopRegistry {
        &self.loops
    }

    // === Volumes ===

    /// Set a bus volume, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, category: BusCategory, volume: f32) -> DirectorResult<()> {
        self.ensure_live()?;
        self.buses.set_volume(&mut self.engine, category, volume)
    }

    /// Get a bus volume.
    pub fn volume(&self, category: BusCategory) -> DirectorResult<f32> {
        self.ensure_live()?;
        self.buses.volume(&self.engine, category)
    }

    /// Get a bus volume, or [`BusVolumes::UNAVAILABLE`].
    #[must_use]
    pub fn volume_or_sentinel(&self, category: BusCategory) -> f32 {
        if self.shut_down {
            return BusVolumes::UNAVAILABLE;
        }
        self.buses.volume_or_sentinel(&self.engine, category)
    }

    /// Mute an audible bus or restore a silent one. Returns the new volume.
    pub fn toggle_volume(&mut self, category: BusCategory) -> DirectorResult<f32> {
        self.ensure_live()?;
        self.buses.toggle(&mut self.engine, category)
    }

    /// The resolved bus table.
    #[must_use]
    pub const fn buses(&self) -> &BusVolumes {
        &self.buses
    }

    // === Lifecycle ===

    /// Snapshot of the current state.
    #[must_use]
    pub fn status(&self) -> DirectorStatus {
        DirectorStatus {
            bgm: self.transitions.current(),
            phase: self.transitions.phase(),
            fading_out: self.transitions.fading_out().len(),
            loops: self.loops.loop_ids(),
            generation: self.transitions.generation(),
            shut_down: self.shut_down,
        }
    }

    /// Stop and release every voice immediately. Later calls do nothing;
    /// every other operation reports [`DirectorError::ShutDown`] afterwards.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.transitions.shutdown(&mut self.engine);
        self.loops.shutdown(&mut self.engine);
        info!("Audio director shut down");
    }
}

impl<B: AudioBackend> Drop for AudioDirector<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_kernel::headless::HeadlessBackend;

    const DT: f32 = 0.25;

    fn director() -> AudioDirector<HeadlessBackend> {
        AudioDirector::new(HeadlessBackend::new(), DirectorConfig::default())
    }

    fn run(director: &mut AudioDirector<HeadlessBackend>, ticks: usize) {
        for _ in 0..ticks {
            director.update(DT).expect("update");
        }
    }

    #[test]
    fn test_play_bgm_default_uses_config() {
        let config = DirectorConfig::default().with_default_fade(0.5);
        let mut director = AudioDirector::new(HeadlessBackend::new(), config);

        director.play_bgm_default("event:/Music/Level 01").expect("play");
        let voice = director.current_bgm().expect("bgm");
        run(&mut director, 2);

        assert!((director.engine().voice_volume(voice).expect("volume") - 1.0).abs() < f32::EPSILON);
        assert_eq!(director.status().phase, TransitionPhase::Settled);
    }

    #[test]
    fn test_one_shots() {
        let mut director = director();
        director.play_one_shot("event:/UI/Click").expect("one-shot");
        director
            .play_one_shot_at("event:/Weapons/Pistol", Vec3::new(1.0, 0.0, -2.0))
            .expect("one-shot at");

        let shots = director.engine().one_shots();
        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].position, None);
        assert_eq!(shots[1].position, Some(Vec3::new(1.0, 0.0, -2.0)));
        assert!(director.play_one_shot(TrackRef::none()).is_err());
    }

    #[test]
    fn test_initial_volumes_applied() {
        let mut config = DirectorConfig::default();
        config.initial_volumes.sfx = Some(0.5);
        config.initial_volumes.bgm = Some(4.0);
        let director = AudioDirector::new(HeadlessBackend::new(), config);

        assert!((director.volume(BusCategory::Sfx).expect("sfx") - 0.5).abs() < f32::EPSILON);
        assert!((director.volume(BusCategory::Bgm).expect("bgm") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_status_snapshot() {
        let mut director = director();
        director.play_bgm("event:/Music/A", 0.0, 0.0).expect("play");
        director.play_bgm("event:/Music/B", 1.0, 0.0).expect("play");
        director.play_loop("rain", "event:/Ambience/Rain", None).expect("loop");

        let status = director.status();
        assert!(status.bgm.is_some());
        assert_eq!(status.fading_out, 1);
        assert_eq!(status.loops, vec!["rain".to_string()]);
        assert_eq!(status.generation, 2);
        assert!(!status.shut_down);
    }

    #[test]
    fn test_shutdown_mid_transition() {
        let mut director = director();
        director.play_bgm("event:/Music/A", 0.0, 0.0).expect("play");
        director.play_bgm("event:/Music/B", 2.0, 0.0).expect("play");
        director.play_loop("rain", "event:/Ambience/Rain", None).expect("loop");
        director.play_loop("wind", "event:/Ambience/Wind", None).expect("loop");
        run(&mut director, 1);

        director.shutdown();
        let engine = director.engine();
        assert_eq!(engine.live_count(), 0);
        assert_eq!(engine.stats().released, 4);
        assert_eq!(engine.stats().double_releases, 0);
        assert!(director.status().shut_down);
    }

    #[test]
    fn test_operations_after_shutdown() {
        let mut director = director();
        director.shutdown();
        director.shutdown();

        assert!(matches!(director.update(DT), Err(DirectorError::ShutDown)));
        assert!(matches!(
            director.play_bgm("event:/Music/A", 1.0, 0.0),
            Err(DirectorError::ShutDown)
        ));
        assert!(matches!(director.stop_bgm(1.0, 0.0), Err(DirectorError::ShutDown)));
        assert!(matches!(
            director.volume(BusCategory::Master),
            Err(DirectorError::ShutDown)
        ));
        assert!(
            (director.volume_or_sentinel(BusCategory::Master) - BusVolumes::UNAVAILABLE).abs()
                < f32::EPSILON
        );
        assert_eq!(director.engine().stats().created, 0);
    }

    #[test]
    fn test_loop_passthrough() {
        let mut director = director();
        director.play_loop("hum", "event:/Ambience/Hum", None).expect("loop");
        director.play_loop("hum", "event:/Ambience/Hum", None).expect("again");
        assert_eq!(director.engine().stats().created, 1);

        director.pause_loop("hum").expect("pause");
        director.resume_loop("hum").expect("resume");
        director.stop_loop("hum", StopMode::AllowFadeOut).expect("stop");
        assert!(!director.is_looping("hum"));
        assert!(matches!(
            director.stop_loop("hum", StopMode::AllowFadeOut),
            Err(DirectorError::LoopNotFound(_))
        ));
    }

    #[test]
    fn test_toggle_volume() {
        let mut director = director();
        assert!(director.toggle_volume(BusCategory::Sfx).expect("toggle").abs() < f32::EPSILON);
        assert!(director.volume(BusCategory::Sfx).expect("sfx").abs() < f32::EPSILON);
    }
}
