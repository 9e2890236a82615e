//! Headless engine.
//!
//! Keeps the full voice and bus bookkeeping of a real engine without
//! producing sound. Used when no output device is available and as the
//! observable engine in tests: every voice ever created stays in the record
//! (including released ones) together with per-voice call counts.

use ahash::AHashMap;
use cadenza_common::{clamp_volume, Anchor, BusCategory, EmitterId, StopMode, TrackRef};
use glam::Vec3;
use tracing::{debug, trace, warn};

use crate::backend::{AudioBackend, AudioError, AudioResult};
use crate::handle::{BusHandle, HandleGenerator, VoiceHandle};

/// Lifecycle state of a headless voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Created, not started yet.
    Created,
    /// Started and not stopped.
    Playing,
    /// Stopped.
    Stopped(StopMode),
}

/// Record of one voice.
#[derive(Debug, Clone)]
pub struct HeadlessVoice {
    /// Track the voice was created from.
    pub track: TrackRef,
    /// Lifecycle state.
    pub state: VoiceState,
    /// Whether the voice is paused.
    pub paused: bool,
    /// Current volume.
    pub volume: f32,
    /// Emitter the voice is attached to.
    pub anchor: Option<Anchor>,
    /// How many times release was requested.
    pub release_count: u32,
    /// How many times stop was requested.
    pub stop_count: u32,
    /// Highest volume applied through `set_voice_volume`.
    pub peak_volume: f32,
}

impl HeadlessVoice {
    fn new(track: TrackRef) -> Self {
        Self {
            track,
            state: VoiceState::Created,
            paused: false,
            volume: 1.0,
            anchor: None,
            release_count: 0,
            stop_count: 0,
            peak_volume: 0.0,
        }
    }

    /// Whether the voice has been released.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.release_count > 0
    }

    /// Id of the emitter the voice follows.
    #[must_use]
    pub fn emitter(&self) -> Option<EmitterId> {
        self.anchor.as_ref().map(Anchor::id)
    }

    /// Live position of the emitter the voice follows.
    #[must_use]
    pub fn position(&self) -> Option<Vec3> {
        self.anchor.as_ref().map(Anchor::position)
    }

    /// Whether the voice is audible (started, not stopped, not released).
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.state, VoiceState::Playing) && !self.is_released()
    }
}

/// Call statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    /// Voices created.
    pub created: u32,
    /// Voices started.
    pub started: u32,
    /// Stop calls on live voices.
    pub stopped: u32,
    /// Successful releases.
    pub released: u32,
    /// Release calls on already released voices.
    pub double_releases: u32,
    /// Fire-and-forget one-shots.
    pub one_shots: u32,
}

/// A fire-and-forget request, kept for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct OneShotRecord {
    /// Track played.
    pub track: TrackRef,
    /// World position, if any.
    pub position: Option<Vec3>,
}

#[derive(Debug, Clone)]
struct HeadlessBus {
    path: String,
    volume: f32,
}

/// In-memory engine.
#[derive(Debug)]
pub struct HeadlessBackend {
    handle_gen: HandleGenerator,
    voices: AHashMap<VoiceHandle, HeadlessVoice>,
    buses: Vec<HeadlessBus>,
    failing_tracks: Vec<String>,
    failing_starts: Vec<String>,
    one_shots: Vec<OneShotRecord>,
    stats: HeadlessStats,
    supports_3d: bool,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    /// Create a headless engine with the standard bus layout.
    #[must_use]
    pub fn new() -> Self {
        let paths = BusCategory::all().map(BusCategory::default_path);
        Self::with_buses(&paths)
    }

    /// Create a headless engine that knows exactly the given bus paths.
    #[must_use]
    pub fn with_buses(paths: &[&str]) -> Self {
        debug!("Created headless audio backend with {} buses", paths.len());
        Self {
            handle_gen: HandleGenerator::new(),
            voices: AHashMap::new(),
            buses: paths
                .iter()
                .map(|p| HeadlessBus {
                    path: (*p).to_string(),
                    volume: 1.0,
                })
                .collect(),
            failing_tracks: Vec::new(),
            failing_starts: Vec::new(),
            one_shots: Vec::new(),
            stats: HeadlessStats::default(),
            supports_3d: true,
        }
    }

    /// Make `create_voice` fail for a track path.
    #[must_use]
    pub fn with_failing_track(mut self, path: impl Into<String>) -> Self {
        self.failing_tracks.push(path.into());
        self
    }

    /// Make `start_voice` fail for voices of a track path.
    #[must_use]
    pub fn with_failing_start(mut self, path: impl Into<String>) -> Self {
        self.failing_starts.push(path.into());
        self
    }

    /// Enable or disable emitter attachment support.
    #[must_use]
    pub const fn with_3d(mut self, enabled: bool) -> Self {
        self.supports_3d = enabled;
        self
    }

    /// Call statistics.
    #[must_use]
    pub const fn stats(&self) -> HeadlessStats {
        self.stats
    }

    /// Get the record of a voice (released voices included).
    #[must_use]
    pub fn voice(&self, handle: VoiceHandle) -> Option<&HeadlessVoice> {
        self.voices.get(&handle)
    }

    /// All voice records ever created, ordered by handle.
    #[must_use]
    pub fn voices(&self) -> Vec<(VoiceHandle, &HeadlessVoice)> {
        let mut all: Vec<_> = self.voices.iter().map(|(h, v)| (*h, v)).collect();
        all.sort_by_key(|(h, _)| *h);
        all
    }

    /// Handles of voices that are currently playing.
    #[must_use]
    pub fn playing(&self) -> Vec<VoiceHandle> {
        self.voices()
            .into_iter()
            .filter(|(_, v)| v.is_playing())
            .map(|(h, _)| h)
            .collect()
    }

    /// Number of voices that have not been released.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.voices.values().filter(|v| !v.is_released()).count()
    }

    /// One-shots fired so far.
    #[must_use]
    pub fn one_shots(&self) -> &[OneShotRecord] {
        &self.one_shots
    }

    fn live_mut(&mut self, handle: VoiceHandle) -> AudioResult<&mut HeadlessVoice> {
        match self.voices.get_mut(&handle) {
            Some(voice) if !voice.is_released() => Ok(voice),
            _ => Err(AudioError::InvalidHandle(handle)),
        }
    }

    fn live(&self, handle: VoiceHandle) -> AudioResult<&HeadlessVoice> {
        match self.voices.get(&handle) {
            Some(voice) if !voice.is_released() => Ok(voice),
            _ => Err(AudioError::InvalidHandle(handle)),
        }
    }

    fn bus(&self, bus: BusHandle) -> AudioResult<&HeadlessBus> {
        self.buses
            .get(bus.index() as usize)
            .ok_or(AudioError::InvalidBus(bus))
    }
}

impl AudioBackend for HeadlessBackend {
    fn create_voice(&mut self, track: &TrackRef) -> AudioResult<VoiceHandle> {
        if track.is_empty() || self.failing_tracks.iter().any(|p| p == track.path()) {
            return Err(AudioError::TrackNotFound(track.to_string()));
        }

        let handle = self.handle_gen.next();
        self.voices.insert(handle, HeadlessVoice::new(track.clone()));
        self.stats.created += 1;
        trace!("Created {} for {}", handle, track);
        Ok(handle)
    }

    fn start_voice(&mut self, voice: VoiceHandle) -> AudioResult<()> {
        let failing = &self.failing_starts;
        let record = match self.voices.get_mut(&voice) {
            Some(record) if !record.is_released() => record,
            _ => return Err(AudioError::InvalidHandle(voice)),
        };
        if failing.iter().any(|p| p == record.track.path()) {
            return Err(AudioError::SinkCreationFailed(record.track.to_string()));
        }
        record.state = VoiceState::Playing;
        self.stats.started += 1;
        Ok(())
    }

    fn stop_voice(&mut self, voice: VoiceHandle, mode: StopMode) -> AudioResult<()> {
        let record = self.live_mut(voice)?;
        record.state = VoiceState::Stopped(mode);
        record.stop_count += 1;
        self.stats.stopped += 1;
        Ok(())
    }

    fn release_voice(&mut self, voice: VoiceHandle) -> AudioResult<()> {
        match self.voices.get_mut(&voice) {
            Some(record) if record.is_released() => {
                record.release_count += 1;
                self.stats.double_releases += 1;
                warn!("Double release of {}", voice);
                Err(AudioError::InvalidHandle(voice))
            },
            Some(record) => {
                record.release_count = 1;
                self.stats.released += 1;
                trace!("Released {}", voice);
                Ok(())
            },
            None => Err(AudioError::InvalidHandle(voice)),
        }
    }

    fn is_valid(&self, voice: VoiceHandle) -> bool {
        self.live(voice).is_ok()
    }

    fn voice_volume(&self, voice: VoiceHandle) -> AudioResult<f32> {
        self.live(voice).map(|v| v.volume)
    }

    fn set_voice_volume(&mut self, voice: VoiceHandle, volume: f32) -> AudioResult<()> {
        let record = self.live_mut(voice)?;
        record.volume = clamp_volume(volume);
        record.peak_volume = record.peak_volume.max(record.volume);
        Ok(())
    }

    fn set_voice_paused(&mut self, voice: VoiceHandle, paused: bool) -> AudioResult<()> {
        self.live_mut(voice)?.paused = paused;
        Ok(())
    }

    fn attach_voice_to_anchor(&mut self, voice: VoiceHandle, anchor: &Anchor) -> AudioResult<()> {
        if !self.supports_3d {
            return Err(AudioError::Unsupported("3D attachment"));
        }
        self.live_mut(voice)?.anchor = Some(anchor.clone());
        Ok(())
    }

    fn resolve_bus(&mut self, path: &str) -> AudioResult<BusHandle> {
        self.buses
            .iter()
            .position(|b| b.path == path)
            .map(|idx| BusHandle::new(idx as u32))
            .ok_or_else(|| AudioError::BusNotFound(path.to_string()))
    }

    fn bus_volume(&self, bus: BusHandle) -> AudioResult<f32> {
        self.bus(bus).map(|b| b.volume)
    }

    fn set_bus_volume(&mut self, bus: BusHandle, volume: f32) -> AudioResult<()> {
        let entry = self
            .buses
            .get_mut(bus.index() as usize)
            .ok_or(AudioError::InvalidBus(bus))?;
        entry.volume = clamp_volume(volume);
        Ok(())
    }

    fn fire_and_forget(&mut self, track: &TrackRef, position: Option<Vec3>) -> AudioResult<()> {
        if track.is_empty() {
            return Err(AudioError::TrackNotFound(track.to_string()));
        }
        self.one_shots.push(OneShotRecord {
            track: track.clone(),
            position,
        });
        self.stats.one_shots += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_lifecycle() {
        let mut engine = HeadlessBackend::new();
        let voice = engine
            .create_voice(&TrackRef::from("event:/Music/Level 01"))
            .expect("should create voice");

        assert!(engine.is_valid(voice));
        assert!(engine.playing().is_empty());

        engine.start_voice(voice).expect("start");
        assert_eq!(engine.playing(), vec![voice]);

        engine.stop_voice(voice, StopMode::Immediate).expect("stop");
        engine.release_voice(voice).expect("release");

        assert!(!engine.is_valid(voice));
        assert_eq!(engine.live_count(), 0);
        assert_eq!(engine.stats().released, 1);
    }

    #[test]
    fn test_double_release_is_detected() {
        let mut engine = HeadlessBackend::new();
        let voice = engine.create_voice(&TrackRef::from("a")).expect("create");
        engine.release_voice(voice).expect("first release");

        assert!(engine.release_voice(voice).is_err());
        assert_eq!(engine.stats().double_releases, 1);
        assert_eq!(engine.voice(voice).map(|v| v.release_count), Some(2));
    }

    #[test]
    fn test_released_voice_rejects_calls() {
        let mut engine = HeadlessBackend::new();
        let voice = engine.create_voice(&TrackRef::from("a")).expect("create");
        engine.release_voice(voice).expect("release");

        assert!(engine.set_voice_volume(voice, 0.5).is_err());
        assert!(engine.voice_volume(voice).is_err());
        assert!(engine.stop_voice(voice, StopMode::Immediate).is_err());
    }

    #[test]
    fn test_failing_track() {
        let mut engine = HeadlessBackend::new().with_failing_track("event:/Broken");
        assert!(engine.create_voice(&TrackRef::from("event:/Broken")).is_err());
        assert!(engine.create_voice(&TrackRef::none()).is_err());
        assert_eq!(engine.stats().created, 0);
    }

    #[test]
    fn test_failing_start_keeps_voice_valid() {
        let mut engine = HeadlessBackend::new().with_failing_start("event:/Stuck");
        let voice = engine.create_voice(&TrackRef::from("event:/Stuck")).expect("create");

        assert!(engine.start_voice(voice).is_err());
        assert!(engine.is_valid(voice));
        assert_eq!(engine.stats().started, 0);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut engine = HeadlessBackend::new();
        let voice = engine.create_voice(&TrackRef::from("a")).expect("create");
        engine.set_voice_volume(voice, 3.0).expect("volume");
        assert!((engine.voice_volume(voice).expect("volume") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_buses() {
        let mut engine = HeadlessBackend::with_buses(&["bus:/", "bus:/SFX"]);
        assert!(engine.resolve_bus("bus:/BGM").is_err());

        let sfx = engine.resolve_bus("bus:/SFX").expect("sfx bus");
        engine.set_bus_volume(sfx, 0.25).expect("set");
        assert!((engine.bus_volume(sfx).expect("get") - 0.25).abs() < f32::EPSILON);
        assert!(engine.bus_volume(BusHandle::new(9)).is_err());
    }

    #[test]
    fn test_attach_unsupported() {
        let mut engine = HeadlessBackend::new().with_3d(false);
        let voice = engine.create_voice(&TrackRef::from("a")).expect("create");
        let anchor = Anchor::new(Vec3::ZERO);
        assert!(matches!(
            engine.attach_voice_to_anchor(voice, &anchor),
            Err(AudioError::Unsupported(_))
        ));
    }

    #[test]
    fn test_attached_voice_follows_anchor() {
        let mut engine = HeadlessBackend::new();
        let voice = engine.create_voice(&TrackRef::from("a")).expect("create");
        let anchor = Anchor::new(Vec3::ZERO);
        engine.attach_voice_to_anchor(voice, &anchor).expect("attach");

        anchor.set_position(Vec3::new(4.0, 0.0, -1.0));
        let record = engine.voice(voice).expect("record");
        assert_eq!(record.emitter(), Some(anchor.id()));
        assert_eq!(record.position(), Some(Vec3::new(4.0, 0.0, -1.0)));
    }

    #[test]
    fn test_one_shots_are_recorded() {
        let mut engine = HeadlessBackend::new();
        engine
            .fire_and_forget(&TrackRef::from("event:/Weapons/Pistol"), Some(Vec3::X))
            .expect("fire");

        assert_eq!(engine.stats().one_shots, 1);
        assert_eq!(engine.one_shots()[0].position, Some(Vec3::X));
        assert_eq!(engine.live_count(), 0);
    }
}
