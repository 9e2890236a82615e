//! Audio Backend with Rodio Integration
//!
//! Real playback for the [`AudioBackend`] interface:
//!
//! - `RodioConfig`: where tracks live on disk and how they are routed to buses
//! - `RodioBackend`: one rodio `Sink` per voice, detached sinks for one-shots
//! - Software buses: a voice's sink volume is `voice × route bus × master`
//! - `StopMode::AllowFadeOut` plays a short linear tail before the sink stops
//!
//! # Track resolution
//!
//! ```text
//! "event:/Music/Level 02"
//!        │
//!        ├── tracks table hit ──────────▶ <asset_root>/<mapped file>
//!        │
//!        └── otherwise strip "event:/" ─▶ <asset_root>/Music/Level 02.{ogg,mp3,wav,flac}
//! ```
//!
//! 3D attachment is not provided; `attach_voice_to_anchor` reports
//! [`AudioError::Unsupported`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use cadenza_common::{clamp_volume, Anchor, StopMode, TrackRef};
use glam::Vec3;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::backend::{AudioBackend, AudioError, AudioResult};
use crate::handle::{BusHandle, HandleGenerator, VoiceHandle};

/// Prefix of engine event paths.
pub const EVENT_PREFIX: &str = "event:/";

/// Routes tracks whose path starts with `prefix` to `bus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusRoute {
    /// Track path prefix.
    pub prefix: String,
    /// Bus path.
    pub bus: String,
}

impl BusRoute {
    /// Create a route.
    #[must_use]
    pub fn new(prefix: impl Into<String>, bus: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            bus: bus.into(),
        }
    }
}

/// Rodio backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RodioConfig {
    /// Directory that track files are resolved against.
    pub asset_root: PathBuf,
    /// Explicit track path → file mapping (relative to `asset_root`).
    pub tracks: BTreeMap<String, PathBuf>,
    /// Extensions tried when a track is not in the table.
    pub extensions: Vec<String>,
    /// Bus paths known to the engine.
    pub buses: Vec<String>,
    /// Bus applied on top of every other bus.
    pub master_bus: String,
    /// Prefix routing, first match wins.
    pub routes: Vec<BusRoute>,
    /// Bus for tracks matching no route.
    pub default_bus: String,
    /// Length of the fade-out tail for `StopMode::AllowFadeOut`, in seconds.
    pub stop_tail_secs: f32,
}

impl Default for RodioConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets/audio"),
            tracks: BTreeMap::new(),
            extensions: ["ogg", "mp3", "wav", "flac"]
                .into_iter()
                .map(String::from)
                .collect(),
            buses: vec!["bus:/".into(), "bus:/BGM".into(), "bus:/SFX".into()],
            master_bus: "bus:/".into(),
            routes: vec![BusRoute::new("event:/Music", "bus:/BGM")],
            default_bus: "bus:/SFX".into(),
            stop_tail_secs: 0.25,
        }
    }
}

impl RodioConfig {
    /// Set the asset root.
    #[must_use]
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    /// Map a track path to a file.
    #[must_use]
    pub fn with_track(mut self, track: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.tracks.insert(track.into(), file.into());
        self
    }

    /// Find the file backing a track.
    pub fn resolve_file(&self, track: &TrackRef) -> AudioResult<PathBuf> {
        if let Some(file) = self.tracks.get(track.path()) {
            return Ok(self.asset_root.join(file));
        }

        let relative = track
            .path()
            .strip_prefix(EVENT_PREFIX)
            .unwrap_or(track.path())
            .trim_start_matches('/');
        if relative.is_empty() {
            return Err(AudioError::TrackNotFound(track.to_string()));
        }

        let direct = self.asset_root.join(relative);
        if direct.is_file() {
            return Ok(direct);
        }

        self.extensions
            .iter()
            .map(|ext| self.asset_root.join(format!("{relative}.{ext}")))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| AudioError::TrackNotFound(track.to_string()))
    }

    /// Bus path a track is routed to.
    #[must_use]
    pub fn route_for(&self, track: &TrackRef) -> &str {
        self.routes
            .iter()
            .find(|r| track.path().starts_with(&r.prefix))
            .map_or(self.default_bus.as_str(), |r| r.bus.as_str())
    }
}

/// Linear fade-out tail of a stopping voice.
#[derive(Debug, Clone, Copy)]
struct Tail {
    remaining: f32,
    total: f32,
}

impl Tail {
    fn factor(self) -> f32 {
        if self.total <= 0.0 {
            0.0
        } else {
            (self.remaining / self.total).clamp(0.0, 1.0)
        }
    }
}

struct RodioVoice {
    sink: Sink,
    track: TrackRef,
    volume: f32,
    route: Option<usize>,
    started: bool,
    paused: bool,
    tail: Option<Tail>,
}

impl std::fmt::Debug for RodioVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioVoice")
            .field("track", &self.track)
            .field("volume", &self.volume)
            .field("route", &self.route)
            .field("started", &self.started)
            .field("paused", &self.paused)
            .field("tail", &self.tail)
            .finish_non_exhaustive()
    }
}

/// A released voice still playing its stop tail.
struct Draining {
    sink: Sink,
    gain: f32,
    tail: Tail,
}

#[derive(Debug, Clone)]
struct RodioBus {
    path: String,
    volume: f32,
}

/// Rodio-backed audio engine.
pub struct RodioBackend {
    /// The output stream (must be kept alive).
    _stream: OutputStream,
    /// Handle for creating sinks.
    stream_handle: OutputStreamHandle,
    config: RodioConfig,
    handle_gen: HandleGenerator,
    voices: AHashMap<VoiceHandle, RodioVoice>,
    buses: Vec<RodioBus>,
    master: Option<usize>,
    draining: Vec<Draining>,
}

impl std::fmt::Debug for RodioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioBackend")
            .field("voices", &self.voices.len())
            .field("buses", &self.buses)
            .field("draining", &self.draining.len())
            .finish_non_exhaustive()
    }
}

impl RodioBackend {
    /// Open the default output device.
    pub fn new(config: RodioConfig) -> AudioResult<Self> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| AudioError::DeviceInitFailed(e.to_string()))?;

        let buses: Vec<RodioBus> = config
            .buses
            .iter()
            .map(|path| RodioBus {
                path: path.clone(),
                volume: 1.0,
            })
            .collect();
        let master = buses.iter().position(|b| b.path == config.master_bus);

        info!(
            "Rodio audio backend initialized ({} buses, assets at {})",
            buses.len(),
            config.asset_root.display()
        );

        Ok(Self {
            _stream: stream,
            stream_handle,
            config,
            handle_gen: HandleGenerator::new(),
            voices: AHashMap::new(),
            buses,
            master,
            draining: Vec::new(),
        })
    }

    fn bus_index(&self, path: &str) -> Option<usize> {
        self.buses.iter().position(|b| b.path == path)
    }

    /// Combined gain of a route bus and the master bus.
    fn route_gain(&self, route: Option<usize>) -> f32 {
        let master = self.master.map_or(1.0, |m| self.buses[m].volume);
        match route {
            Some(idx) if Some(idx) != self.master => self.buses[idx].volume * master,
            _ => master,
        }
    }

    fn apply_volume(&self, voice: &RodioVoice) {
        let tail = voice.tail.map_or(1.0, Tail::factor);
        voice
            .sink
            .set_volume(voice.volume * self.route_gain(voice.route) * tail);
    }

    fn open(&self, track: &TrackRef) -> AudioResult<(PathBuf, BufReader<File>)> {
        let path = self.config.resolve_file(track)?;
        let file = File::open(&path).map_err(|e| AudioError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok((path, BufReader::new(file)))
    }

    fn load_failed(path: &Path, e: &impl ToString) -> AudioError {
        AudioError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }

    fn voice_mut(&mut self, voice: VoiceHandle) -> AudioResult<&mut RodioVoice> {
        self.voices
            .get_mut(&voice)
            .ok_or(AudioError::InvalidHandle(voice))
    }
}

impl AudioBackend for RodioBackend {
    fn create_voice(&mut self, track: &TrackRef) -> AudioResult<VoiceHandle> {
        let (path, reader) = self.open(track)?;
        let source = Decoder::new_looped(reader).map_err(|e| Self::load_failed(&path, &e))?;

        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::SinkCreationFailed(e.to_string()))?;
        sink.pause();
        sink.append(source);

        let route = self.bus_index(self.config.route_for(track));
        let voice = RodioVoice {
            sink,
            track: track.clone(),
            volume: 1.0,
            route,
            started: false,
            paused: false,
            tail: None,
        };
        self.apply_volume(&voice);

        let handle = self.handle_gen.next();
        debug!("Created {} for {} ({})", handle, track, path.display());
        self.voices.insert(handle, voice);
        Ok(handle)
    }

    fn start_voice(&mut self, voice: VoiceHandle) -> AudioResult<()> {
        let entry = self.voice_mut(voice)?;
        entry.started = true;
        entry.tail = None;
        if !entry.paused {
            entry.sink.play();
        }
        Ok(())
    }

    fn stop_voice(&mut self, voice: VoiceHandle, mode: StopMode) -> AudioResult<()> {
        let tail_secs = self.config.stop_tail_secs;
        let entry = self.voice_mut(voice)?;
        match mode {
            StopMode::AllowFadeOut if tail_secs > 0.0 && entry.started && !entry.paused => {
                entry.tail = Some(Tail {
                    remaining: tail_secs,
                    total: tail_secs,
                });
            },
            _ => {
                entry.sink.stop();
                entry.started = false;
            },
        }
        Ok(())
    }

    fn release_voice(&mut self, voice: VoiceHandle) -> AudioResult<()> {
        let entry = self
            .voices
            .remove(&voice)
            .ok_or(AudioError::InvalidHandle(voice))?;

        match entry.tail {
            Some(tail) if tail.remaining > 0.0 => {
                let gain = entry.volume * self.route_gain(entry.route);
                self.draining.push(Draining {
                    sink: entry.sink,
                    gain,
                    tail,
                });
            },
            _ => entry.sink.stop(),
        }
        trace!("Released {}", voice);
        Ok(())
    }

    fn is_valid(&self, voice: VoiceHandle) -> bool {
        self.voices.contains_key(&voice)
    }

    fn voice_volume(&self, voice: VoiceHandle) -> AudioResult<f32> {
        self.voices
            .get(&voice)
            .map(|v| v.volume)
            .ok_or(AudioError::InvalidHandle(voice))
    }

    fn set_voice_volume(&mut self, voice: VoiceHandle, volume: f32) -> AudioResult<()> {
        self.voice_mut(voice)?.volume = clamp_volume(volume);
        if let Some(entry) = self.voices.get(&voice) {
            self.apply_volume(entry);
        }
        Ok(())
    }

    fn set_voice_paused(&mut self, voice: VoiceHandle, paused: bool) -> AudioResult<()> {
        let entry = self.voice_mut(voice)?;
        entry.paused = paused;
        if paused {
            entry.sink.pause();
        } else if entry.started {
            entry.sink.play();
        }
        Ok(())
    }

    fn attach_voice_to_anchor(&mut self, voice: VoiceHandle, _anchor: &Anchor) -> AudioResult<()> {
        if !self.voices.contains_key(&voice) {
            return Err(AudioError::InvalidHandle(voice));
        }
        Err(AudioError::Unsupported("3D attachment"))
    }

    fn resolve_bus(&mut self, path: &str) -> AudioResult<BusHandle> {
        self.bus_index(path)
            .map(|idx| BusHandle::new(idx as u32))
            .ok_or_else(|| AudioError::BusNotFound(path.to_string()))
    }

    fn bus_volume(&self, bus: BusHandle) -> AudioResult<f32> {
        self.buses
            .get(bus.index() as usize)
            .map(|b| b.volume)
            .ok_or(AudioError::InvalidBus(bus))
    }

    fn set_bus_volume(&mut self, bus: BusHandle, volume: f32) -> AudioResult<()> {
        let entry = self
            .buses
            .get_mut(bus.index() as usize)
            .ok_or(AudioError::InvalidBus(bus))?;
        entry.volume = clamp_volume(volume);

        for voice in self.voices.values() {
            self.apply_volume(voice);
        }
        Ok(())
    }

    fn fire_and_forget(&mut self, track: &TrackRef, position: Option<Vec3>) -> AudioResult<()> {
        let (path, reader) = self.open(track)?;
        let source = Decoder::new(reader).map_err(|e| Self::load_failed(&path, &e))?;

        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::SinkCreationFailed(e.to_string()))?;
        let route = self.bus_index(self.config.route_for(track));
        sink.set_volume(self.route_gain(route));
        sink.append(source);
        sink.detach();

        if let Some(position) = position {
            trace!("One-shot {} at {:?} played without spatialization", track, position);
        }
        debug!("Fired one-shot {}", track);
        Ok(())
    }

    fn update(&mut self, dt: f32) {
        let mut finished = Vec::new();
        for (handle, voice) in &mut self.voices {
            if let Some(tail) = voice.tail.as_mut() {
                tail.remaining -= dt;
                if tail.remaining <= 0.0 {
                    voice.sink.stop();
                    voice.started = false;
                    voice.tail = None;
                    finished.push(*handle);
                }
            }
        }
        for handle in finished {
            trace!("Stop tail of {} finished", handle);
        }
        for voice in self.voices.values() {
            if voice.tail.is_some() {
                self.apply_volume(voice);
            }
        }

        self.draining.retain_mut(|d| {
            d.tail.remaining -= dt;
            if d.tail.remaining <= 0.0 || d.sink.empty() {
                d.sink.stop();
                false
            } else {
                d.sink.set_volume(d.gain * d.tail.factor());
                true
            }
        });
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        if !self.voices.is_empty() {
            warn!("Rodio backend dropped with {} unreleased voices", self.voices.len());
        }
    }
}
