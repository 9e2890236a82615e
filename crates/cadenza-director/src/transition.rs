//! BGM transition engine.
//!
//! Owns the single BGM slot and drives every multi-tick part of a music
//! change:
//!
//! ```text
//! play_bgm(track, fade, delay)
//!   │
//!   ├─ mint token ─────────────── earlier tokens go stale
//!   ├─ take slot as `old` ─────── FadeOut(old → 0) under the new token
//!   │                                 │
//!   │                                 ├─ Completed ─▶ retire(old)
//!   │                                 └─ Cancelled ─▶ retire(old)
//!   │
//!   └─ track empty? ─▶ done (stop request)
//!        │
//!        ▼
//!     Delaying ──(token stale)──▶ Cancelled   (no voice, no slot write)
//!        │
//!        ▼
//!     create + start at 0, publish to slot
//!        │
//!        ▼
//!     FadingIn(0 → 1) ──(token stale)──▶ Cancelled
//!        │
//!        ▼
//!     Settled
//! ```
//!
//! The slot is the ownership boundary for the incoming voice. Once a voice
//! is published, the next request takes it out of the slot and becomes
//! responsible for its single release; a superseded fade-in only stops
//! changing its volume. The published voice therefore ramps down from its
//! current volume over the new request's fade instead of being cut.
//! Every outgoing voice leaves through [`retire`], which stops and releases
//! it exactly once.

use cadenza_common::{StopMode, TrackRef, MAX_VOLUME, MIN_VOLUME};
use cadenza_kernel::backend::AudioBackend;
use cadenza_kernel::handle::VoiceHandle;
use tracing::{debug, info, warn};

use crate::fade::{Fade, FadeStatus};
use crate::token::{TokenSource, TransitionToken};

/// Observable state of the most recent BGM request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionPhase {
    /// Nothing requested yet, or the last request was a stop.
    Idle,
    /// Waiting before the new voice is created.
    Delaying {
        /// Seconds left to wait.
        remaining: f32,
    },
    /// New voice is fading in.
    FadingIn {
        /// Fade progress in `[0, 1]`.
        progress: f32,
    },
    /// New voice is at full volume.
    Settled,
    /// The request was superseded, torn down, or its voice could not start.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
enum PendingState {
    Delaying { remaining: f32 },
    FadingIn(Fade),
}

/// The in-flight part of the current request.
#[derive(Debug, Clone)]
struct Pending {
    token: TransitionToken,
    track: TrackRef,
    fade: f32,
    state: PendingState,
}

/// Detached fade-out of a replaced voice. Owns its handle.
#[derive(Debug, Clone, Copy)]
struct FadeOut {
    fade: Fade,
}

/// Sanitize a fade or delay argument.
fn non_negative(seconds: f32) -> f32 {
    if seconds.is_nan() {
        0.0
    } else {
        seconds.max(0.0)
    }
}

/// Stop a voice immediately and release it. The only exit for outgoing voices.
pub(crate) fn retire<B: AudioBackend + ?Sized>(engine: &mut B, voice: VoiceHandle) {
    if !engine.is_valid(voice) {
        debug!("{} already gone, nothing to retire", voice);
        return;
    }
    if let Err(e) = engine.stop_voice(voice, StopMode::Immediate) {
        debug!("Stopping {} failed: {}", voice, e);
    }
    if let Err(e) = engine.release_voice(voice) {
        warn!("Releasing {} failed: {}", voice, e);
    }
}

/// BGM slot, token source, and all in-flight fades.
#[derive(Debug, Default)]
pub struct BgmTransitions {
    tokens: TokenSource,
    slot: Option<VoiceHandle>,
    pending: Option<Pending>,
    fading_out: Vec<FadeOut>,
    outcome: Option<TransitionPhase>,
}

impl BgmTransitions {
    /// Create an engine with an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `track` as the new BGM. An empty track is a stop request.
    ///
    /// The current voice fades out over `fade` seconds. The new voice is
    /// created after `delay` seconds and fades in over `fade` seconds.
    /// `delay == 0` crossfades, `delay == fade` fades sequentially.
    pub fn play_bgm<B: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut B,
        track: &TrackRef,
        fade: f32,
        delay: f32,
    ) -> TransitionToken {
        let fade = non_negative(fade);
        let delay = non_negative(delay);
        let token = self.tokens.mint();

        if let Some(superseded) = self.pending.take() {
            debug!(
                "BGM request for {} superseded by generation {}",
                superseded.track,
                token.generation()
            );
        }

        if let Some(old) = self.slot.take() {
            self.begin_fade_out(engine, old, fade, token);
        }

        if track.is_empty() {
            info!("Stopping BGM (fade {fade:.2}s)");
            self.outcome = Some(TransitionPhase::Idle);
            return token;
        }

        info!("Playing BGM {} (fade {fade:.2}s, delay {delay:.2}s)", track);
        if delay > 0.0 {
            self.pending = Some(Pending {
                token,
                track: track.clone(),
                fade,
                state: PendingState::Delaying { remaining: delay },
            });
        } else {
            self.start_fade_in(engine, token, track.clone(), fade);
        }
        token
    }

    /// Fade out and release the current BGM. Mints exactly one token.
    ///
    /// Same path as `play_bgm` with an empty track, so `delay` has nothing to
    /// wait for.
    pub fn stop_bgm<B: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut B,
        fade: f32,
        delay: f32,
    ) -> TransitionToken {
        self.play_bgm(engine, &TrackRef::none(), fade, delay)
    }

    /// Advance every fade and delay by `dt` seconds.
    ///
    /// Outgoing fades are processed first so a sequential transition releases
    /// the old voice before the new one is created in the same tick.
    pub fn update<B: AudioBackend + ?Sized>(&mut self, engine: &mut B, dt: f32) {
        let dt = non_negative(dt);

        let tokens = &self.tokens;
        self.fading_out
            .retain_mut(|out| match out.fade.tick(engine, tokens, dt) {
                FadeStatus::Running => true,
                FadeStatus::Completed => {
                    debug!("Fade-out of {} finished", out.fade.voice());
                    retire(engine, out.fade.voice());
                    false
                },
                FadeStatus::Cancelled => {
                    debug!("Fade-out of {} superseded, stopping now", out.fade.voice());
                    retire(engine, out.fade.voice());
                    false
                },
            });

        let Some(mut pending) = self.pending.take() else {
            return;
        };
        if !self.tokens.is_current(pending.token) {
            debug!("BGM request for {} cancelled", pending.track);
            self.outcome = Some(TransitionPhase::Cancelled);
            return;
        }

        match pending.state {
            PendingState::Delaying { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    pending.state = PendingState::Delaying { remaining };
                    self.pending = Some(pending);
                } else {
                    self.start_fade_in(engine, pending.token, pending.track, pending.fade);
                }
            },
            PendingState::FadingIn(mut fade) => match fade.tick(engine, &self.tokens, dt) {
                FadeStatus::Running => {
                    pending.state = PendingState::FadingIn(fade);
                    self.pending = Some(pending);
                },
                FadeStatus::Completed => {
                    debug!("BGM {} settled", pending.track);
                    self.outcome = Some(TransitionPhase::Settled);
                },
                FadeStatus::Cancelled => {
                    debug!("BGM fade-in of {} cancelled", pending.track);
                    self.outcome = Some(TransitionPhase::Cancelled);
                },
            },
        }
    }

    /// Invalidate all tokens and stop and release every voice this engine
    /// owns, synchronously.
    pub fn shutdown<B: AudioBackend + ?Sized>(&mut self, engine: &mut B) {
        self.tokens.invalidate();
        if self.pending.take().is_some() {
            self.outcome = Some(TransitionPhase::Cancelled);
        }
        if let Some(voice) = self.slot.take() {
            retire(engine, voice);
        }
        for out in self.fading_out.drain(..) {
            retire(engine, out.fade.voice());
        }
    }

    /// Voice currently in the BGM slot.
    #[must_use]
    pub const fn current(&self) -> Option<VoiceHandle> {
        self.slot
    }

    /// Voices still fading out.
    #[must_use]
    pub fn fading_out(&self) -> Vec<VoiceHandle> {
        self.fading_out.iter().map(|out| out.fade.voice()).collect()
    }

    /// Generation of the most recent request.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.tokens.generation()
    }

    /// Whether any fade or delay still needs ticks.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some() || !self.fading_out.is_empty()
    }

    /// Phase of the most recent request.
    #[must_use]
    pub fn phase(&self) -> TransitionPhase {
        match &self.pending {
            Some(Pending {
                state: PendingState::Delaying { remaining },
                ..
            }) => TransitionPhase::Delaying {
                remaining: *remaining,
            },
            Some(Pending {
                state: PendingState::FadingIn(fade),
                ..
            }) => TransitionPhase::FadingIn {
                progress: fade.progress(),
            },
            None => self.outcome.unwrap_or(TransitionPhase::Idle),
        }
    }

    fn begin_fade_out<B: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut B,
        voice: VoiceHandle,
        fade: f32,
        token: TransitionToken,
    ) {
        if !engine.is_valid(voice) {
            debug!("Previous BGM {} is no longer valid", voice);
            return;
        }

        let start = engine.voice_volume(voice).unwrap_or(MAX_VOLUME);
        let out = Fade::new(voice, start, MIN_VOLUME, fade, token);
        match out.begin(engine) {
            FadeStatus::Running => self.fading_out.push(FadeOut { fade: out }),
            FadeStatus::Completed | FadeStatus::Cancelled => retire(engine, voice),
        }
    }

    fn start_fade_in<B: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut B,
        token: TransitionToken,
        track: TrackRef,
        fade: f32,
    ) {
        let voice = match engine.create_voice(&track) {
            Ok(voice) => voice,
            Err(e) => {
                warn!("Could not create BGM voice for {}: {}", track, e);
                self.outcome = Some(TransitionPhase::Cancelled);
                return;
            },
        };

        let started = engine
            .set_voice_volume(voice, MIN_VOLUME)
            .and_then(|()| engine.start_voice(voice));
        if let Err(e) = started {
            warn!("Could not start BGM {}: {}", track, e);
            retire(engine, voice);
            self.outcome = Some(TransitionPhase::Cancelled);
            return;
        }

        self.slot = Some(voice);
        let fade_in = Fade::new(voice, MIN_VOLUME, MAX_VOLUME, fade, token);
        match fade_in.begin(engine) {
            FadeStatus::Running => {
                self.pending = Some(Pending {
                    token,
                    track,
                    fade,
                    state: PendingState::FadingIn(fade_in),
                });
            },
            FadeStatus::Completed | FadeStatus::Cancelled => {
                self.outcome = Some(TransitionPhase::Settled);
            },
        }
    }
}
