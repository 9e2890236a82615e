//! Tick-driven volume fades.
//!
//! A [`Fade`] ramps one voice linearly from a start to an end volume over a
//! fixed duration. It is advanced by [`Fade::tick`] and checks its
//! [`TransitionToken`] before every step; a stale token ends the fade without
//! touching the voice again.
//!
//! A fade never stops or releases its voice. That is up to whoever owns the
//! handle.

use cadenza_common::{clamp_volume, lerp};
use cadenza_kernel::backend::AudioBackend;
use cadenza_kernel::handle::VoiceHandle;
use tracing::debug;

use crate::token::{TokenSource, TransitionToken};

/// Result of advancing a fade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeStatus {
    /// More ticks are needed.
    Running,
    /// The end volume has been applied.
    Completed,
    /// The token went stale; the voice was left as it was.
    Cancelled,
}

/// Linear volume ramp on one voice.
#[derive(Debug, Clone, Copy)]
pub struct Fade {
    voice: VoiceHandle,
    start: f32,
    end: f32,
    duration: f32,
    elapsed: f32,
    token: TransitionToken,
}

impl Fade {
    /// Create a fade. Volumes are clamped to `[0, 1]`, negative durations to 0.
    #[must_use]
    pub fn new(
        voice: VoiceHandle,
        start: f32,
        end: f32,
        duration: f32,
        token: TransitionToken,
    ) -> Self {
        Self {
            voice,
            start: clamp_volume(start),
            end: clamp_volume(end),
            duration: if duration.is_nan() { 0.0 } else { duration.max(0.0) },
            elapsed: 0.0,
            token,
        }
    }

    /// Apply the first step: the start volume, or the end volume when the
    /// duration is zero.
    pub fn begin<B: AudioBackend + ?Sized>(&self, engine: &mut B) -> FadeStatus {
        if self.duration <= 0.0 {
            self.apply(engine, self.end);
            FadeStatus::Completed
        } else {
            self.apply(engine, self.start);
            FadeStatus::Running
        }
    }

    /// Advance by `dt` seconds.
    pub fn tick<B: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut B,
        tokens: &TokenSource,
        dt: f32,
    ) -> FadeStatus {
        if !tokens.is_current(self.token) {
            return FadeStatus::Cancelled;
        }

        self.elapsed += dt.max(0.0);
        if self.duration <= 0.0 || self.elapsed >= self.duration {
            self.apply(engine, self.end);
            return FadeStatus::Completed;
        }

        self.apply(engine, lerp(self.start, self.end, self.progress()));
        FadeStatus::Running
    }

    /// Fraction of the duration elapsed, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }

    /// The voice being faded.
    #[must_use]
    pub const fn voice(&self) -> VoiceHandle {
        self.voice
    }

    fn apply<B: AudioBackend + ?Sized>(&self, engine: &mut B, volume: f32) {
        if let Err(e) = engine.set_voice_volume(self.voice, volume) {
            debug!("Fade on {} could not set volume: {}", self.voice, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_common::TrackRef;
    use cadenza_kernel::headless::HeadlessBackend;

    fn setup() -> (HeadlessBackend, TokenSource, VoiceHandle) {
        let mut engine = HeadlessBackend::new();
        let voice = engine
            .create_voice(&TrackRef::from("event:/Music/Level 01"))
            .expect("create");
        (engine, TokenSource::new(), voice)
    }

    fn volume(engine: &HeadlessBackend, voice: VoiceHandle) -> f32 {
        engine.voice_volume(voice).expect("volume")
    }

    #[test]
    fn test_fade_in_steps() {
        let (mut engine, mut tokens, voice) = setup();
        let mut fade = Fade::new(voice, 0.0, 1.0, 1.0, tokens.mint());

        assert_eq!(fade.begin(&mut engine), FadeStatus::Running);
        assert!(volume(&engine, voice).abs() < f32::EPSILON);

        assert_eq!(fade.tick(&mut engine, &tokens, 0.25), FadeStatus::Running);
        assert!((volume(&engine, voice) - 0.25).abs() < 1e-6);
        assert_eq!(fade.tick(&mut engine, &tokens, 0.25), FadeStatus::Running);
        assert!((volume(&engine, voice) - 0.5).abs() < 1e-6);
        assert_eq!(fade.tick(&mut engine, &tokens, 0.25), FadeStatus::Running);
        assert_eq!(fade.tick(&mut engine, &tokens, 0.25), FadeStatus::Completed);
        assert!((volume(&engine, voice) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zero_duration_completes_on_begin() {
        let (mut engine, mut tokens, voice) = setup();
        let fade = Fade::new(voice, 1.0, 0.0, 0.0, tokens.mint());

        assert_eq!(fade.begin(&mut engine), FadeStatus::Completed);
        assert!(volume(&engine, voice).abs() < f32::EPSILON);
    }

    #[test]
    fn test_overshoot_applies_end_volume() {
        let (mut engine, mut tokens, voice) = setup();
        let mut fade = Fade::new(voice, 1.0, 0.0, 0.5, tokens.mint());
        fade.begin(&mut engine);

        assert_eq!(fade.tick(&mut engine, &tokens, 2.0), FadeStatus::Completed);
        assert!(volume(&engine, voice).abs() < f32::EPSILON);
        assert!((fade.progress() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_stale_token_cancels_without_touching_volume() {
        let (mut engine, mut tokens, voice) = setup();
        let mut fade = Fade::new(voice, 0.0, 1.0, 1.0, tokens.mint());
        fade.begin(&mut engine);
        fade.tick(&mut engine, &tokens, 0.25);

        tokens.mint();
        assert_eq!(fade.tick(&mut engine, &tokens, 0.25), FadeStatus::Cancelled);
        assert!((volume(&engine, voice) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_negative_duration_is_instant() {
        let (mut engine, mut tokens, voice) = setup();
        let fade = Fade::new(voice, 0.0, 0.7, -3.0, tokens.mint());
        assert_eq!(fade.begin(&mut engine), FadeStatus::Completed);
        assert!((volume(&engine, voice) - 0.7).abs() < 1e-6);
    }
}
