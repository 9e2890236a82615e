//! Volume helpers.

/// Lowest representable voice or bus volume.
pub const MIN_VOLUME: f32 = 0.0;

/// Highest representable voice or bus volume.
pub const MAX_VOLUME: f32 = 1.0;

/// Clamp a volume to `[0, 1]`. NaN maps to silence.
#[must_use]
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        MIN_VOLUME
    } else {
        volume.clamp(MIN_VOLUME, MAX_VOLUME)
    }
}

/// Linear interpolation with `t` clamped to `[0, 1]`.
#[must_use]
pub fn lerp(start: f32, end: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    start + (end - start) * t
}
