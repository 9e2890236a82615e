//! Per-category bus volumes.
//!
//! Buses are resolved once, when the director starts. A category whose bus
//! the engine does not know stays unmapped for the lifetime of the director;
//! reads and writes on it report [`DirectorError::BusNotFound`].

use cadenza_common::{clamp_volume, BusCategory, MAX_VOLUME, MIN_VOLUME};
use cadenza_kernel::backend::AudioBackend;
use cadenza_kernel::handle::BusHandle;
use tracing::{debug, warn};

use crate::config::BusPaths;
use crate::error::{DirectorError, DirectorResult};

const fn slot(category: BusCategory) -> usize {
    match category {
        BusCategory::Master => 0,
        BusCategory::Bgm => 1,
        BusCategory::Sfx => 2,
    }
}

/// Resolved bus handles per category.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusVolumes {
    handles: [Option<BusHandle>; 3],
}

impl BusVolumes {
    /// Value reported by [`Self::volume_or_sentinel`] for an unmapped bus.
    pub const UNAVAILABLE: f32 = -1.0;

    /// Resolve every category's bus. Each failure is logged once and leaves
    /// that category unmapped.
    pub fn resolve<B: AudioBackend + ?Sized>(engine: &mut B, paths: &BusPaths) -> Self {
        let mut handles = [None; 3];
        for category in BusCategory::all() {
            let path = paths.path(category);
            match engine.resolve_bus(path) {
                Ok(handle) => {
                    debug!("{} bus resolved at '{}'", category, path);
                    handles[slot(category)] = Some(handle);
                },
                Err(e) => warn!("{} bus unavailable: {}", category, e),
            }
        }
        Self { handles }
    }

    /// Engine handle of a category's bus.
    #[must_use]
    pub const fn handle(&self, category: BusCategory) -> Option<BusHandle> {
        self.handles[slot(category)]
    }

    /// Whether a category's bus was resolved.
    #[must_use]
    pub const fn is_mapped(&self, category: BusCategory) -> bool {
        self.handle(category).is_some()
    }

    /// Set a category volume, clamped to `[0, 1]`.
    pub fn set_volume<B: AudioBackend + ?Sized>(
        &self,
        engine: &mut B,
        category: BusCategory,
        volume: f32,
    ) -> DirectorResult<()> {
        let bus = self.mapped(category)?;
        let volume = clamp_volume(volume);
        engine.set_bus_volume(bus, volume)?;
        debug!("{} volume set to {:.2}", category, volume);
        Ok(())
    }

    /// Current volume of a category.
    pub fn volume<B: AudioBackend + ?Sized>(
        &self,
        engine: &B,
        category: BusCategory,
    ) -> DirectorResult<f32> {
        let bus = self.mapped(category)?;
        Ok(engine.bus_volume(bus)?)
    }

    /// Current volume, or [`Self::UNAVAILABLE`] when it cannot be read.
    #[must_use]
    pub fn volume_or_sentinel<B: AudioBackend + ?Sized>(
        &self,
        engine: &B,
        category: BusCategory,
    ) -> f32 {
        self.volume(engine, category).unwrap_or(Self::UNAVAILABLE)
    }

    /// Mute a category that is audible, or restore it to full volume.
    /// Returns the new volume.
    pub fn toggle<B: AudioBackend + ?Sized>(
        &self,
        engine: &mut B,
        category: BusCategory,
    ) -> DirectorResult<f32> {
        let next = if self.volume(&*engine, category)? > MIN_VOLUME {
            MIN_VOLUME
        } else {
            MAX_VOLUME
        };
        self.set_volume(engine, category, next)?;
        Ok(next)
    }

    fn mapped(&self, category: BusCategory) -> DirectorResult<BusHandle> {
        self.handle(category).ok_or_else(|| {
            warn!("{} bus is not mapped", category);
            DirectorError::BusNotFound(category)
        })
    }
}
