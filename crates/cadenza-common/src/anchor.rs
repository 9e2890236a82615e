//! Emitter anchors.
//!
//! An [`Anchor`] is a shared, cheaply clonable view of a moving object's
//! transform. Game code owns the anchor and updates it every frame; the audio
//! engine reads it to keep attached voices positioned on the object.

use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;

use crate::ids::EmitterId;

/// Shared handle to a moving emitter.
#[derive(Debug, Clone)]
pub struct Anchor {
    id: EmitterId,
    position: Arc<RwLock<Vec3>>,
}

impl Anchor {
    /// Creates an anchor at the given position.
    #[must_use]
    pub fn new(position: Vec3) -> Self {
        Self {
            id: EmitterId::new(),
            position: Arc::new(RwLock::new(position)),
        }
    }

    /// Emitter identifier.
    #[must_use]
    pub const fn id(&self) -> EmitterId {
        self.id
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        *self.position.read()
    }

    /// Move the emitter. Every clone sees the new position.
    pub fn set_position(&self, position: Vec3) {
        *self.position.write() = position;
    }
}

impl PartialEq for Anchor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Anchor {}
