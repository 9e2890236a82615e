//! Engine handles.
//!
//! Voices and buses are addressed through small `Copy` handles handed out by
//! the engine. A handle says nothing about liveness on its own; ask the
//! engine with [`AudioBackend::is_valid`](crate::backend::AudioBackend::is_valid).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reference to one playing sound instance in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle {
    id: u64,
}

impl VoiceHandle {
    /// Create a handle from a raw ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self { id }
    }

    /// Get the raw ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Create a null/invalid handle.
    #[must_use]
    pub const fn null() -> Self {
        Self { id: u64::MAX }
    }

    /// Check if this is a null handle.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.id == u64::MAX
    }
}

impl Default for VoiceHandle {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("voice#null")
        } else {
            write!(f, "voice#{}", self.id)
        }
    }
}

/// Reference to a mixer bus in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusHandle(u32);

impl BusHandle {
    /// Create a bus handle from a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the raw index.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.0
    }
}

/// Voice handle generator for unique IDs.
#[derive(Debug)]
pub struct HandleGenerator {
    next_id: AtomicU64,
}

impl Default for HandleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleGenerator {
    /// Create a new handle generator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
        }
    }

    /// Generate a new unique handle.
    pub fn next(&self) -> VoiceHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        VoiceHandle::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_handle() {
        let handle = VoiceHandle::new(42);
        assert_eq!(handle.id(), 42);
        assert!(!handle.is_null());

        let null = VoiceHandle::null();
        assert!(null.is_null());
        assert_eq!(VoiceHandle::default(), null);
    }

    #[test]
    fn test_handle_generator() {
        let gen = HandleGenerator::new();
        let h1 = gen.next();
        let h2 = gen.next();
        let h3 = gen.next();

        assert_ne!(h1.id(), h2.id());
        assert_ne!(h2.id(), h3.id());
        assert!(!h1.is_null());
    }

    #[test]
    fn test_display() {
        assert_eq!(VoiceHandle::new(3).to_string(), "voice#3");
        assert_eq!(VoiceHandle::null().to_string(), "voice#null");
    }
}
