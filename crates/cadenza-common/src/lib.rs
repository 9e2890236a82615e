//! # Cadenza Common
//!
//! Common types shared by every Cadenza crate.
//!
//! This crate provides the vocabulary used at the boundary between the
//! audio director and the audio engine it drives:
//! - Track references (event paths and optional content ids)
//! - Bus categories and stop modes
//! - Emitter anchors for voices that follow a moving object
//! - Volume helpers (clamping, interpolation)
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod anchor;
pub mod category;
pub mod ids;
pub mod volume;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::anchor::*;
    pub use crate::category::*;
    pub use crate::ids::*;
    pub use crate::volume::*;
}

pub use prelude::*;
