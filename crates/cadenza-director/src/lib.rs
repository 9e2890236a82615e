//! # Cadenza Director
//!
//! Runtime audio coordination on top of a [`cadenza_kernel`] engine.
//!
//! This crate provides:
//! - A single background-music slot with race-free crossfades
//! - Named looping voices, optionally attached to moving emitters
//! - One-shot passthrough
//! - Per-category bus volumes (master, BGM, SFX)
//! - A thread-local process-wide director
//!
//! ## Transitions
//!
//! BGM changes may be requested at any moment, including while an earlier
//! change is still fading. Each request mints a new generation token; older
//! fades see their token go stale and stop. Every replaced voice is faded
//! out and released exactly once.
//!
//! ## Ticking
//!
//! Nothing happens between calls. Drive the director with
//! [`AudioDirector::update`](director::AudioDirector::update) once per
//! frame, passing the elapsed time in seconds.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod buses;
pub mod config;
pub mod director;
pub mod error;
pub mod fade;
pub mod global;
pub mod loops;
pub mod token;
pub mod transition;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buses::*;
    pub use crate::config::*;
    pub use crate::director::*;
    pub use crate::error::*;
    pub use crate::fade::*;
    pub use crate::loops::*;
    pub use crate::token::*;
    pub use crate::transition::{BgmTransitions, TransitionPhase};
}
