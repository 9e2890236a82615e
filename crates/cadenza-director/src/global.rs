//! Process-wide director.
//!
//! Convenience access for code that has no director to pass around. The
//! instance lives in thread-local storage on the thread that drives audio
//! (rodio output streams cannot cross threads) and is built lazily on first
//! use from the registered backend factory.
//!
//! ```text
//!   Uninit ──with()/init()/install()──▶ Live ──shutdown()──▶ ShutDown
//!                                         ▲                      │
//!                                         └──── init()/install() ┘
//! ```

use std::cell::RefCell;

use cadenza_kernel::backend::AudioBackend;
use cadenza_kernel::headless::HeadlessBackend;
use cadenza_kernel::rodio_backend::{RodioBackend, RodioConfig};
use tracing::{info, warn};

use crate::config::DirectorConfig;
use crate::director::AudioDirector;
use crate::error::{DirectorError, DirectorResult};

/// Director over a type-erased engine.
pub type SharedDirector = AudioDirector<Box<dyn AudioBackend>>;

/// Builds the engine for a lazily created director.
pub type BackendFactory = Box<dyn Fn() -> Box<dyn AudioBackend>>;

enum GlobalState {
    Uninit,
    Live(Box<SharedDirector>),
    ShutDown,
}

thread_local! {
    static DIRECTOR: RefCell<GlobalState> = const { RefCell::new(GlobalState::Uninit) };
    static FACTORY: RefCell<Option<BackendFactory>> = const { RefCell::new(None) };
}

/// Rodio on the default device, or the headless engine if no device opens.
#[must_use]
pub fn default_backend(config: RodioConfig) -> Box<dyn AudioBackend> {
    match RodioBackend::new(config) {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            warn!("Audio device unavailable ({e}), falling back to headless backend");
            Box::new(HeadlessBackend::new())
        },
    }
}

/// Register the factory used by lazy construction and [`init`].
pub fn set_backend_factory(factory: impl Fn() -> Box<dyn AudioBackend> + 'static) {
    FACTORY.with(|slot| *slot.borrow_mut() = Some(Box::new(factory)));
}

fn build_backend() -> Box<dyn AudioBackend> {
    FACTORY.with(|slot| match slot.borrow().as_ref() {
        Some(factory) => factory(),
        None => default_backend(RodioConfig::default()),
    })
}

fn replace(next: GlobalState) -> DirectorResult<()> {
    let previous = DIRECTOR.with(|cell| {
        cell.try_borrow_mut()
            .map(|mut state| std::mem::replace(&mut *state, next))
            .map_err(|_| DirectorError::Reentrant)
    })?;

    if let GlobalState::Live(mut director) = previous {
        director.shutdown();
    }
    Ok(())
}

/// Create the director from the registered factory, replacing any existing one.
pub fn init(config: DirectorConfig) -> DirectorResult<()> {
    let director = AudioDirector::new(build_backend(), config);
    replace(GlobalState::Live(Box::new(director)))?;
    info!("Global audio director initialized");
    Ok(())
}

/// Install a director over a given engine, replacing any existing one.
pub fn install<B: AudioBackend + 'static>(engine: B, config: DirectorConfig) -> DirectorResult<()> {
    let engine: Box<dyn AudioBackend> = Box::new(engine);
    replace(GlobalState::Live(Box::new(AudioDirector::new(engine, config))))
}

/// Tear the director down. [`with`] fails until [`init`] or [`install`].
pub fn shutdown() -> DirectorResult<()> {
    replace(GlobalState::ShutDown)
}

/// Whether a live director exists on this thread.
#[must_use]
pub fn is_live() -> bool {
    DIRECTOR.with(|cell| {
        cell.try_borrow()
            .map(|state| matches!(*state, GlobalState::Live(_)))
            .unwrap_or(true)
    })
}

/// Run `f` on the director, creating it first if needed.
pub fn with<R>(f: impl FnOnce(&mut SharedDirector) -> R) -> DirectorResult<R> {
    DIRECTOR.with(|cell| {
        let mut state = cell.try_borrow_mut().map_err(|_| DirectorError::Reentrant)?;
        if matches!(*state, GlobalState::Uninit) {
            let director = AudioDirector::new(build_backend(), DirectorConfig::default());
            *state = GlobalState::Live(Box::new(director));
        }
        match &mut *state {
            GlobalState::Live(director) => Ok(f(director)),
            GlobalState::ShutDown | GlobalState::Uninit => Err(DirectorError::ShutDown),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_common::BusCategory;

    // Each test runs on its own thread, so each sees a fresh thread-local.

    #[test]
    fn test_lazy_construction_uses_factory() {
        set_backend_factory(|| Box::new(HeadlessBackend::new()));
        assert!(!is_live());

        let generation = with(|d| {
            d.play_bgm("event:/Music/Level 01", 0.0, 0.0).expect("play");
            d.status().generation
        })
        .expect("with");

        assert_eq!(generation, 1);
        assert!(is_live());
    }

    #[test]
    fn test_shutdown_then_reinit() {
        install(HeadlessBackend::new(), DirectorConfig::default()).expect("install");
        with(|d| d.play_loop("rain", "event:/Ambience/Rain", None)).expect("with").expect("loop");

        shutdown().expect("shutdown");
        assert!(!is_live());
        assert!(matches!(with(|_| ()), Err(DirectorError::ShutDown)));

        set_backend_factory(|| Box::new(HeadlessBackend::new()));
        init(DirectorConfig::default()).expect("init");
        let loops = with(|d| d.loops().len()).expect("with");
        assert_eq!(loops, 0);
    }

    #[test]
    fn test_reentrant_access_is_an_error() {
        install(HeadlessBackend::new(), DirectorConfig::default()).expect("install");
        let inner = with(|_| with(|_| ())).expect("outer");
        assert!(matches!(inner, Err(DirectorError::Reentrant)));
    }

    #[test]
    fn test_install_replaces_existing() {
        install(HeadlessBackend::new(), DirectorConfig::default()).expect("install");
        with(|d| d.set_volume(BusCategory::Bgm, 0.2)).expect("with").expect("set");

        install(HeadlessBackend::new(), DirectorConfig::default()).expect("reinstall");
        let volume = with(|d| d.volume(BusCategory::Bgm)).expect("with").expect("get");
        assert!((volume - 1.0).abs() < f32::EPSILON);
    }
}
