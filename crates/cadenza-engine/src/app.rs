//! Interactive host loop.
//!
//! Installs the process-wide director, then alternates between draining
//! console commands and running fixed director ticks until `quit` or end of
//! input.

use std::collections::HashMap;
use std::fmt::Write as _;

use anyhow::{Context, Result};
use cadenza_common::{Anchor, BusCategory};
use cadenza_director::director::{AudioDirector, DirectorStatus};
use cadenza_director::error::{DirectorError, DirectorResult};
use cadenza_director::global;
use cadenza_director::transition::TransitionPhase;
use cadenza_kernel::backend::AudioBackend;
use cadenza_kernel::headless::HeadlessBackend;
use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, info, warn};

use crate::commands::{Command, CommandError, HELP};
use crate::config::CadenzaConfig;
use crate::console;
use crate::timing::TickTiming;

/// Host-side state that outlives individual commands.
#[derive(Debug, Default)]
pub struct Session {
    /// Emitters of anchored loops, by loop id.
    anchors: HashMap<String, Anchor>,
}

impl Session {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a director command and describe the outcome.
    ///
    /// Lifecycle commands (`destroy`, `init`, `help`, `quit`) are handled by
    /// the host loop and ignored here.
    pub fn execute<B: AudioBackend>(
        &mut self,
        director: &mut AudioDirector<B>,
        command: Command,
    ) -> DirectorResult<Option<String>> {
        let reply = match command {
            Command::PlayBgm { track, fade, delay } => {
                let config = director.config();
                let fade = fade.unwrap_or(config.default_fade);
                let delay = delay.unwrap_or(config.default_delay);
                director.play_bgm(track, fade, delay)?;
                None
            },
            Command::StopBgm { fade } => {
                let fade = fade.unwrap_or(director.config().default_fade);
                director.stop_bgm(fade, 0.0)?;
                None
            },
            Command::OneShot { track, position } => {
                match position {
                    Some(position) => director.play_one_shot_at(track, position)?,
                    None => director.play_one_shot(track)?,
                }
                None
            },
            Command::Loop { id, track, position } => {
                let fresh = !director.is_looping(&id);
                let anchor = position.map(Anchor::new);
                director.play_loop(&id, track, anchor.as_ref())?;
                if let (true, Some(anchor)) = (fresh, anchor) {
                    self.anchors.insert(id, anchor);
                }
                None
            },
            Command::Move { id, position } => match self.anchors.get(&id) {
                Some(anchor) => {
                    anchor.set_position(position);
                    None
                },
                None => Some(format!("loop '{id}' has no emitter")),
            },
            Command::Unloop { id, mode } => {
                self.anchors.remove(&id);
                director.stop_loop(&id, mode)?;
                None
            },
            Command::Pause(id) => {
                director.pause_loop(&id)?;
                None
            },
            Command::Resume(id) => {
                director.resume_loop(&id)?;
                None
            },
            Command::Volume { category, value } => {
                director.set_volume(category, value)?;
                Some(volume_line(category, director.volume(category)?))
            },
            Command::ShowVolume(category) => {
                Some(volume_line(category, director.volume(category)?))
            },
            Command::Toggle(category) => {
                let volume = director.toggle_volume(category)?;
                Some(volume_line(category, volume))
            },
            Command::Status => Some(describe(&director.status())),
            Command::Destroy | Command::Init | Command::Help | Command::Quit => None,
        };
        Ok(reply)
    }

    /// Forget all emitters.
    pub fn clear(&mut self) {
        self.anchors.clear();
    }
}

fn volume_line(category: BusCategory, volume: f32) -> String {
    format!("{category} volume: {volume:.2}")
}

/// One-line summary of a status snapshot.
#[must_use]
pub fn describe(status: &DirectorStatus) -> String {
    let mut line = String::new();
    let bgm = status
        .bgm
        .map_or_else(|| "none".to_string(), |voice| voice.to_string());
    let _ = write!(line, "bgm: {bgm}");

    let _ = match status.phase {
        TransitionPhase::Idle => write!(line, " (idle)"),
        TransitionPhase::Delaying { remaining } => write!(line, " (delaying {remaining:.2}s)"),
        TransitionPhase::FadingIn { progress } => {
            write!(line, " (fading in {:.0}%)", progress * 100.0)
        },
        TransitionPhase::Settled => write!(line, " (settled)"),
        TransitionPhase::Cancelled => write!(line, " (cancelled)"),
    };

    let _ = write!(
        line,
        ", fading out: {}, loops: [{}], generation: {}",
        status.fading_out,
        status.loops.join(", "),
        status.generation
    );
    if status.shut_down {
        line.push_str(", shut down");
    }
    line
}

fn make_backend(config: &CadenzaConfig) -> Box<dyn AudioBackend> {
    if config.headless {
        info!("Running on the headless audio backend");
        Box::new(HeadlessBackend::new())
    } else {
        global::default_backend(config.rodio.clone())
    }
}

/// Run the host until `quit` or end of input.
pub fn run(config: CadenzaConfig) -> Result<()> {
    let factory_config = config.clone();
    global::set_backend_factory(move || make_backend(&factory_config));
    global::init(config.director.clone()).context("failed to start audio director")?;

    if let Some(track) = &config.startup_bgm {
        let token = global::with(|d| d.play_bgm_default(track.as_str()))??;
        info!("Startup BGM {track} (generation {})", token.generation());
    }

    let (lines, _reader) = console::spawn_stdin_reader().context("failed to start console")?;
    let mut timing = TickTiming::new(config.tick_rate);
    let mut session = Session::new();

    println!("{HELP}");
    loop {
        match lines.recv_timeout(timing.tick_duration()) {
            Ok(line) => match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => handle(&config, &mut session, command),
                Err(CommandError::Empty) => {},
                Err(e) => println!("{e}"),
            },
            Err(RecvTimeoutError::Timeout) => {},
            Err(RecvTimeoutError::Disconnected) => {
                info!("Console closed");
                break;
            },
        }

        let dt = timing.fixed_dt();
        for _ in 0..timing.poll() {
            match global::with(|d| d.update(dt)) {
                Ok(Ok(())) | Ok(Err(DirectorError::ShutDown)) | Err(DirectorError::ShutDown) => {},
                Ok(Err(e)) | Err(e) => warn!("Tick failed: {e}"),
            }
        }
    }

    global::shutdown()?;
    debug!("Ran {} ticks", timing.ticks());
    Ok(())
}

fn handle(config: &CadenzaConfig, session: &mut Session, command: Command) {
    match command {
        Command::Help => println!("{HELP}"),
        Command::Destroy => {
            session.clear();
            match global::shutdown() {
                Ok(()) => println!("audio director destroyed"),
                Err(e) => println!("{e}"),
            }
        },
        Command::Init => {
            session.clear();
            match global::init(config.director.clone()) {
                Ok(()) => println!("audio director started"),
                Err(e) => println!("{e}"),
            }
        },
        command => {
            let echo = config.echo_status;
            let result = global::with(|d| {
                let reply = session.execute(d, command)?;
                let status = echo.then(|| describe(&d.status()));
                Ok::<_, DirectorError>((reply, status))
            });
            match result.and_then(|inner| inner) {
                Ok((reply, status)) => {
                    for line in reply.into_iter().chain(status) {
                        println!("{line}");
                    }
                },
                Err(e) => println!("{e}"),
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_common::{StopMode, TrackRef};
    use cadenza_director::config::DirectorConfig;
    use glam::Vec3;

    fn director() -> AudioDirector<HeadlessBackend> {
        AudioDirector::new(HeadlessBackend::new(), DirectorConfig::default())
    }

    fn run_ticks(director: &mut AudioDirector<HeadlessBackend>, n: usize) {
        for _ in 0..n {
            director.update(0.25).expect("tick");
        }
    }

    #[test]
    fn test_tester_key_sequence() {
        let mut director = director();
        let mut session = Session::new();

        for key in ['2', '1', '5', '3'] {
            let command = Command::from_key(key).expect("bound key");
            session.execute(&mut director, command).expect("execute");
            run_ticks(&mut director, 2);
        }
        run_ticks(&mut director, 16);

        let status = director.status();
        assert!(status.bgm.is_some());
        assert_eq!(status.phase, TransitionPhase::Settled);
        assert_eq!(status.loops, vec!["X".to_string()]);
        assert_eq!(director.engine().stats().one_shots, 1);

        let command = Command::from_key('6').expect("bound key");
        session.execute(&mut director, command).expect("unloop");
        assert!(session.anchors.is_empty());

        session
            .execute(&mut director, Command::from_key('4').expect("bound key"))
            .expect("stop");
        run_ticks(&mut director, 4);
        assert_eq!(director.engine().live_count(), 0);
    }

    #[test]
    fn test_toggle_reports_volume() {
        let mut director = director();
        let mut session = Session::new();

        let reply = session
            .execute(&mut director, Command::Toggle(BusCategory::Master))
            .expect("toggle");
        assert_eq!(reply.as_deref(), Some("MASTER volume: 0.00"));

        let reply = session
            .execute(&mut director, Command::Toggle(BusCategory::Master))
            .expect("toggle");
        assert_eq!(reply.as_deref(), Some("MASTER volume: 1.00"));
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut director = director();
        let mut session = Session::new();
        let reply = session
            .execute(
                &mut director,
                Command::Volume {
                    category: BusCategory::Sfx,
                    value: 3.0,
                },
            )
            .expect("volume");
        assert_eq!(reply.as_deref(), Some("SFX volume: 1.00"));
    }

    #[test]
    fn test_missing_loop_is_an_error() {
        let mut director = director();
        let mut session = Session::new();
        let result = session.execute(
            &mut director,
            Command::Unloop {
                id: "nope".to_string(),
                mode: StopMode::AllowFadeOut,
            },
        );
        assert!(matches!(result, Err(DirectorError::LoopNotFound(_))));
    }

    #[test]
    fn test_move_updates_attached_voice() {
        let mut director = director();
        let mut session = Session::new();
        session
            .execute(
                &mut director,
                Command::Loop {
                    id: "fire".to_string(),
                    track: TrackRef::from("event:/Ambience/Fire"),
                    position: Some(Vec3::new(0.0, 1.0, 0.0)),
                },
            )
            .expect("loop");

        let reply = session
            .execute(
                &mut director,
                Command::Move {
                    id: "fire".to_string(),
                    position: Vec3::new(3.0, 1.0, -2.0),
                },
            )
            .expect("move");
        assert_eq!(reply, None);

        let voice = director.loops().voice("fire").expect("voice");
        let record = director.engine().voice(voice).expect("record");
        assert_eq!(record.emitter(), session.anchors.get("fire").map(Anchor::id));
        assert_eq!(record.position(), Some(Vec3::new(3.0, 1.0, -2.0)));
    }

    #[test]
    fn test_move_without_emitter() {
        let mut director = director();
        let mut session = Session::new();
        session
            .execute(
                &mut director,
                Command::Loop {
                    id: "hum".to_string(),
                    track: TrackRef::from("event:/Ambience/Hum"),
                    position: None,
                },
            )
            .expect("loop");

        let reply = session
            .execute(
                &mut director,
                Command::Move {
                    id: "hum".to_string(),
                    position: Vec3::ONE,
                },
            )
            .expect("move");
        assert_eq!(reply.as_deref(), Some("loop 'hum' has no emitter"));
    }

    #[test]
    fn test_describe_status() {
        let mut director = director();
        let mut session = Session::new();
        session
            .execute(
                &mut director,
                Command::PlayBgm {
                    track: TrackRef::from("event:/Music/A"),
                    fade: Some(1.0),
                    delay: Some(0.5),
                },
            )
            .expect("bgm");

        let line = describe(&director.status());
        assert!(line.starts_with("bgm: none (delaying 0.50s)"));
        assert!(line.contains("generation: 1"));

        director.shutdown();
        assert!(describe(&director.status()).ends_with("shut down"));
    }
}
