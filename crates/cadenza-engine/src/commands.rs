//! Console commands.
//!
//! One command per line. Arguments are whitespace separated; wrap track
//! paths containing spaces in double quotes:
//!
//! ```text
//! bgm "event:/Music/Level 02" 1.0 2.0
//! loop rain event:/Ambience/Rain 0 0 5
//! vol bgm 0.5
//! ```
//!
//! The digits `1`..`9` and `0` alone replay the tester key bindings.

use cadenza_common::{BusCategory, StopMode, TrackRef};
use glam::Vec3;
use thiserror::Error;

/// Track fired by the `1` key.
pub const KEY_ONE_SHOT: &str = "event:/Weapons/Pistol";
/// Track started by the `2` key.
pub const KEY_BGM: &str = "event:/Music/Level 01";
/// Track started by the `3` key.
pub const KEY_BGM_DELAYED: &str = "event:/Music/Radio Station";
/// Loop id used by the `5` and `6` keys.
pub const KEY_LOOP_ID: &str = "X";
/// Track looped by the `5` key.
pub const KEY_LOOP: &str = "event:/Character/Player Footsteps";

/// Parse failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line.
    #[error("empty command")]
    Empty,
    /// First word is not a command.
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    /// A required argument is missing.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    /// An argument is not a number.
    #[error("not a number: '{0}'")]
    InvalidNumber(String),
    /// Not a bus category name.
    #[error("unknown bus '{0}' (master, bgm, sfx)")]
    UnknownBus(String),
    /// A quoted argument was not closed.
    #[error("unterminated quote")]
    UnterminatedQuote,
}

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Change the BGM.
    PlayBgm {
        /// New track.
        track: TrackRef,
        /// Fade seconds, or the configured default.
        fade: Option<f32>,
        /// Delay seconds, or the configured default.
        delay: Option<f32>,
    },
    /// Stop the BGM.
    StopBgm {
        /// Fade seconds, or the configured default.
        fade: Option<f32>,
    },
    /// Fire a one-shot.
    OneShot {
        /// Track to fire.
        track: TrackRef,
        /// World position.
        position: Option<Vec3>,
    },
    /// Start a named loop.
    Loop {
        /// Loop id.
        id: String,
        /// Track to loop.
        track: TrackRef,
        /// Emitter position.
        position: Option<Vec3>,
    },
    /// Move the emitter of an anchored loop.
    Move {
        /// Loop id.
        id: String,
        /// New emitter position.
        position: Vec3,
    },
    /// Stop a named loop.
    Unloop {
        /// Loop id.
        id: String,
        /// Stop mode.
        mode: StopMode,
    },
    /// Pause a loop.
    Pause(String),
    /// Resume a loop.
    Resume(String),
    /// Set a bus volume.
    Volume {
        /// Bus.
        category: BusCategory,
        /// New volume.
        value: f32,
    },
    /// Print a bus volume.
    ShowVolume(BusCategory),
    /// Mute or restore a bus.
    Toggle(BusCategory),
    /// Print director state.
    Status,
    /// Tear the director down.
    Destroy,
    /// Create a fresh director after `destroy`.
    Init,
    /// Print usage.
    Help,
    /// Exit.
    Quit,
}

/// Usage text.
pub const HELP: &str = "\
commands:
  bgm <track> [fade] [delay]     change background music
  stop [fade]                    fade out background music
  oneshot <track> [x y z]        fire a one-shot
  loop <id> <track> [x y z]      start a named loop
  move <id> <x y z>              move the emitter of a positioned loop
  unloop <id> [now]              stop a named loop
  pause <id> | resume <id>       pause or resume a loop
  vol <bus> [value]              show or set master/bgm/sfx volume
  toggle <bus>                   mute or restore a bus
  status                         show director state
  destroy                        shut the director down
  init                           start a new director after destroy
  quit
keys: 1 pistol, 2 bgm, 3 delayed bgm, 4 stop, 5 loop, 6 unloop,
      7 destroy, 8/9/0 toggle master/bgm/sfx";

/// Split a line into words, honouring double quotes.
fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_word = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            },
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            },
            c => {
                current.push(c);
                in_word = true;
            },
        }
    }

    if quoted {
        return Err(CommandError::UnterminatedQuote);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn number(word: &str) -> Result<f32, CommandError> {
    word.parse()
        .map_err(|_| CommandError::InvalidNumber(word.to_string()))
}

fn optional_number(word: Option<&String>) -> Result<Option<f32>, CommandError> {
    word.map(|w| number(w)).transpose()
}

fn position(words: &[String]) -> Result<Option<Vec3>, CommandError> {
    match words {
        [] => Ok(None),
        [x, y, z] => Ok(Some(Vec3::new(number(x)?, number(y)?, number(z)?))),
        _ => Err(CommandError::MissingArgument("x y z")),
    }
}

fn bus(word: Option<&String>) -> Result<BusCategory, CommandError> {
    let word = word.ok_or(CommandError::MissingArgument("bus"))?;
    BusCategory::from_name(word).ok_or_else(|| CommandError::UnknownBus(word.clone()))
}

fn required<'a>(word: Option<&'a String>, name: &'static str) -> Result<&'a String, CommandError> {
    word.ok_or(CommandError::MissingArgument(name))
}

impl Command {
    /// Map a tester key to its command.
    #[must_use]
    pub fn from_key(key: char) -> Option<Self> {
        let command = match key {
            '1' => Self::OneShot {
                track: KEY_ONE_SHOT.into(),
                position: None,
            },
            '2' => Self::PlayBgm {
                track: KEY_BGM.into(),
                fade: None,
                delay: None,
            },
            '3' => Self::PlayBgm {
                track: KEY_BGM_DELAYED.into(),
                fade: Some(1.0),
                delay: Some(2.0),
            },
            '4' => Self::StopBgm { fade: None },
            '5' => Self::Loop {
                id: KEY_LOOP_ID.to_string(),
                track: KEY_LOOP.into(),
                position: Some(Vec3::ZERO),
            },
            '6' => Self::Unloop {
                id: KEY_LOOP_ID.to_string(),
                mode: StopMode::AllowFadeOut,
            },
            '7' => Self::Destroy,
            '8' => Self::Toggle(BusCategory::Master),
            '9' => Self::Toggle(BusCategory::Bgm),
            '0' => Self::Toggle(BusCategory::Sfx),
            _ => return None,
        };
        Some(command)
    }

    /// Parse one console line.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let words = tokenize(line)?;
        let Some((head, args)) = words.split_first() else {
            return Err(CommandError::Empty);
        };

        let mut chars = head.chars();
        if let (Some(key), None) = (chars.next(), chars.next()) {
            if args.is_empty() {
                if let Some(command) = Self::from_key(key) {
                    return Ok(command);
                }
            }
        }

        match head.to_ascii_lowercase().as_str() {
            "bgm" | "play" => Ok(Self::PlayBgm {
                track: required(args.first(), "track")?.as_str().into(),
                fade: optional_number(args.get(1))?,
                delay: optional_number(args.get(2))?,
            }),
            "stop" => Ok(Self::StopBgm {
                fade: optional_number(args.first())?,
            }),
            "oneshot" | "shot" => Ok(Self::OneShot {
                track: required(args.first(), "track")?.as_str().into(),
                position: position(args.get(1..).unwrap_or_default())?,
            }),
            "loop" => Ok(Self::Loop {
                id: required(args.first(), "id")?.clone(),
                track: required(args.get(1), "track")?.as_str().into(),
                position: position(args.get(2..).unwrap_or_default())?,
            }),
            "move" => Ok(Self::Move {
                id: required(args.first(), "id")?.clone(),
                position: position(args.get(1..).unwrap_or_default())?
                    .ok_or(CommandError::MissingArgument("x y z"))?,
            }),
            "unloop" => Ok(Self::Unloop {
                id: required(args.first(), "id")?.clone(),
                mode: match args.get(1).map(String::as_str) {
                    Some("now" | "immediate") => StopMode::Immediate,
                    _ => StopMode::AllowFadeOut,
                },
            }),
            "pause" => Ok(Self::Pause(required(args.first(), "id")?.clone())),
            "resume" => Ok(Self::Resume(required(args.first(), "id")?.clone())),
            "vol" | "volume" => {
                let category = bus(args.first())?;
                match args.get(1) {
                    Some(value) => Ok(Self::Volume {
                        category,
                        value: number(value)?,
                    }),
                    None => Ok(Self::ShowVolume(category)),
                }
            },
            "toggle" | "mute" => Ok(Self::Toggle(bus(args.first())?)),
            "status" | "st" => Ok(Self::Status),
            "destroy" => Ok(Self::Destroy),
            "init" => Ok(Self::Init),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
