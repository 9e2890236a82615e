//! Stdin reader.
//!
//! Reading stdin blocks, so lines are read on a helper thread and handed to
//! the tick loop over a bounded channel. The channel disconnects when stdin
//! reaches end of file.

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

/// Lines buffered before the reader thread blocks.
const LINE_CAPACITY: usize = 64;

/// Forward lines from `input` to `sender` until EOF or the receiver is gone.
pub fn forward_lines<R: BufRead>(input: R, sender: &Sender<String>) {
    for line in input.lines() {
        match line {
            Ok(line) => {
                if sender.send(line).is_err() {
                    debug!("Console receiver dropped, reader exiting");
                    return;
                }
            },
            Err(e) => {
                warn!("Failed to read console input: {e}");
                return;
            },
        }
    }
    debug!("Console input closed");
}

/// Spawn the stdin reader thread.
pub fn spawn_stdin_reader() -> io::Result<(Receiver<String>, JoinHandle<()>)> {
    let (sender, receiver) = bounded(LINE_CAPACITY);
    let handle = thread::Builder::new()
        .name("cadenza-console".into())
        .spawn(move || forward_lines(io::stdin().lock(), &sender))?;
    Ok((receiver, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_forward_lines_until_eof() {
        let (sender, receiver) = bounded(8);
        forward_lines(Cursor::new("bgm a\nstop\n"), &sender);
        drop(sender);

        let lines: Vec<String> = receiver.iter().collect();
        assert_eq!(lines, vec!["bgm a", "stop"]);
    }

    #[test]
    fn test_forward_lines_stops_when_receiver_dropped() {
        let (sender, receiver) = bounded(8);
        drop(receiver);
        forward_lines(Cursor::new("a\nb\n"), &sender);
    }
}
