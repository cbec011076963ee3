//! Terminal implementations of the host capabilities.
//!
//! On-device speech is echoed to stdout, cloud audio is handed to an
//! external player process when one is configured, and URLs are opened with
//! the platform's opener command.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use super::{AudioClip, AudioOutput, Navigator, OnDeviceSpeech, Playback};
use crate::error::{AgentError, Result};

/// Prints utterances instead of voicing them.
#[derive(Debug, Default)]
pub struct ConsoleSpeech;

impl OnDeviceSpeech for ConsoleSpeech {
    fn speak(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        for line in text.lines() {
            let _ = writeln!(out, "  (voice) {line}");
        }
        let _ = out.flush();
    }

    fn cancel(&self) {
        debug!("on-device speech cancelled");
    }
}

/// Plays clips through an external command such as `mpv` or `afplay`.
///
/// Without a player command clips are dropped and reported as finished.
#[derive(Debug, Clone)]
pub struct ProcessAudioOutput {
    player: Option<String>,
    scratch_dir: PathBuf,
}

impl ProcessAudioOutput {
    /// `player` is invoked as `<player> <file>`.
    pub fn new(player: Option<String>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            player: player.filter(|p| !p.trim().is_empty()),
            scratch_dir: scratch_dir.into(),
        }
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        "audio/wav" => "wav",
        _ => "bin",
    }
}

impl AudioOutput for ProcessAudioOutput {
    fn play(&self, clip: AudioClip) -> Result<Box<dyn Playback>> {
        let Some(player) = &self.player else {
            debug!(bytes = clip.bytes.len(), "no audio player configured, dropping clip");
            return Ok(Box::new(FinishedPlayback));
        };

        std::fs::create_dir_all(&self.scratch_dir)
            .map_err(|e| AgentError::Host(format!("cannot create audio scratch dir: {e}")))?;
        let path = self
            .scratch_dir
            .join(format!("utterance.{}", extension_for(&clip.mime_type)));
        std::fs::write(&path, &clip.bytes)
            .map_err(|e| AgentError::Host(format!("cannot write {}: {e}", path.display())))?;

        let child = Command::new(player)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AgentError::Host(format!("cannot start audio player {player}: {e}")))?;
        Ok(Box::new(ProcessPlayback { child }))
    }
}

struct FinishedPlayback;

impl Playback for FinishedPlayback {
    fn stop(&mut self) {}

    fn is_finished(&mut self) -> bool {
        true
    }
}

struct ProcessPlayback {
    child: Child,
}

impl Playback for ProcessPlayback {
    fn stop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("audio player already exited: {e}");
        }
        let _ = self.child.wait();
    }

    fn is_finished(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }
}

impl Drop for ProcessPlayback {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            self.stop();
        }
    }
}

/// Opens URLs with `open`, `xdg-open` or `start`.
#[derive(Debug, Default)]
pub struct SystemNavigator;

impl Navigator for SystemNavigator {
    fn open_url(&self, url: &str) -> Result<()> {
        println!("  (open) {url}");
        let mut command = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        } else {
            Command::new("xdg-open")
        };
        command
            .arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| {
                warn!("cannot open {url}: {e}");
                AgentError::Host(format!("cannot open {url}: {e}"))
            })
    }
}
