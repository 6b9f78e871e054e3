//! Playback of synthesised audio.
//!
//! [`AudioPlayer::play`] runs until the clip finishes or the [`StopSignal`]
//! fires.  [`CommandPlayer`] hands the clip to an external program
//! (`ffplay` by default) through a scratch file and kills it on stop.

use async_trait::async_trait;
use tokio::process::Command;

use super::capture::{AudioClip, AudioError};
use super::stop::StopSignal;

/// Plays one clip to completion or until stopped.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, clip: &AudioClip, stop: StopSignal) -> Result<(), AudioError>;
}

/// Player for hosts without a configured playback program.
#[derive(Debug, Default, Clone)]
pub struct UnavailablePlayer;

#[async_trait]
impl AudioPlayer for UnavailablePlayer {
    async fn play(&self, _clip: &AudioClip, _stop: StopSignal) -> Result<(), AudioError> {
        Err(AudioError::Unavailable("no player command configured".into()))
    }
}

// ---------------------------------------------------------------------------
// CommandPlayer
// ---------------------------------------------------------------------------

/// Plays clips with an external command; the clip path is appended as the
/// last argument.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    /// Build from a command line such as `["ffplay", "-nodisp", "-autoexit"]`.
    ///
    /// Returns `None` for an empty command.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, clip: &AudioClip, mut stop: StopSignal) -> Result<(), AudioError> {
        if clip.is_empty() {
            return Ok(());
        }

        let scratch = tempfile::Builder::new()
            .prefix("agri-tts-")
            .suffix(&format!(".{}", clip.extension()))
            .tempfile()
            .map_err(|e| AudioError::Playback(e.to_string()))?;
        tokio::fs::write(scratch.path(), &clip.bytes)
            .await
            .map_err(|e| AudioError::Playback(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(scratch.path())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AudioError::Playback(format!("{}: {e}", self.program)))?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| AudioError::Playback(e.to_string()))?;
                if !status.success() {
                    return Err(AudioError::Playback(format!(
                        "{} exited with {status}",
                        self.program
                    )));
                }
            }
            _ = stop.stopped() => {
                log::debug!("playback: stopped early");
                let _ = child.kill().await;
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockPlayer (test only)
// ---------------------------------------------------------------------------

/// Records every clip it is asked to play.
#[cfg(test)]
#[derive(Default)]
pub struct MockPlayer {
    pub played: std::sync::Mutex<Vec<AudioClip>>,
}

#[cfg(test)]
#[async_trait]
impl AudioPlayer for MockPlayer {
    async fn play(&self, clip: &AudioClip, _stop: StopSignal) -> Result<(), AudioError> {
        self.played.lock().unwrap().push(clip.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandPlayer::from_command(&[]).is_none());
    }

    #[test]
    fn command_splits_program_and_args() {
        let cmd = vec!["ffplay".to_string(), "-nodisp".to_string()];
        let player = CommandPlayer::from_command(&cmd).unwrap();
        assert_eq!(player.program, "ffplay");
        assert_eq!(player.args, vec!["-nodisp".to_string()]);
    }

    #[tokio::test]
    async fn empty_clip_is_a_no_op() {
        let player = CommandPlayer::from_command(&["definitely-not-a-player".to_string()]).unwrap();
        let clip = AudioClip::wav(Vec::new());
        assert!(player.play(&clip, StopSignal::never()).await.is_ok());
    }

    #[tokio::test]
    async fn missing_program_reports_playback_error() {
        let player = CommandPlayer::from_command(&["definitely-not-a-player".to_string()]).unwrap();
        let clip = AudioClip::wav(vec![0; 8]);
        let err = player.play(&clip, StopSignal::never()).await.unwrap_err();
        assert!(matches!(err, AudioError::Playback(_)));
    }
}
