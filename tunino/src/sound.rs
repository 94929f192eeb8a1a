//! Notification sounds
//!
//! Clips are scaled by `sox` and streamed into `aplay` on the configured
//! ALSA device, the same pipeline a shell would run:
//! `sox -v GAIN FILE -t wav - | aplay -D DEVICE`.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::SoundError;

pub const STARTUP_SOUND: &str = "startup_sound.wav";
pub const SHUTDOWN_SOUND: &str = "shutdown_sound.wav";

pub trait NotificationSound: Send + Sync {
    /// Play `asset` and block until it finishes
    fn play(&self, asset: &str) -> Result<(), SoundError>;
}

/// Play a clip and log instead of failing; sounds are never fatal
pub fn play_logged(sound: &dyn NotificationSound, asset: &str) {
    if let Err(e) = sound.play(asset) {
        tracing::warn!("Could not play {}: {}", asset, e);
    }
}

/// `sox | aplay` player for clips in one assets directory
#[derive(Debug, Clone)]
pub struct SoxAplaySound {
    assets_dir: PathBuf,
    device: String,
    gain: f32,
}

impl SoxAplaySound {
    pub fn new(assets_dir: impl Into<PathBuf>, device: impl Into<String>, gain: f32) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            device: device.into(),
            gain,
        }
    }

    pub fn asset_path(&self, asset: &str) -> PathBuf {
        self.assets_dir.join(asset)
    }

    fn spawn_pipeline(&self, path: &Path) -> Result<(), SoundError> {
        let mut sox = Command::new("sox")
            .arg("-v")
            .arg(self.gain.to_string())
            .arg(path)
            .args(["-t", "wav", "-"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SoundError::Spawn { program: "sox", source })?;

        let Some(sox_out) = sox.stdout.take() else {
            let _ = sox.kill();
            let _ = sox.wait();
            return Err(SoundError::Spawn {
                program: "sox",
                source: std::io::Error::other("sox stdout was not captured"),
            });
        };

        let aplay = Command::new("aplay")
            .args(["-q", "-D", &self.device])
            .stdin(Stdio::from(sox_out))
            .status();

        let sox_status = sox
            .wait()
            .map_err(|source| SoundError::Spawn { program: "sox", source })?;
        let aplay_status = aplay.map_err(|source| SoundError::Spawn { program: "aplay", source })?;

        if !sox_status.success() {
            return Err(SoundError::Failed {
                program: "sox",
                status: sox_status,
            });
        }
        if !aplay_status.success() {
            return Err(SoundError::Failed {
                program: "aplay",
                status: aplay_status,
            });
        }
        Ok(())
    }
}

impl NotificationSound for SoxAplaySound {
    fn play(&self, asset: &str) -> Result<(), SoundError> {
        let path = self.asset_path(asset);
        if !path.is_file() {
            return Err(SoundError::MissingAsset(path.display().to_string()));
        }
        tracing::debug!("Playing {} on {}", path.display(), self.device);
        self.spawn_pipeline(&path)
    }
}
