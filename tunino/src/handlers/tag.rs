use std::sync::Arc;
use std::time::Duration;

use tunino_hardware::{TagId, TagReader};

use crate::clock::Clock;
use crate::connection::DaemonConnection;
use crate::error::ActionError;
use crate::poller::{guarded, StepOutcome};
use crate::tracks::TagToTrackMap;

/// What a resolved tag tap did to playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutcome {
    /// Queue replaced with this track and started
    Started(String),
    /// Something is already playing; the tap is ignored
    AlreadyPlaying,
}

/// Start the track mapped to `tag`, unless playback is already running
///
/// The status check and the queue replacement are two separate locked
/// operations. The queue replacement itself is atomic.
pub fn handle_tag(
    connection: &DaemonConnection,
    tracks: &TagToTrackMap,
    tag: &TagId,
) -> Result<TagOutcome, ActionError> {
    let track = tracks
        .resolve(tag)
        .ok_or_else(|| ActionError::UnknownTag(tag.clone()))?;

    let status = connection.status()?;
    if status.state.is_playing() {
        tracing::info!("Already playing, ignoring tag {}", tag);
        return Ok(TagOutcome::AlreadyPlaying);
    }

    tracing::info!("Playing {}", track);
    connection.play_track(track)?;
    Ok(TagOutcome::Started(track.to_string()))
}

/// Blocks on the RFID reader and starts the mapped track on each tap
pub struct TagWorker {
    reader: Box<dyn TagReader>,
    tracks: Arc<TagToTrackMap>,
    quiescent: Duration,
    connection: Arc<DaemonConnection>,
    clock: Arc<dyn Clock>,
}

impl TagWorker {
    pub fn new(
        reader: Box<dyn TagReader>,
        tracks: Arc<TagToTrackMap>,
        quiescent: Duration,
        connection: Arc<DaemonConnection>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader,
            tracks,
            quiescent,
            connection,
            clock,
        }
    }

    /// Read one tag, act on it, then sleep the quiescent interval
    pub fn step(&mut self) -> StepOutcome {
        let outcome = match self.reader.read_tag() {
            Ok(tag) => {
                tracing::info!("RFID tag read: {}", tag);
                let connection = &self.connection;
                let tracks = &self.tracks;
                guarded("rfid", || handle_tag(connection, tracks, &tag).map(|_| ()))
            }
            Err(e) => {
                tracing::warn!("rfid reader failed: {}", e);
                StepOutcome::InputFailed
            }
        };
        self.clock.sleep(self.quiescent);
        outcome
    }

    pub fn run(mut self) -> ! {
        tracing::info!("rfid worker started with {} mapped tags", self.tracks.len());
        loop {
            self.step();
        }
    }
}
