//! Playback status as reported by the daemon

/// Transport state of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Currently playing audio
    Playing,
    /// Playback is paused
    Paused,
    /// Nothing is playing
    #[default]
    Stopped,
}

impl TransportState {
    pub fn is_playing(self) -> bool {
        self == TransportState::Playing
    }
}

impl From<mpd::status::State> for TransportState {
    fn from(state: mpd::status::State) -> Self {
        match state {
            mpd::status::State::Play => TransportState::Playing,
            mpd::status::State::Pause => TransportState::Paused,
            mpd::status::State::Stop => TransportState::Stopped,
        }
    }
}

/// The subset of `status` the controller cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DaemonStatus {
    pub state: TransportState,
    /// Mixer volume 0-100
    pub volume: u8,
}

impl DaemonStatus {
    pub fn new(state: TransportState, volume: u8) -> Self {
        Self { state, volume }
    }

    /// Build from a raw MPD volume, which is `-1` when no mixer is configured.
    pub fn from_raw_volume(state: TransportState, raw_volume: i8) -> Self {
        let volume = raw_volume.clamp(0, 100) as u8;
        Self { state, volume }
    }
}
