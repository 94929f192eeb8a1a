//! # tunino - physical controls for an MPD jukebox
//!
//! Buttons and an RFID reader drive a Music Player Daemon:
//!
//! - play/pause button toggles playback
//! - volume buttons step the mixer volume up and down
//! - tapping a mapped tag replaces the queue with that tag's track, unless
//!   something is already playing
//! - holding the power-off button pauses, plays a shutdown sound and halts
//!   the machine
//!
//! ## Architecture
//!
//! ```text
//! play-pause ─┐
//! volume-up ──┤
//! volume-down ┼──> DaemonConnection (Mutex) ──> MPD
//! power-off ──┤         ^
//! rfid ───────┘         │
//!                 mpd-keepalive (probe / reconnect)
//! ```
//!
//! Every worker is a blocking thread. The only shared mutable state is the
//! daemon session; it is reached through [`DaemonConnection::with_connection`],
//! which holds the lock for exactly one operation.

pub mod clock;
pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod poller;
pub mod power;
pub mod power_off;
pub mod sound;
pub mod supervisor;
pub mod tracks;

pub use clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{Config, ConfigError, ConfigLoader, Settings, Timings};
pub use connection::{ConnectionState, DaemonConnection, KeepaliveOutcome, KnownState, Playback};
pub use error::{ActionError, ConnectionError, PowerError, SoundError, SupervisorError};
pub use poller::{ButtonAction, InputPoller, StepOutcome};
pub use power::{PowerControl, SystemPower};
pub use power_off::{PowerOffOutcome, PowerOffWorker};
pub use sound::{NotificationSound, SoxAplaySound};
pub use supervisor::{Inputs, Supervisor, Workers};
pub use tracks::TagToTrackMap;
