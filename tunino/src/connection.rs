//! Shared MPD connection
//!
//! One [`DaemonConnection`] is created at startup and handed to every worker
//! as an `Arc`. The session behind it is stateful and must never see
//! interleaved commands, so every access goes through
//! [`DaemonConnection::with_connection`], which holds a mutex for exactly one
//! logical operation. Only the keepalive worker re-establishes a dropped
//! session; everyone else reports the failure and tries again on their next
//! trigger.

use std::time::Duration;

use mpd_client::{Connector, DaemonStatus, PlaybackSession, SessionError, TransportState};
use parking_lot::Mutex;

use crate::clock::Clock;
use crate::error::ConnectionError;

/// Whether a session is currently open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Last values observed on the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownState {
    pub connection: ConnectionState,
    pub volume: Option<u8>,
    pub transport: Option<TransportState>,
}

impl KnownState {
    fn disconnected() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            volume: None,
            transport: None,
        }
    }

    fn record(&mut self, status: DaemonStatus) {
        self.volume = Some(status.volume);
        self.transport = Some(status.state);
    }
}

/// Result of one keepalive probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveOutcome {
    /// The status query succeeded
    Alive,
    /// The session had dropped and a new one was opened
    Reconnected,
    /// The session is down and reconnecting failed; retried next tick
    StillDown,
}

/// Exclusive view of the session for the duration of one operation
///
/// Handed to the closure passed to [`DaemonConnection::with_connection`].
/// Keeps the last-known state up to date as commands succeed.
pub struct Playback<'a> {
    session: &'a mut dyn PlaybackSession,
    known: &'a mut KnownState,
}

impl Playback<'_> {
    pub fn status(&mut self) -> Result<DaemonStatus, SessionError> {
        let status = self.session.status()?;
        self.known.record(status);
        Ok(status)
    }

    pub fn toggle_pause(&mut self) -> Result<(), SessionError> {
        self.session.toggle_pause()?;
        self.known.transport = None;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.session.pause()?;
        if self.known.transport == Some(TransportState::Playing) {
            self.known.transport = Some(TransportState::Paused);
        }
        Ok(())
    }

    pub fn set_volume(&mut self, volume: u8) -> Result<(), SessionError> {
        let volume = volume.min(100);
        self.session.set_volume(volume)?;
        self.known.volume = Some(volume);
        Ok(())
    }

    pub fn clear_queue(&mut self) -> Result<(), SessionError> {
        self.session.clear_queue()?;
        self.known.transport = Some(TransportState::Stopped);
        Ok(())
    }

    pub fn enqueue(&mut self, track: &str) -> Result<(), SessionError> {
        self.session.enqueue(track)
    }

    pub fn play_from_start(&mut self) -> Result<(), SessionError> {
        self.session.play_from_start()?;
        self.known.transport = Some(TransportState::Playing);
        Ok(())
    }
}

struct Slot {
    session: Option<Box<dyn PlaybackSession>>,
    known: KnownState,
}

/// The single, mutex-guarded session to the playback daemon
pub struct DaemonConnection {
    connector: Box<dyn Connector>,
    slot: Mutex<Slot>,
}

impl DaemonConnection {
    /// Open the session and apply the starting volume
    pub fn connect(connector: Box<dyn Connector>, initial_volume: u8) -> Result<Self, ConnectionError> {
        let target = connector.describe();
        let session = connector
            .connect()
            .map_err(|source| ConnectionError::Connect {
                target: target.clone(),
                source,
            })?;
        tracing::info!("Connected to MPD {} at {}", session.protocol_version(), target);

        let connection = Self {
            connector,
            slot: Mutex::new(Slot {
                session: Some(session),
                known: KnownState {
                    connection: ConnectionState::Connected,
                    volume: None,
                    transport: None,
                },
            }),
        };

        tracing::info!("Setting initial volume to {}", initial_volume);
        connection.set_volume(initial_volume)?;
        Ok(connection)
    }

    /// Run one operation with exclusive access to the session
    ///
    /// The lock is released when `op` returns, whether it succeeded or not.
    /// Fails with [`ConnectionError::Disconnected`] while the keepalive worker
    /// has no session.
    pub fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut Playback<'_>) -> Result<T, SessionError>,
    ) -> Result<T, ConnectionError> {
        let mut slot = self.slot.lock();
        let Slot { session, known } = &mut *slot;
        let session = session.as_deref_mut().ok_or(ConnectionError::Disconnected)?;
        let mut playback = Playback { session, known };
        Ok(op(&mut playback)?)
    }

    pub fn status(&self) -> Result<DaemonStatus, ConnectionError> {
        self.with_connection(|p| p.status())
    }

    pub fn toggle_pause(&self) -> Result<(), ConnectionError> {
        self.with_connection(|p| p.toggle_pause())
    }

    pub fn pause(&self) -> Result<(), ConnectionError> {
        self.with_connection(|p| p.pause())
    }

    pub fn set_volume(&self, volume: u8) -> Result<(), ConnectionError> {
        self.with_connection(|p| p.set_volume(volume))
    }

    /// Replace the queue with one track and start it
    ///
    /// Clear, add and play run under a single lock so no other worker can
    /// land a command in between.
    pub fn play_track(&self, track: &str) -> Result<(), ConnectionError> {
        self.with_connection(|p| {
            p.clear_queue()?;
            p.enqueue(track)?;
            p.play_from_start()
        })
    }

    /// Snapshot of the last-known daemon state
    pub fn known_state(&self) -> KnownState {
        self.slot.lock().known
    }

    /// Probe the session once, re-opening it if the probe fails
    pub fn keepalive_tick(&self) -> KeepaliveOutcome {
        let mut guard = self.slot.lock();
        let slot = &mut *guard;

        if let Some(session) = slot.session.as_mut() {
            match session.status() {
                Ok(status) => {
                    tracing::debug!("MPD keepalive ok: {:?}", status);
                    slot.known.record(status);
                    return KeepaliveOutcome::Alive;
                }
                // Any failure reopens the session, an ACK from MPD included
                Err(e) => {
                    tracing::warn!("MPD keepalive encountered error: {}", e);
                }
            }
        }

        // Dropping the session closes the socket
        slot.session = None;
        slot.known = KnownState::disconnected();

        tracing::info!("Reconnecting to MPD at {}", self.connector.describe());
        match self.connector.connect() {
            Ok(session) => {
                tracing::info!("Connected to MPD {}", session.protocol_version());
                slot.session = Some(session);
                slot.known.connection = ConnectionState::Connected;
                KeepaliveOutcome::Reconnected
            }
            Err(e) => {
                tracing::error!("Reconnecting to MPD failed, retrying next keepalive: {}", e);
                KeepaliveOutcome::StillDown
            }
        }
    }

    /// Probe forever, every `interval`
    ///
    /// `interval` must stay below MPD's `connection_timeout` or idle sessions
    /// are dropped between probes.
    pub fn keep_alive(&self, interval: Duration, clock: &dyn Clock) -> ! {
        loop {
            self.keepalive_tick();
            clock.sleep(interval);
        }
    }
}
