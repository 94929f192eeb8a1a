//! Private MPD control session for tunino
//!
//! This crate provides a minimal blocking MPD session specifically designed
//! for the controller's needs: one long-lived socket, a handful of commands
//! and a typed status. The [`PlaybackSession`] and [`Connector`] traits are
//! the seam the controller is written against, so tests can substitute a
//! recording session for a real daemon.

mod error;
mod status;

pub use error::SessionError;
pub use status::{DaemonStatus, TransportState};

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Commands the controller issues against the playback daemon
///
/// Every method is one round trip. A session is not safe for interleaved
/// use; callers serialize access themselves.
pub trait PlaybackSession: Send {
    /// Query transport state and volume
    fn status(&mut self) -> Result<DaemonStatus, SessionError>;

    /// Toggle between playing and paused
    fn toggle_pause(&mut self) -> Result<(), SessionError>;

    /// Pause playback (no-op when already paused or stopped)
    fn pause(&mut self) -> Result<(), SessionError>;

    /// Set the mixer volume (0-100)
    fn set_volume(&mut self, volume: u8) -> Result<(), SessionError>;

    /// Remove every entry from the queue
    fn clear_queue(&mut self) -> Result<(), SessionError>;

    /// Append a track (path relative to the music directory, or URI)
    fn enqueue(&mut self, track: &str) -> Result<(), SessionError>;

    /// Start playing the first queue entry
    fn play_from_start(&mut self) -> Result<(), SessionError>;

    /// Protocol version announced by the daemon, for logging
    fn protocol_version(&self) -> String {
        "unknown".to_string()
    }
}

/// Opens new sessions to the daemon
///
/// Kept separate from the session so a dropped connection can be
/// re-established without recreating whoever owns it.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn PlaybackSession>, SessionError>;

    /// Human readable target, for logging
    fn describe(&self) -> String;
}

/// Connects to MPD over TCP
#[derive(Debug, Clone)]
pub struct MpdConnector {
    host: String,
    port: u16,
    timeout: Duration,
}

impl MpdConnector {
    /// Create a connector with default timeouts
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::from_secs(5),
        }
    }

    /// Override the connect/read/write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>, SessionError> {
        Ok((self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| SessionError::Network(e.to_string()))?
            .collect())
    }
}

/// Connect to the first address that accepts, in resolution order
///
/// `localhost` may resolve to `::1` first while MPD only listens on IPv4.
fn connect_any(addrs: &[SocketAddr], timeout: Duration) -> Result<(TcpStream, SocketAddr), SessionError> {
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(stream) => return Ok((stream, *addr)),
            Err(e) => {
                tracing::debug!("Connecting to MPD at {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }
    Err(SessionError::Network(match last_error {
        Some(e) => e.to_string(),
        None => "no address to connect to".to_string(),
    }))
}

impl Connector for MpdConnector {
    fn connect(&self) -> Result<Box<dyn PlaybackSession>, SessionError> {
        let (stream, addr) = connect_any(&self.resolve()?, self.timeout)?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|_| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|e| SessionError::Network(e.to_string()))?;

        let client = mpd::Client::new(stream)?;
        tracing::debug!("Opened MPD session to {}", addr);
        Ok(Box::new(MpdSession { client }))
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A live MPD session
pub struct MpdSession {
    client: mpd::Client<TcpStream>,
}

impl PlaybackSession for MpdSession {
    fn status(&mut self) -> Result<DaemonStatus, SessionError> {
        let status = self.client.status()?;
        Ok(DaemonStatus::from_raw_volume(status.state.into(), status.volume))
    }

    fn toggle_pause(&mut self) -> Result<(), SessionError> {
        Ok(self.client.toggle_pause()?)
    }

    fn pause(&mut self) -> Result<(), SessionError> {
        Ok(self.client.pause(true)?)
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), SessionError> {
        Ok(self.client.volume(volume.min(100) as i8)?)
    }

    fn clear_queue(&mut self) -> Result<(), SessionError> {
        Ok(self.client.clear()?)
    }

    fn enqueue(&mut self, track: &str) -> Result<(), SessionError> {
        let song = mpd::Song {
            file: track.to_string(),
            ..Default::default()
        };
        self.client.push(song)?;
        Ok(())
    }

    fn play_from_start(&mut self) -> Result<(), SessionError> {
        Ok(self.client.switch(0u32)?)
    }

    fn protocol_version(&self) -> String {
        let version = &self.client.version;
        format!("{}.{}.{}", version.0, version.1, version.2)
    }
}
