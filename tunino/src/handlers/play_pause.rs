use crate::connection::DaemonConnection;
use crate::error::ActionError;
use crate::poller::ButtonAction;

/// Toggles between playing and paused
#[derive(Debug, Default)]
pub struct PlayPause;

impl ButtonAction for PlayPause {
    fn name(&self) -> &str {
        "play-pause"
    }

    fn on_press(&mut self, connection: &DaemonConnection) -> Result<(), ActionError> {
        tracing::info!("Play/Pause button pressed. Toggle play/pause.");
        connection.toggle_pause()?;
        Ok(())
    }
}
