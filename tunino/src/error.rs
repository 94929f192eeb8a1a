use mpd_client::SessionError;
use thiserror::Error;
use tunino_hardware::TagId;

/// Failures of the shared daemon connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Could not connect to MPD at {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: SessionError,
    },

    #[error("Not connected to MPD")]
    Disconnected,

    #[error("MPD call failed: {0}")]
    Session(#[from] SessionError),
}

/// Failures of a dispatched input action
///
/// All of these are transient from the worker's point of view: they are
/// logged and the worker waits for the next trigger.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("No track mapped to tag {0}")]
    UnknownTag(TagId),
}

/// Failures playing a notification sound
#[derive(Error, Debug)]
pub enum SoundError {
    #[error("Sound asset not found: {0}")]
    MissingAsset(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed {
        program: &'static str,
        status: std::process::ExitStatus,
    },
}

/// Failures invoking system power-off
#[derive(Error, Debug)]
pub enum PowerError {
    #[error("No power-off command configured")]
    NoCommand,

    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
    },
}

/// Failures while starting the workers
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to spawn worker thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_conversion() {
        let error: ConnectionError = SessionError::Protocol("bad pair".to_string()).into();
        assert!(matches!(error, ConnectionError::Session(SessionError::Protocol(_))));

        let action: ActionError = error.into();
        assert_eq!(action.to_string(), "MPD call failed: Protocol error: bad pair");
    }

    #[test]
    fn test_error_display() {
        let error = ConnectionError::Connect {
            target: "localhost:6600".to_string(),
            source: SessionError::Network("connection refused".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "Could not connect to MPD at localhost:6600: Network error: connection refused"
        );

        let unknown = ActionError::UnknownTag(TagId::new("123"));
        assert_eq!(unknown.to_string(), "No track mapped to tag 123");
    }
}
