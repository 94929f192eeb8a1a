//! Startup and worker threads
//!
//! The supervisor owns the shared pieces (config, connection, sound,
//! power control, clock) and hands clones of them to one named thread
//! per input plus the keepalive thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use mpd_client::Connector;
use tunino_hardware::{DigitalInput, TagReader};

use crate::clock::Clock;
use crate::config::Config;
use crate::connection::DaemonConnection;
use crate::error::{ConnectionError, SupervisorError};
use crate::handlers::{PlayPause, TagWorker, VolumeButton, VolumeDelta};
use crate::poller::InputPoller;
use crate::power::PowerControl;
use crate::power_off::PowerOffWorker;
use crate::sound::{play_logged, NotificationSound, STARTUP_SOUND};

/// The physical inputs, already opened
pub struct Inputs {
    pub play_pause: Box<dyn DigitalInput>,
    pub volume_up: Box<dyn DigitalInput>,
    pub volume_down: Box<dyn DigitalInput>,
    pub power_off: Box<dyn DigitalInput>,
    pub reader: Box<dyn TagReader>,
}

pub struct Supervisor {
    config: Arc<Config>,
    connection: Arc<DaemonConnection>,
    sound: Arc<dyn NotificationSound>,
    power: Arc<dyn PowerControl>,
    clock: Arc<dyn Clock>,
}

impl Supervisor {
    /// Connect to the daemon and apply the initial volume
    ///
    /// Fails if the daemon is unreachable; there is no retry at startup.
    pub fn connect(
        config: Arc<Config>,
        connector: Box<dyn Connector>,
        sound: Arc<dyn NotificationSound>,
        power: Arc<dyn PowerControl>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConnectionError> {
        let connection = DaemonConnection::connect(connector, config.settings.initial_volume)?;
        Ok(Self {
            config,
            connection: Arc::new(connection),
            sound,
            power,
            clock,
        })
    }

    pub fn connection(&self) -> &Arc<DaemonConnection> {
        &self.connection
    }

    /// Spawn every worker thread
    pub fn start(&self, inputs: Inputs) -> Result<Workers, SupervisorError> {
        let settings = &self.config.settings;
        let timings = settings.timings.clone();
        let mut workers = Workers::default();

        let play_pause = InputPoller::new(
            inputs.play_pause,
            PlayPause,
            timings.play_pause_debounce,
            self.connection.clone(),
            self.clock.clone(),
        );
        workers.spawn("play-pause", move || {
            play_pause.run();
        })?;

        let volume_up = InputPoller::new(
            inputs.volume_up,
            VolumeButton::new(VolumeDelta::up(settings.volume_step)),
            timings.volume_debounce,
            self.connection.clone(),
            self.clock.clone(),
        );
        workers.spawn("volume-up", move || {
            volume_up.run();
        })?;

        let volume_down = InputPoller::new(
            inputs.volume_down,
            VolumeButton::new(VolumeDelta::down(settings.volume_step)),
            timings.volume_debounce,
            self.connection.clone(),
            self.clock.clone(),
        );
        workers.spawn("volume-down", move || {
            volume_down.run();
        })?;

        let power_off = PowerOffWorker::new(
            inputs.power_off,
            self.connection.clone(),
            self.sound.clone(),
            self.power.clone(),
            timings.clone(),
            self.clock.clone(),
        );
        workers.spawn("power-off", move || power_off.run())?;

        let tags = TagWorker::new(
            inputs.reader,
            Arc::new(self.config.tracks.clone()),
            timings.tag_debounce,
            self.connection.clone(),
            self.clock.clone(),
        );
        workers.spawn("rfid", move || {
            tags.run();
        })?;

        let connection = self.connection.clone();
        let clock = self.clock.clone();
        let interval = timings.keepalive_interval;
        workers.spawn("mpd-keepalive", move || {
            connection.keep_alive(interval, clock.as_ref());
        })?;

        Ok(workers)
    }

    /// Start the workers, announce readiness and wait on them
    pub fn run(&self, inputs: Inputs) -> Result<(), SupervisorError> {
        let workers = self.start(inputs)?;
        tracing::info!("All workers started. Ready to go.");
        play_logged(self.sound.as_ref(), STARTUP_SOUND);
        workers.join();
        Ok(())
    }
}

/// Handles of the running worker threads
#[derive(Default)]
pub struct Workers {
    handles: Vec<(String, JoinHandle<()>)>,
}

impl Workers {
    fn spawn(&mut self, name: &str, f: impl FnOnce() + Send + 'static) -> Result<(), SupervisorError> {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(f)
            .map_err(|source| SupervisorError::Spawn {
                name: name.to_string(),
                source,
            })?;
        tracing::debug!("Spawned {} worker", name);
        self.handles.push((name.to_string(), handle));
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Block until every worker has exited
    pub fn join(self) {
        for (name, handle) in self.handles {
            match handle.join() {
                Ok(()) => tracing::info!("{} worker exited", name),
                Err(_) => tracing::error!("{} worker panicked", name),
            }
        }
    }
}
