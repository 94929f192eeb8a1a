//! Long-press power-off
//!
//! ```text
//! Idle -> Pressed(t0) -> Holding --(released)--> Idle
//!                           |
//!                           +--(held >= threshold)--> Shutdown
//! ```
//!
//! The shutdown sequence pauses playback, plays the shutdown sound, waits
//! the grace period and halts the machine. If halting fails the worker
//! waits for the button to be released and arms again, so one hold never
//! triggers two shutdowns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tunino_hardware::DigitalInput;

use crate::clock::Clock;
use crate::config::Timings;
use crate::connection::DaemonConnection;
use crate::error::PowerError;
use crate::power::PowerControl;
use crate::sound::{play_logged, NotificationSound, SHUTDOWN_SOUND};

/// One sample of a hold in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    Holding(Duration),
    Released(Duration),
    Reached(Duration),
}

/// Tracks one press from its start instant
#[derive(Debug, Clone, Copy)]
pub struct LongPress {
    threshold: Duration,
    started: Instant,
}

impl LongPress {
    pub fn start(threshold: Duration, now: Instant) -> Self {
        Self { threshold, started: now }
    }

    pub fn sample(&self, active: bool, now: Instant) -> Hold {
        let held = now.saturating_duration_since(self.started);
        if !active {
            Hold::Released(held)
        } else if held >= self.threshold {
            Hold::Reached(held)
        } else {
            Hold::Holding(held)
        }
    }
}

/// Result of one press cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOffOutcome {
    /// Let go before the threshold
    Released(Duration),
    /// Power-off command ran successfully
    ShutdownInvoked,
    /// Power-off command failed; armed again after release
    ShutdownFailed,
    InputFailed,
}

pub struct PowerOffWorker {
    input: Box<dyn DigitalInput>,
    connection: Arc<DaemonConnection>,
    sound: Arc<dyn NotificationSound>,
    power: Arc<dyn PowerControl>,
    timings: Timings,
    clock: Arc<dyn Clock>,
}

impl PowerOffWorker {
    pub fn new(
        input: Box<dyn DigitalInput>,
        connection: Arc<DaemonConnection>,
        sound: Arc<dyn NotificationSound>,
        power: Arc<dyn PowerControl>,
        timings: Timings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            input,
            connection,
            sound,
            power,
            timings,
            clock,
        }
    }

    /// Wait for a press and follow it until release or shutdown
    pub fn step(&mut self) -> PowerOffOutcome {
        if let Err(e) = self.input.wait_for_active() {
            tracing::warn!("power-off input failed: {}", e);
            self.clock.sleep(self.timings.power_off_rearm);
            return PowerOffOutcome::InputFailed;
        }

        let press = LongPress::start(self.timings.long_press_threshold, self.clock.now());
        loop {
            let active = self.input.is_active().unwrap_or_else(|e| {
                tracing::warn!("power-off input failed while held: {}", e);
                false
            });

            match press.sample(active, self.clock.now()) {
                Hold::Holding(_) => self.clock.sleep(self.timings.hold_poll_interval),
                Hold::Released(held) => {
                    tracing::debug!("Power-off button released after {:?}", held);
                    self.clock.sleep(self.timings.power_off_rearm);
                    return PowerOffOutcome::Released(held);
                }
                Hold::Reached(held) => {
                    tracing::info!("Poweroff button (long) pressed for {:?}. Shutting down.", held);
                    return match self.shut_down() {
                        Ok(()) => PowerOffOutcome::ShutdownInvoked,
                        Err(e) => {
                            tracing::error!("Power-off failed: {}", e);
                            self.wait_for_release();
                            PowerOffOutcome::ShutdownFailed
                        }
                    };
                }
            }
        }
    }

    fn shut_down(&self) -> Result<(), PowerError> {
        if let Err(e) = self.connection.pause() {
            tracing::warn!("Could not pause playback before power-off: {}", e);
        }
        play_logged(self.sound.as_ref(), SHUTDOWN_SOUND);
        self.clock.sleep(self.timings.shutdown_grace);
        self.power.power_off()
    }

    fn wait_for_release(&mut self) {
        while let Ok(true) = self.input.is_active() {
            self.clock.sleep(self.timings.hold_poll_interval);
        }
        self.clock.sleep(self.timings.power_off_rearm);
    }

    /// Loop until a shutdown was successfully invoked
    pub fn run(mut self) {
        tracing::info!("power-off worker started");
        loop {
            if self.step() == PowerOffOutcome::ShutdownInvoked {
                return;
            }
        }
    }
}
