//! Blocking button loop shared by the play/pause and volume workers
//!
//! ```text
//! Idle -> WaitingForPress (blocks) -> Dispatch(action) -> quiescent sleep -> Idle
//! ```
//!
//! Whatever the action does wrong, an error or a panic, is logged and the
//! loop goes back to waiting. One broken button never takes down another
//! worker.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tunino_hardware::DigitalInput;

use crate::clock::Clock;
use crate::connection::DaemonConnection;
use crate::error::ActionError;

/// What a button does when pressed
pub trait ButtonAction: Send {
    /// Worker name used in log lines
    fn name(&self) -> &str;

    fn on_press(&mut self, connection: &DaemonConnection) -> Result<(), ActionError>;
}

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Handled,
    ActionFailed,
    InputFailed,
}

/// Run one dispatched action, converting errors and panics into log lines
pub(crate) fn guarded(name: &str, action: impl FnOnce() -> Result<(), ActionError>) -> StepOutcome {
    match panic::catch_unwind(AssertUnwindSafe(action)) {
        Ok(Ok(())) => StepOutcome::Handled,
        Ok(Err(e)) => {
            tracing::warn!("{} worker encountered error: {}", name, e);
            StepOutcome::ActionFailed
        }
        Err(payload) => {
            tracing::error!("{} worker action panicked: {}", name, panic_message(&*payload));
            StepOutcome::ActionFailed
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

/// One button, one action, forever
pub struct InputPoller<A> {
    input: Box<dyn DigitalInput>,
    action: A,
    quiescent: Duration,
    connection: Arc<DaemonConnection>,
    clock: Arc<dyn Clock>,
}

impl<A: ButtonAction> InputPoller<A> {
    pub fn new(
        input: Box<dyn DigitalInput>,
        action: A,
        quiescent: Duration,
        connection: Arc<DaemonConnection>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            input,
            action,
            quiescent,
            connection,
            clock,
        }
    }

    /// Wait for one press, dispatch it, then sleep the quiescent interval
    ///
    /// The connection lock is only held inside the action, never across the
    /// sleep.
    pub fn step(&mut self) -> StepOutcome {
        let outcome = match self.input.wait_for_active() {
            Ok(()) => {
                let connection = &self.connection;
                let action = &mut self.action;
                let name = action.name().to_string();
                guarded(&name, || action.on_press(connection))
            }
            Err(e) => {
                tracing::warn!("{} input failed: {}", self.action.name(), e);
                StepOutcome::InputFailed
            }
        };
        self.clock.sleep(self.quiescent);
        outcome
    }

    pub fn run(mut self) -> ! {
        tracing::info!("{} worker started", self.action.name());
        loop {
            self.step();
        }
    }
}
