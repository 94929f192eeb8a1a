//! Push button abstraction

use std::fmt;

use crate::InputError;

/// A physical digital input, identified by its BCM GPIO number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputChannel(u8);

impl InputChannel {
    pub fn new(pin: u8) -> Self {
        Self(pin)
    }

    pub fn pin(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for InputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// A button that can be waited on and sampled
///
/// Implementations are owned by exactly one worker thread. Closing happens
/// on drop.
pub trait DigitalInput: Send {
    /// Block until the input is active
    ///
    /// Returns immediately if the input is already active. There is no
    /// timeout.
    fn wait_for_active(&mut self) -> Result<(), InputError>;

    /// Sample the current level
    fn is_active(&mut self) -> Result<bool, InputError>;
}

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn wait_for_active(&mut self) -> Result<(), InputError> {
        (**self).wait_for_active()
    }

    fn is_active(&mut self) -> Result<bool, InputError> {
        (**self).is_active()
    }
}
