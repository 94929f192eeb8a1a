//! Push buttons on Raspberry Pi GPIO

use rppal::gpio::{Gpio, InputPin, Trigger};

use crate::{DigitalInput, InputChannel, InputError};

/// A normally-open push button wired between the pin and ground
///
/// The internal pull-up keeps the line high; a press pulls it low.
pub struct GpioButton {
    channel: InputChannel,
    pin: InputPin,
}

impl GpioButton {
    pub fn open(channel: InputChannel) -> Result<Self, InputError> {
        let mut pin = Gpio::new()?.get(channel.pin())?.into_input_pullup();
        pin.set_interrupt(Trigger::FallingEdge, None)?;
        tracing::debug!("Opened button on {}", channel);
        Ok(Self { channel, pin })
    }

    pub fn channel(&self) -> InputChannel {
        self.channel
    }
}

impl DigitalInput for GpioButton {
    fn wait_for_active(&mut self) -> Result<(), InputError> {
        loop {
            if self.pin.is_low() {
                return Ok(());
            }
            // Discard edges left over from the previous press
            if self.pin.poll_interrupt(true, None)?.is_some() {
                return Ok(());
            }
        }
    }

    fn is_active(&mut self) -> Result<bool, InputError> {
        Ok(self.pin.is_low())
    }
}
