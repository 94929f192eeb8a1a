//! Physical inputs for tunino
//!
//! Two seams, both blocking:
//!
//! - [`DigitalInput`]: a push button. `wait_for_active` parks the calling
//!   thread until the button is pressed; `is_active` samples the level.
//! - [`TagReader`]: an RFID reader. `read_tag` parks until a tag is presented.
//!
//! Raspberry Pi implementations live behind the `rpi` feature.

mod error;
mod input;
mod reader;

#[cfg(feature = "rpi")]
mod gpio;
#[cfg(feature = "rpi")]
mod mfrc522;

pub use error::{InputError, ReaderError};
pub use input::{DigitalInput, InputChannel};
pub use reader::{TagId, TagReader};

#[cfg(feature = "rpi")]
pub use gpio::GpioButton;
#[cfg(feature = "rpi")]
pub use mfrc522::Mfrc522Reader;
