//! MFRC522 RFID reader on SPI
//!
//! Only the part of the card protocol needed to obtain a UID is implemented:
//! REQA followed by cascade level 1 anticollision. The resulting five bytes
//! (four UID bytes and the BCC) are folded big-endian into one number, which
//! is the id most MFRC522 tooling on the Pi prints for a tag.

use std::thread;
use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use crate::{ReaderError, TagId, TagReader};

// Registers
const COMMAND: u8 = 0x01;
const COMM_IEN: u8 = 0x02;
const COMM_IRQ: u8 = 0x04;
const ERROR: u8 = 0x06;
const FIFO_DATA: u8 = 0x09;
const FIFO_LEVEL: u8 = 0x0A;
const CONTROL: u8 = 0x0C;
const BIT_FRAMING: u8 = 0x0D;
const MODE: u8 = 0x11;
const TX_CONTROL: u8 = 0x14;
const TX_AUTO: u8 = 0x15;
const T_MODE: u8 = 0x2A;
const T_PRESCALER: u8 = 0x2B;
const T_RELOAD_H: u8 = 0x2C;
const T_RELOAD_L: u8 = 0x2D;

// PCD commands
const PCD_IDLE: u8 = 0x00;
const PCD_TRANSCEIVE: u8 = 0x0C;
const PCD_RESET: u8 = 0x0F;

// PICC commands
const PICC_REQIDL: u8 = 0x26;
const PICC_ANTICOLL: u8 = 0x93;

const FIFO_MAX: usize = 16;
const IRQ_POLL_LIMIT: u32 = 2000;
const RESET_PIN: u8 = 25;
const SPI_CLOCK_HZ: u32 = 1_000_000;

/// Outcome of one transceive round trip
enum Transceive {
    Frame { data: Vec<u8>, bits: usize },
    NoTag,
}

/// MFRC522 on SPI0/CE0 with reset on BCM 25
pub struct Mfrc522Reader {
    spi: Spi,
    // Held so the reset line stays high
    _reset: OutputPin,
    poll_interval: Duration,
}

impl Mfrc522Reader {
    pub fn open() -> Result<Self, ReaderError> {
        let mut reset = Gpio::new()?.get(RESET_PIN)?.into_output();
        reset.set_high();

        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, SPI_CLOCK_HZ, Mode::Mode0)?;
        let mut reader = Self {
            spi,
            _reset: reset,
            poll_interval: Duration::from_millis(100),
        };
        reader.init()?;
        tracing::debug!("MFRC522 initialised");
        Ok(reader)
    }

    fn init(&mut self) -> Result<(), ReaderError> {
        self.write(COMMAND, PCD_RESET)?;
        thread::sleep(Duration::from_millis(50));
        self.write(T_MODE, 0x8D)?;
        self.write(T_PRESCALER, 0x3E)?;
        self.write(T_RELOAD_L, 30)?;
        self.write(T_RELOAD_H, 0)?;
        self.write(TX_AUTO, 0x40)?;
        self.write(MODE, 0x3D)?;
        if self.read(TX_CONTROL)? & 0x03 != 0x03 {
            self.set_bits(TX_CONTROL, 0x03)?;
        }
        Ok(())
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), ReaderError> {
        let mut rx = [0u8; 2];
        self.spi.transfer(&mut rx, &[(register << 1) & 0x7E, value])?;
        Ok(())
    }

    fn read(&mut self, register: u8) -> Result<u8, ReaderError> {
        let mut rx = [0u8; 2];
        self.spi
            .transfer(&mut rx, &[((register << 1) & 0x7E) | 0x80, 0])?;
        Ok(rx[1])
    }

    fn set_bits(&mut self, register: u8, mask: u8) -> Result<(), ReaderError> {
        let value = self.read(register)?;
        self.write(register, value | mask)
    }

    fn clear_bits(&mut self, register: u8, mask: u8) -> Result<(), ReaderError> {
        let value = self.read(register)?;
        self.write(register, value & !mask)
    }

    fn transceive(&mut self, payload: &[u8]) -> Result<Transceive, ReaderError> {
        const IRQ_EN: u8 = 0x77;
        const WAIT_IRQ: u8 = 0x30;

        self.write(COMM_IEN, IRQ_EN | 0x80)?;
        self.clear_bits(COMM_IRQ, 0x80)?;
        self.set_bits(FIFO_LEVEL, 0x80)?;
        self.write(COMMAND, PCD_IDLE)?;
        for byte in payload {
            self.write(FIFO_DATA, *byte)?;
        }
        self.write(COMMAND, PCD_TRANSCEIVE)?;
        self.set_bits(BIT_FRAMING, 0x80)?;

        let mut irq = 0;
        let mut completed = false;
        for _ in 0..IRQ_POLL_LIMIT {
            irq = self.read(COMM_IRQ)?;
            if irq & 0x01 != 0 || irq & WAIT_IRQ != 0 {
                completed = true;
                break;
            }
        }
        self.clear_bits(BIT_FRAMING, 0x80)?;

        if !completed {
            return Ok(Transceive::NoTag);
        }
        if self.read(ERROR)? & 0x1B != 0 {
            return Err(ReaderError::Protocol("collision or framing error".to_string()));
        }
        if irq & IRQ_EN & 0x01 != 0 {
            return Ok(Transceive::NoTag);
        }

        let level = self.read(FIFO_LEVEL)? as usize;
        let last_bits = (self.read(CONTROL)? & 0x07) as usize;
        let bits = match last_bits {
            0 => level * 8,
            n => level.saturating_sub(1) * 8 + n,
        };
        let count = level.clamp(1, FIFO_MAX);
        let mut data = Vec::with_capacity(count);
        for _ in 0..count {
            data.push(self.read(FIFO_DATA)?);
        }
        Ok(Transceive::Frame { data, bits })
    }

    /// One detection attempt; `None` when no tag is in the field
    fn try_read_uid(&mut self) -> Result<Option<[u8; 5]>, ReaderError> {
        self.write(BIT_FRAMING, 0x07)?;
        match self.transceive(&[PICC_REQIDL])? {
            Transceive::Frame { bits: 0x10, .. } => {}
            _ => return Ok(None),
        }

        self.write(BIT_FRAMING, 0x00)?;
        let data = match self.transceive(&[PICC_ANTICOLL, 0x20])? {
            Transceive::Frame { data, .. } => data,
            Transceive::NoTag => return Ok(None),
        };
        parse_uid(&data).map(Some)
    }
}

/// Check the BCC of an anticollision answer and return the five bytes
fn parse_uid(data: &[u8]) -> Result<[u8; 5], ReaderError> {
    if data.len() != 5 {
        return Err(ReaderError::Protocol(format!(
            "anticollision returned {} bytes",
            data.len()
        )));
    }
    let check = data[..4].iter().fold(0u8, |acc, b| acc ^ b);
    if check != data[4] {
        return Err(ReaderError::Protocol("UID checksum mismatch".to_string()));
    }
    let mut uid = [0u8; 5];
    uid.copy_from_slice(data);
    Ok(uid)
}

/// Fold the UID bytes big-endian into the numeric tag id
fn uid_to_number(uid: &[u8; 5]) -> u64 {
    uid.iter().fold(0u64, |acc, b| acc * 256 + u64::from(*b))
}

impl TagReader for Mfrc522Reader {
    fn read_tag(&mut self) -> Result<TagId, ReaderError> {
        loop {
            match self.try_read_uid() {
                Ok(Some(uid)) => return Ok(TagId::from(uid_to_number(&uid))),
                Ok(None) => {}
                // Half-read frames happen while a tag is moved through the field
                Err(ReaderError::Protocol(msg)) => tracing::trace!("Discarding frame: {}", msg),
                Err(e) => return Err(e),
            }
            thread::sleep(self.poll_interval);
        }
    }
}
