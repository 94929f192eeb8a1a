use std::fmt;

use crate::connection::DaemonConnection;
use crate::error::ActionError;
use crate::poller::ButtonAction;

/// Signed volume change bound to one button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeDelta(i8);

impl VolumeDelta {
    pub fn up(step: u8) -> Self {
        Self(step.min(100) as i8)
    }

    pub fn down(step: u8) -> Self {
        Self(-(step.min(100) as i8))
    }

    pub fn value(self) -> i8 {
        self.0
    }
}

impl fmt::Display for VolumeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

/// `clamp(current + delta, 0, 100)`
pub fn apply_delta(current: u8, delta: VolumeDelta) -> u8 {
    (i16::from(current) + i16::from(delta.0)).clamp(0, 100) as u8
}

/// Steps the mixer volume by a fixed delta
///
/// Reads the volume and writes the new one as two separate locked
/// operations; presses on the two volume buttons are still serialized by
/// the connection lock.
#[derive(Debug)]
pub struct VolumeButton {
    name: String,
    delta: VolumeDelta,
}

impl VolumeButton {
    pub fn new(delta: VolumeDelta) -> Self {
        let name = if delta.0 >= 0 { "volume-up" } else { "volume-down" };
        Self {
            name: name.to_string(),
            delta,
        }
    }

    pub fn delta(&self) -> VolumeDelta {
        self.delta
    }
}

impl ButtonAction for VolumeButton {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_press(&mut self, connection: &DaemonConnection) -> Result<(), ActionError> {
        tracing::info!("Volume change button pressed. Change volume by {}.", self.delta);
        let current = connection.status()?.volume;
        let new_volume = apply_delta(current, self.delta);
        tracing::info!("Old volume {}, new volume {}", current, new_volume);
        connection.set_volume(new_volume)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(95, 5, 100)]
    #[case(100, 5, 100)]
    #[case(40, 5, 45)]
    #[case(3, -5, 0)]
    #[case(0, -5, 0)]
    #[case(50, -5, 45)]
    fn test_apply_delta(#[case] current: u8, #[case] delta: i8, #[case] expected: u8) {
        assert_eq!(apply_delta(current, VolumeDelta(delta)), expected);
    }

    #[test]
    fn test_delta_constructors() {
        assert_eq!(VolumeDelta::up(5).value(), 5);
        assert_eq!(VolumeDelta::down(5).value(), -5);
        assert_eq!(VolumeDelta::down(5).to_string(), "-5");
        assert_eq!(VolumeDelta::up(5).to_string(), "+5");
        assert_eq!(VolumeButton::new(VolumeDelta::down(5)).name(), "volume-down");
    }
}
