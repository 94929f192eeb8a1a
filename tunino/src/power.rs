use std::process::Command;

use crate::error::PowerError;

/// Halts the machine
pub trait PowerControl: Send + Sync {
    fn power_off(&self) -> Result<(), PowerError>;
}

/// Runs the configured power-off command, `poweroff` by default
#[derive(Debug, Clone)]
pub struct SystemPower {
    command: Vec<String>,
}

impl SystemPower {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl PowerControl for SystemPower {
    fn power_off(&self) -> Result<(), PowerError> {
        let (program, args) = self.command.split_first().ok_or(PowerError::NoCommand)?;
        let command = self.command.join(" ");
        tracing::info!("Running {}", command);

        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| PowerError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !status.success() {
            return Err(PowerError::Failed { command, status });
        }
        Ok(())
    }
}
