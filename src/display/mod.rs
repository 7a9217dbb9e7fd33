pub mod shell;

use std::fmt;
use std::io;

use tracing::{debug, error, info};

use crate::config::DisplayConfig;

use self::shell::ShellOutput;

/// Requested power state of the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPower {
    On,
    Off,
}

impl DisplayPower {
    /// "1" → On, "0" → Off. Anything else, including surrounding whitespace,
    /// is not a command.
    pub fn from_payload(payload: &str) -> Option<Self> {
        match payload {
            "1" => Some(Self::On),
            "0" => Some(Self::Off),
            _ => None,
        }
    }
}

impl fmt::Display for DisplayPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("ON"),
            Self::Off => f.write_str("OFF"),
        }
    }
}

/// A command that was run for a recognized payload.
#[derive(Debug)]
pub struct Dispatch {
    pub power: DisplayPower,
    pub command: String,
    pub result: io::Result<ShellOutput>,
}

impl Dispatch {
    pub fn log(&self) {
        match &self.result {
            Ok(out) => {
                if !out.success() {
                    error!("Display {} command `{}` failed: {}", self.power, self.command, out.status);
                }
                info!("Command output: {}", out.output);
            }
            Err(e) => {
                error!("Failed to run display {} command `{}`: {}", self.power, self.command, e);
            }
        }
    }
}

pub struct DisplayController {
    shell: String,
    on_command: String,
    off_command: String,
}

impl DisplayController {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            shell: config.shell.clone(),
            on_command: config.on_command.clone(),
            off_command: config.off_command.clone(),
        }
    }

    pub fn command_for(&self, power: DisplayPower) -> &str {
        match power {
            DisplayPower::On => &self.on_command,
            DisplayPower::Off => &self.off_command,
        }
    }

    /// Run the command mapped to `payload`, if any. Command failures are
    /// returned in the `Dispatch`, never propagated.
    pub async fn handle_payload(&self, payload: &str) -> Option<Dispatch> {
        let Some(power) = DisplayPower::from_payload(payload) else {
            debug!("Ignoring payload {:?}", payload);
            return None;
        };

        let command = self.command_for(power).to_string();
        info!("Switching display {}: {}", power, command);

        let result = shell::run_shell(&self.shell, &command).await;
        Some(Dispatch {
            power,
            command,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(on: &str, off: &str) -> DisplayController {
        DisplayController::new(&DisplayConfig {
            shell: "sh".to_string(),
            on_command: on.to_string(),
            off_command: off.to_string(),
        })
    }

    #[test]
    fn payload_mapping_is_exact() {
        assert_eq!(DisplayPower::from_payload("1"), Some(DisplayPower::On));
        assert_eq!(DisplayPower::from_payload("0"), Some(DisplayPower::Off));
        for payload in ["", "2", " 1", "0\n", "on", "OFF", "10", "true"] {
            assert_eq!(DisplayPower::from_payload(payload), None, "{payload:?}");
        }
    }

    #[test]
    fn command_for_picks_configured_line() {
        let c = controller("power-on", "power-off");
        assert_eq!(c.command_for(DisplayPower::On), "power-on");
        assert_eq!(c.command_for(DisplayPower::Off), "power-off");
    }

    #[tokio::test]
    async fn one_runs_the_on_command() {
        let c = controller("echo on", "echo off");
        let dispatch = c.handle_payload("1").await.unwrap();
        assert_eq!(dispatch.power, DisplayPower::On);
        assert_eq!(dispatch.command, "echo on");
        assert_eq!(dispatch.result.unwrap().output, "on\n");
    }

    #[tokio::test]
    async fn zero_runs_the_off_command() {
        let c = controller("echo on", "echo off");
        let dispatch = c.handle_payload("0").await.unwrap();
        assert_eq!(dispatch.power, DisplayPower::Off);
        assert_eq!(dispatch.result.unwrap().output, "off\n");
    }

    #[tokio::test]
    async fn other_payloads_run_nothing() {
        let dir = std::env::temp_dir().join(format!("hdmi-ctl-{}", std::process::id()));
        let marker = dir.display().to_string();
        let c = controller(&format!("touch {marker}"), &format!("touch {marker}"));

        for payload in ["", "2", "yes", " 0"] {
            assert!(c.handle_payload(payload).await.is_none());
        }
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn failing_command_is_reported() {
        let c = controller("echo broken 1>&2; exit 1", "true");
        let out = c.handle_payload("1").await.unwrap().result.unwrap();
        assert!(!out.success());
        assert_eq!(out.output, "broken\n");
    }
}
