//! Per-device terminal transcript.
//!
//! The transcript is plain text, unrelated to the event log: clearing it
//! never touches domain state.

use serde::Serialize;

use crate::simulation::types::DeviceId;

/// Hostname shown in the prompt (`Laptop1@nexus:~$`).
pub const PROMPT_HOST: &str = "nexus";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalSession {
    pub device: DeviceId,
    lines: Vec<String>,
}

impl TerminalSession {
    /// Open a session on `device`, greeting with its name.
    pub fn open(device: DeviceId, device_name: &str) -> Self {
        Self {
            device,
            lines: vec![format!("Connected to {}", device_name)],
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn echo(&mut self, device_name: &str, command: &str) {
        self.lines.push(format!("{}@{}:~$ {}", device_name, PROMPT_HOST, command));
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
