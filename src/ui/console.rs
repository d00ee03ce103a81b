//! Line-oriented console front end.
//!
//! `parse_input` turns one console line into a `UICommand` for the network
//! task; `ConsoleView` turns successive snapshots into the lines that are
//! new since the previous one.

use anyhow::{Context, bail};
use std::net::Ipv4Addr;

use super::UICommand;
use crate::simulation::event_log::LogEntry;
use crate::simulation::snapshot::Snapshot;
use crate::simulation::types::{AddressConfig, DeviceId, DeviceKind, DeviceUpdate, Endpoint, Point, PowerState};

pub const CONSOLE_HELP: [&str; 16] = [
    "add <laptop|router|switch> <x> <y>  - place a device",
    "rm <id>                             - remove a device",
    "power <id> on|off                   - switch a device",
    "rename <id> <name>                  - rename a device",
    "ip <id> <addr> <mask> [<gateway>]   - set a laptop's address",
    "select [<id>]                       - open a terminal (no id closes it)",
    "connect                             - enter connect mode",
    "iface <id> <interface>              - click an interface in connect mode",
    "cancel                              - leave connect mode",
    "start | stop                        - run or pause the simulation",
    "speed <percent>                     - scale simulation time (100 = real time)",
    "reset                               - clear everything",
    "run <command...>                    - type into the open terminal",
    "snapshot                            - dump the current state as JSON",
    "help                                - show this help",
    "quit                                - exit",
];

#[derive(Debug, Clone)]
pub enum ConsoleInput {
    Command(UICommand),
    Snapshot,
    /// Simulation clock speed; applied by the front end, not the network task.
    Speed(u32),
    Help,
    Quit,
}

pub fn parse_input(line: &str) -> anyhow::Result<ConsoleInput> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        bail!("empty input, type 'help'");
    };
    let rest: Vec<&str> = parts.collect();

    let command = match (verb.to_lowercase().as_str(), rest.as_slice()) {
        ("add", [kind, x, y]) => UICommand::AddDevice(parse_kind(kind)?, Point::new(parse_coordinate(x)?, parse_coordinate(y)?)),
        ("rm", [id]) => UICommand::RemoveDevice(parse_id(id)?),
        ("power", [id, state]) => {
            let power = match state.to_lowercase().as_str() {
                "on" => PowerState::On,
                "off" => PowerState::Off,
                other => bail!("power state must be on or off, got '{}'", other),
            };
            UICommand::UpdateDevice(parse_id(id)?, DeviceUpdate::power(power))
        }
        ("rename", [id, name @ ..]) if !name.is_empty() => UICommand::UpdateDevice(
            parse_id(id)?,
            DeviceUpdate {
                name: Some(name.join(" ")),
                ..Default::default()
            },
        ),
        ("ip", [id, address, mask, gateway @ ..]) if gateway.len() <= 1 => UICommand::UpdateDevice(
            parse_id(id)?,
            DeviceUpdate {
                address: Some(AddressConfig {
                    address: parse_address(address)?,
                    mask: parse_address(mask)?,
                    gateway: gateway.first().map(|g| parse_address(g)).transpose()?,
                }),
                ..Default::default()
            },
        ),
        ("select", []) => UICommand::SelectDevice(None),
        ("select", [id]) => UICommand::SelectDevice(Some(parse_id(id)?)),
        ("connect", []) => UICommand::EnterConnectMode,
        ("iface", [id, interface]) => UICommand::SelectInterface(Endpoint::new(parse_id(id)?, interface)),
        ("cancel", []) => UICommand::ExitConnectMode,
        ("start", []) => UICommand::SetRunning(true),
        ("stop", []) => UICommand::SetRunning(false),
        ("reset", []) => UICommand::Reset,
        ("run", [_, ..]) => UICommand::Execute(rest.join(" ")),
        ("speed", [percent]) => {
            let percent = percent.trim_end_matches('%').parse::<u32>().with_context(|| format!("invalid speed '{}'", percent))?;
            return Ok(ConsoleInput::Speed(percent));
        }
        ("snapshot", []) => return Ok(ConsoleInput::Snapshot),
        ("help", []) => return Ok(ConsoleInput::Help),
        ("quit" | "exit", []) => return Ok(ConsoleInput::Quit),
        (other, _) => bail!("unknown or malformed console command '{}', type 'help'", other),
    };
    Ok(ConsoleInput::Command(command))
}

fn parse_kind(kind: &str) -> anyhow::Result<DeviceKind> {
    match kind.to_lowercase().as_str() {
        "laptop" | "pc" | "endstation" => Ok(DeviceKind::EndStation),
        "router" => Ok(DeviceKind::Router),
        "switch" => Ok(DeviceKind::Switch),
        other => bail!("unknown device kind '{}'", other),
    }
}

fn parse_id(id: &str) -> anyhow::Result<DeviceId> {
    id.parse::<u32>().map(DeviceId).with_context(|| format!("invalid device id '{}'", id))
}

fn parse_address(value: &str) -> anyhow::Result<Ipv4Addr> {
    value.parse::<Ipv4Addr>().with_context(|| format!("invalid IPv4 address '{}'", value))
}

fn parse_coordinate(value: &str) -> anyhow::Result<f64> {
    value.parse::<f64>().with_context(|| format!("invalid coordinate '{}'", value))
}

/// Tracks what has already been printed so each snapshot only yields new lines.
#[derive(Debug, Default)]
pub struct ConsoleView {
    selected: Option<DeviceId>,
    transcript_printed: usize,
    transcript_tail: Option<String>,
    last_log_head: Option<(String, String, String)>,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, snapshot: &Snapshot) -> Vec<String> {
        let mut lines = Vec::new();

        // Log is most recent first: everything above the last seen head is new.
        let new_entries: Vec<&LogEntry> = match &self.last_log_head {
            Some(head) => snapshot.log.iter().take_while(|e| &log_key(e) != head).collect(),
            None => snapshot.log.iter().collect(),
        };
        for entry in new_entries.iter().rev() {
            lines.push(format!("[{}] {:<9} {:?}: {}", entry.timestamp.format("%H:%M:%S"), entry.label, entry.severity, entry.message));
        }
        self.last_log_head = snapshot.log.first().map(log_key);

        if snapshot.selected != self.selected {
            self.selected = snapshot.selected;
            self.transcript_printed = 0;
        }
        // A cleared transcript no longer ends where printing stopped.
        if self.transcript_printed > 0 && snapshot.transcript.get(self.transcript_printed - 1) != self.transcript_tail.as_ref() {
            self.transcript_printed = 0;
        }
        for line in &snapshot.transcript[self.transcript_printed..] {
            lines.push(format!("  | {}", line));
        }
        self.transcript_printed = snapshot.transcript.len();
        self.transcript_tail = snapshot.transcript.last().cloned();

        lines
    }
}

fn log_key(entry: &LogEntry) -> (String, String, String) {
    (entry.timestamp.to_rfc3339(), entry.label.clone(), entry.message.clone())
}
