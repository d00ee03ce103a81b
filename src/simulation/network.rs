//! Simulation controller.
//!
//! `Simulator` is the single owner of all domain state: topology, cabling
//! handshake, in-flight packets, event log and the open terminal session.
//! Every mutation goes through one of its `&mut self` methods, so the
//! network task can serialize user commands and ticks without locks.
//! Front ends read state back through `snapshot()`.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::net::Ipv4Addr;

use super::connection_builder::{BuilderState, ConnectionBuilder, SelectOutcome};
use super::error::NetworkError;
use super::event_log::{EventLog, Severity};
use super::reachability::{Outcome, resolve};
use super::scheduler::{PacketScheduler, PingRequest};
use super::snapshot::{NetworkStats, PacketView, Snapshot};
use super::topology::Topology;
use super::types::{ConnectionState, Device, DeviceId, DeviceKind, DeviceUpdate, Endpoint, Packet, PacketId, Point};
use crate::config::SimulationConfig;
use crate::terminal::{HELP_LINES, ParseError, TerminalCommand, TerminalSession, parse_command};

/// Label used for events that are not tied to a single device.
pub const SYSTEM_LABEL: &str = "System";

pub struct Simulator {
    config: SimulationConfig,
    topology: Topology,
    builder: ConnectionBuilder,
    scheduler: PacketScheduler,
    log: EventLog,
    session: Option<TerminalSession>,
    running: bool,
    rng: ChaCha8Rng,
}

impl Simulator {
    /// Create a simulator seeded from `config.seed`, or from entropy when unset.
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    /// Create a simulator drawing all ambient randomness from `rng`.
    pub fn with_rng(config: SimulationConfig, rng: ChaCha8Rng) -> Self {
        let log = EventLog::with_capacity(config.event_log_capacity);
        Self {
            config,
            topology: Topology::new(),
            builder: ConnectionBuilder::new(),
            scheduler: PacketScheduler::new(),
            log,
            session: None,
            running: false,
            rng,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn packets(&self) -> &[Packet] {
        self.scheduler.packets()
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.topology.device(id)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn connect_mode(&self) -> &BuilderState {
        self.builder.state()
    }

    pub fn selected(&self) -> Option<DeviceId> {
        self.session.as_ref().map(|s| s.device)
    }

    /// Lines of the open terminal session; empty when none is open.
    pub fn transcript(&self) -> &[String] {
        self.session.as_ref().map(|s| s.lines()).unwrap_or_default()
    }

    // ── Topology ─────────────────────────────────────────────────────────

    pub fn add_device(&mut self, kind: DeviceKind, position: Point) -> DeviceId {
        let id = self.topology.add_device(kind, position, &mut self.rng);
        if let Some(device) = self.topology.device(id) {
            log::info!("Added {} ({:?}) as device {}", device.name, kind, id);
            self.log.push(&device.name, Severity::Info, format!("Device {} added", device.name));
        }
        id
    }

    /// Remove a device, its connections, and every reference to it held by
    /// the selection and the cabling handshake. Absent ids are a no-op.
    pub fn remove_device(&mut self, id: DeviceId) {
        let Some(removed) = self.topology.remove_device(id) else {
            return;
        };
        if self.selected() == Some(id) {
            self.session = None;
        }
        self.builder.forget_device(id);
        log::info!("Removed device {} ({})", removed.name, id);
        self.log.push(SYSTEM_LABEL, Severity::Warning, format!("Device {} removed", removed.name));
    }

    pub fn update_device(&mut self, id: DeviceId, update: DeviceUpdate) -> Result<(), NetworkError> {
        let power = update.power;
        self.topology.update_device(id, update)?;
        if let Some(power) = power {
            log::debug!("Device {} power set to {:?}", id, power);
        }
        Ok(())
    }

    // ── Selection and terminal ───────────────────────────────────────────

    /// Open a terminal session on `device`, or close the current one with `None`.
    pub fn select_device(&mut self, device: Option<DeviceId>) -> Result<(), NetworkError> {
        self.session = match device {
            Some(id) => {
                let device = self.topology.device(id).ok_or(NetworkError::DeviceNotFound(id))?;
                Some(TerminalSession::open(id, &device.name))
            }
            None => None,
        };
        Ok(())
    }

    /// Run one terminal command against the selected device.
    ///
    /// The echoed command line and its output land in the transcript even
    /// when the command fails; the failure is also returned.
    pub fn execute(&mut self, line: &str) -> Result<(), NetworkError> {
        let id = self.selected().ok_or(NetworkError::NoDeviceSelected)?;
        let device = self.topology.device(id).ok_or(NetworkError::DeviceNotFound(id))?;
        let name = device.name.clone();
        let address_config = device.profile.address_config().cloned();

        let mut output: Vec<String> = Vec::new();
        let result = match parse_command(line) {
            Ok(TerminalCommand::Ping(address)) => match self.ping(id, address) {
                Ok(_) => {
                    output.push(format!("Pinging {} with 64 bytes of data...", address));
                    Ok(())
                }
                Err(err) => {
                    output.push(err.to_string());
                    Err(err)
                }
            },
            Ok(TerminalCommand::IpConfig) => {
                match address_config {
                    Some(config) => {
                        output.push(format!("IP address: {}", config.address));
                        output.push(format!("Subnet mask: {}", config.mask));
                        output.push(match config.gateway {
                            Some(gateway) => format!("Default gateway: {}", gateway),
                            None => "Default gateway: Not configured".to_string(),
                        });
                    }
                    None => output.push("No IP configuration".to_string()),
                }
                Ok(())
            }
            Ok(TerminalCommand::Help) => {
                output.extend(HELP_LINES.iter().map(|l| l.to_string()));
                Ok(())
            }
            Ok(TerminalCommand::Clear) => {
                if let Some(session) = self.session.as_mut() {
                    session.clear();
                }
                return Ok(());
            }
            Err(ParseError::InvalidAddress(argument)) => {
                output.push("Error: invalid IP address format. Usage: ping 192.168.1.1".to_string());
                let err = NetworkError::InvalidAddressFormat(argument);
                self.log.push(&name, Severity::Error, err.to_string());
                Err(err)
            }
            Err(ParseError::Unrecognized(input)) => {
                output.push(format!("Command not recognized: {}", input));
                output.push("Type 'help' to see available commands".to_string());
                let err = NetworkError::UnrecognizedCommand(input);
                self.log.push(&name, Severity::Error, err.to_string());
                Err(err)
            }
        };

        if let Some(session) = self.session.as_mut() {
            session.echo(&name, line);
            for output_line in output {
                session.push(output_line);
            }
        }
        result
    }

    /// Resolve a ping and, when reachable, put a packet on the wire.
    /// Failures are recorded in the event log before being returned.
    pub fn ping(&mut self, origin: DeviceId, destination: Ipv4Addr) -> Result<PacketId, NetworkError> {
        let outcome = resolve(&self.topology, origin, destination);
        let label = self.topology.device(origin).map_or_else(|| SYSTEM_LABEL.to_string(), |d| d.name.clone());

        let (Outcome::Reachable { destination: target }, Some(source_address)) = (outcome, self.topology.device(origin).and_then(|d| d.address())) else {
            let err = outcome.into_error(origin, destination).unwrap_or(NetworkError::NoRouteToHost(destination));
            log::debug!("Ping from {} rejected: {}", label, err);
            self.log.push(&label, Severity::Error, err.to_string());
            return Err(err);
        };

        let request = PingRequest {
            origin,
            destination: target,
            source_address,
            destination_address: destination,
            origin_label: label.clone(),
            success: outcome.is_reachable(),
        };
        let id = self.scheduler.inject(&mut self.topology, request, &self.config);
        self.log.push(&label, Severity::Info, format!("Sending ping to {}...", destination));
        Ok(id)
    }

    // ── Cabling ──────────────────────────────────────────────────────────

    pub fn enter_connect_mode(&mut self) {
        self.builder.enter_connect_mode();
    }

    pub fn exit_connect_mode(&mut self) {
        self.builder.exit_connect_mode();
    }

    pub fn select_interface(&mut self, device: DeviceId, interface: &str) -> SelectOutcome {
        let outcome = self.builder.select_interface(&mut self.topology, Endpoint::new(device, interface), &mut self.rng);
        if let SelectOutcome::Connected(id) = outcome {
            let names = self
                .topology
                .connections()
                .iter()
                .find(|c| c.id == id)
                .map(|c| (self.device_name(c.from.device), self.device_name(c.to.device)));
            if let Some((from, to)) = names {
                log::info!("Connected {} and {}", from, to);
                self.log.push(SYSTEM_LABEL, Severity::Success, format!("Connection: {} ↔ {}", from, to));
            }
        }
        outcome
    }

    // ── Scheduling ───────────────────────────────────────────────────────

    /// Start or pause the tick loop. Pausing freezes packets in place.
    pub fn set_running(&mut self, running: bool) {
        if self.running != running {
            log::info!("Simulation {}", if running { "started" } else { "stopped" });
        }
        self.running = running;
    }

    /// Apply one scheduler tick. No-op while paused.
    pub fn tick(&mut self) -> Vec<Packet> {
        if !self.running {
            return Vec::new();
        }
        self.scheduler.tick(&mut self.topology, &mut self.log, &mut self.rng, &self.config)
    }

    /// Drop every device, connection, packet, log entry and session, and stop.
    pub fn reset(&mut self) {
        self.topology.clear();
        self.builder.exit_connect_mode();
        self.scheduler.clear();
        self.log.clear();
        self.session = None;
        self.running = false;
        log::info!("Simulation reset");
    }

    // ── Read side ────────────────────────────────────────────────────────

    pub fn stats(&self) -> NetworkStats {
        let devices = self.topology.devices();
        let connections = self.topology.connections();
        let average_traffic = if devices.is_empty() {
            0
        } else {
            (devices.iter().map(|d| d.traffic).sum::<f64>() / devices.len() as f64).round() as u32
        };
        NetworkStats {
            devices_online: devices.iter().filter(|d| d.is_on()).count(),
            devices_total: devices.len(),
            connections_active: connections.iter().filter(|c| c.state == ConnectionState::Active).count(),
            connections_total: connections.len(),
            packets_in_flight: self.scheduler.packets().len(),
            average_traffic,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let position_of = |id: DeviceId| self.topology.device(id).map(|d| d.position).unwrap_or_default();
        let packets = self
            .scheduler
            .packets()
            .iter()
            .map(|p| PacketView {
                packet: p.clone(),
                position: position_of(p.source).lerp(&position_of(p.destination), p.progress),
            })
            .collect();

        Snapshot {
            devices: self.topology.devices().to_vec(),
            connections: self.topology.connections().to_vec(),
            packets,
            log: self.log.iter().cloned().collect(),
            stats: self.stats(),
            running: self.running,
            connect_mode: self.builder.state().clone(),
            selected: self.selected(),
            transcript: self.transcript().to_vec(),
        }
    }

    fn device_name(&self, id: DeviceId) -> String {
        self.topology.device(id).map(|d| d.name.clone()).unwrap_or_default()
    }
}
