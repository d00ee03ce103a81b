//! Read-only projections handed to the front end.
//!
//! A snapshot is a self-contained copy: holding one never blocks the
//! network task, and mutating the simulation never changes a snapshot
//! already taken.

use serde::Serialize;

use super::connection_builder::BuilderState;
use super::event_log::LogEntry;
use super::types::{Connection, Device, DeviceId, Packet, Point};

#[derive(Debug, Clone, Serialize)]
pub struct PacketView {
    #[serde(flatten)]
    pub packet: Packet,
    /// `origin + (destination - origin) * progress / 100`.
    pub position: Point,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkStats {
    pub devices_online: usize,
    pub devices_total: usize,
    pub connections_active: usize,
    pub connections_total: usize,
    pub packets_in_flight: usize,
    /// Mean traffic gauge over all devices, rounded.
    pub average_traffic: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub devices: Vec<Device>,
    pub connections: Vec<Connection>,
    pub packets: Vec<PacketView>,
    /// Most recent first.
    pub log: Vec<LogEntry>,
    pub stats: NetworkStats,
    pub running: bool,
    pub connect_mode: BuilderState,
    pub selected: Option<DeviceId>,
    pub transcript: Vec<String>,
}
