//! Type definitions for the simulation.
//!
//! Contains all data structures shared across the engine:
//! - Identifiers for devices, connections and packets
//! - Devices, their kind-tagged addressing and interface templates
//! - Connections and in-flight packets
//! - Communication channels between the network task and the front end

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;

use crate::ui::{UICommand, UIRefreshState};

/// Depth of the front end → network task command channel.
pub const UI_COMMAND_QUEUE_SIZE: usize = 100;
/// Bounded channel carrying front end commands into the network task.
pub type UICommandQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;
/// Receiver side of the command channel, owned by the network task.
pub type UICommandQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;
/// Sender side of the command channel, owned by the front end.
pub type UICommandQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;

/// Depth of the network task → front end refresh channel.
/// Snapshots are published after every mutation and tick, so a slow reader
/// simply misses intermediate ones (the task uses `try_send`).
pub const UI_REFRESH_QUEUE_SIZE: usize = 100;
/// Bounded channel carrying snapshots and alerts to the front end.
pub type UIRefreshQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;
/// Receiver side of the refresh channel.
pub type UIRefreshQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;
/// Sender side of the refresh channel.
pub type UIRefreshQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;

/// Payload size of a simulated ICMP echo request, in bytes.
pub const PING_PAYLOAD_SIZE: usize = 64;

/// Upper bound of every device gauge (percent).
pub const GAUGE_MAX: f64 = 100.0;

/// Packet progress at which a packet is delivered.
pub const PROGRESS_COMPLETE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ConnectionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PacketId(pub u64);

/// Placement on the canvas. Opaque to the engine except as the endpoints
/// of packet interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `to`; `percent` is clamped to 0..=100.
    pub fn lerp(&self, to: &Point, percent: u8) -> Point {
        let t = f64::from(percent.min(PROGRESS_COMPLETE)) / 100.0;
        Point {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceKind {
    EndStation,
    Router,
    Switch,
}

impl DeviceKind {
    /// Name prefix for devices of this kind (`Laptop1`, `Router2`, ...).
    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::EndStation => "Laptop",
            DeviceKind::Router => "Router",
            DeviceKind::Switch => "Switch",
        }
    }

    /// Interface names and their initial link state.
    pub fn interface_template(&self) -> Vec<Interface> {
        match self {
            DeviceKind::EndStation => vec![Interface::new("Ethernet0", LinkState::Down)],
            DeviceKind::Router => (0..2).map(|i| Interface::new(&format!("GigabitEthernet0/{i}"), LinkState::AdminDown)).collect(),
            DeviceKind::Switch => (1..=4).map(|i| Interface::new(&format!("FastEthernet0/{i}"), LinkState::Down)).collect(),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerState {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkState {
    Up,
    Down,
    /// Initial state of router uplinks. Replaced by Up/Down once cabled.
    AdminDown,
}

impl LinkState {
    /// Link state of a cabled interface on a device with the given power.
    pub fn for_connected(power: PowerState) -> LinkState {
        match power {
            PowerState::On => LinkState::Up,
            PowerState::Off => LinkState::Down,
        }
    }
}

/// Host addressing of an end station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressConfig {
    pub address: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Option<Ipv4Addr>,
}

/// Kind-tagged per-device data. Only end stations carry a device-level
/// address; routers and switches are addressed per interface, if at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DeviceProfile {
    EndStation(AddressConfig),
    Router,
    Switch,
}

impl DeviceProfile {
    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceProfile::EndStation(_) => DeviceKind::EndStation,
            DeviceProfile::Router => DeviceKind::Router,
            DeviceProfile::Switch => DeviceKind::Switch,
        }
    }

    pub fn address_config(&self) -> Option<&AddressConfig> {
        match self {
            DeviceProfile::EndStation(config) => Some(config),
            DeviceProfile::Router | DeviceProfile::Switch => None,
        }
    }
}

/// Far side of a cabled interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceLink {
    pub device: DeviceId,
    pub interface: String,
    pub connection: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interface {
    pub name: String,
    pub address: Option<Ipv4Addr>,
    pub link_state: LinkState,
    /// Set while the interface is cabled; the peer holds the mirror link.
    pub link: Option<InterfaceLink>,
    /// State the interface returns to when its cable is removed.
    #[serde(skip)]
    pub template_state: LinkState,
}

impl Interface {
    pub fn new(name: &str, link_state: LinkState) -> Self {
        Self {
            name: name.to_string(),
            address: None,
            link_state,
            link: None,
            template_state: link_state,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub profile: DeviceProfile,
    pub position: Point,
    pub power: PowerState,
    pub interfaces: Vec<Interface>,
    pub cpu: f64,
    pub memory: f64,
    pub traffic: f64,
}

impl Device {
    pub fn kind(&self) -> DeviceKind {
        self.profile.kind()
    }

    pub fn address(&self) -> Option<Ipv4Addr> {
        self.profile.address_config().map(|c| c.address)
    }

    pub fn is_on(&self) -> bool {
        self.power == PowerState::On
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn interface_mut(&mut self, name: &str) -> Option<&mut Interface> {
        self.interfaces.iter_mut().find(|i| i.name == name)
    }

    /// Re-derive the link state of every cabled interface from the power state.
    pub fn refresh_link_states(&mut self) {
        let state = LinkState::for_connected(self.power);
        for interface in self.interfaces.iter_mut().filter(|i| i.is_connected()) {
            interface.link_state = state;
        }
    }

    /// Raise traffic by `amount`, saturating at 100.
    pub fn bump_traffic(&mut self, amount: f64) {
        self.traffic = (self.traffic + amount).min(GAUGE_MAX);
    }
}

/// Partial update applied by `Simulator::update_device`.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub power: Option<PowerState>,
    pub address: Option<AddressConfig>,
    pub position: Option<Point>,
}

impl DeviceUpdate {
    pub fn power(power: PowerState) -> Self {
        Self {
            power: Some(power),
            ..Default::default()
        }
    }
}

/// One side of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    pub device: DeviceId,
    pub interface: String,
}

impl Endpoint {
    pub fn new(device: DeviceId, interface: &str) -> Self {
        Self {
            device,
            interface: interface.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: Endpoint,
    pub to: Endpoint,
    pub state: ConnectionState,
    /// Cosmetic; never used in reachability.
    pub bandwidth_mbps: u32,
    /// Cosmetic; never used in reachability.
    pub latency_ms: u32,
}

impl Connection {
    pub fn touches(&self, device: DeviceId) -> bool {
        self.from.device == device || self.to.device == device
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PacketKind {
    Ping,
    Arp,
    Data,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Packet {
    pub id: PacketId,
    pub source: DeviceId,
    pub destination: DeviceId,
    pub source_address: Ipv4Addr,
    pub destination_address: Ipv4Addr,
    /// 0..=100, monotonic while the simulation runs.
    pub progress: u8,
    pub kind: PacketKind,
    pub success: bool,
    pub size: usize,
    /// Name of the origin device when the packet was sent. Completion is
    /// reported under this label even if the device was removed meanwhile.
    pub origin_label: String,
}
