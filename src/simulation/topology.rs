//! In-memory topology: devices, their interfaces and the cables between them.
//!
//! Devices are kept in creation order. Lookups that can match several
//! devices (duplicate addresses) return the earliest-created one.

use rand::Rng;
use std::net::Ipv4Addr;

use super::error::NetworkError;
use super::types::{
    AddressConfig, Connection, ConnectionId, ConnectionState, Device, DeviceId, DeviceKind, DeviceProfile, DeviceUpdate, Endpoint, InterfaceLink,
    LinkState, Point, PowerState,
};

/// Base of auto-assigned end station addresses (`192.168.1.(10+n)`).
const END_STATION_HOST_OFFSET: u32 = 10;
const END_STATION_NETWORK: [u8; 3] = [192, 168, 1];
const END_STATION_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);
const END_STATION_GATEWAY: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);

#[derive(Debug, Default)]
pub struct Topology {
    devices: Vec<Device>,
    connections: Vec<Connection>,
    next_device_id: u32,
    next_connection_id: u32,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.devices.iter_mut()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.id == id)
    }

    /// Exact-match address lookup; the earliest-created device wins on collisions.
    pub fn device_by_address(&self, address: Ipv4Addr) -> Option<&Device> {
        self.devices.iter().find(|d| d.address() == Some(address))
    }

    /// Create a device from its kind template and return its id.
    ///
    /// The name ordinal counts devices of the same kind that currently exist,
    /// so names (and end station addresses) can repeat after removals.
    pub fn add_device<R: Rng>(&mut self, kind: DeviceKind, position: Point, rng: &mut R) -> DeviceId {
        let ordinal = self.devices.iter().filter(|d| d.kind() == kind).count() as u32 + 1;
        let id = DeviceId(self.next_device_id);
        self.next_device_id += 1;

        let profile = match kind {
            DeviceKind::EndStation => DeviceProfile::EndStation(end_station_address(ordinal)),
            DeviceKind::Router => DeviceProfile::Router,
            DeviceKind::Switch => DeviceProfile::Switch,
        };

        let mut interfaces = kind.interface_template();
        if let DeviceProfile::EndStation(config) = &profile {
            if let Some(primary) = interfaces.first_mut() {
                primary.address = Some(config.address);
            }
        }

        self.devices.push(Device {
            id,
            name: format!("{}{}", kind.label(), ordinal),
            profile,
            position,
            power: PowerState::Off,
            interfaces,
            cpu: f64::from(rng.gen_range(10..40u32)),
            memory: f64::from(rng.gen_range(20..60u32)),
            traffic: 0.0,
        });
        id
    }

    /// Remove a device and every connection touching it. Peer interfaces are
    /// unlinked and fall back to their template link state.
    pub fn remove_device(&mut self, id: DeviceId) -> Option<Device> {
        let index = self.devices.iter().position(|d| d.id == id)?;
        let removed = self.devices.remove(index);

        let (dropped, kept): (Vec<Connection>, Vec<Connection>) = self.connections.drain(..).partition(|c| c.touches(id));
        self.connections = kept;

        for connection in &dropped {
            for endpoint in [&connection.from, &connection.to] {
                if endpoint.device == id {
                    continue;
                }
                if let Some(interface) = self.device_mut(endpoint.device).and_then(|d| d.interface_mut(&endpoint.interface)) {
                    interface.link = None;
                    interface.link_state = interface.template_state;
                }
            }
        }
        log::debug!("Removed device {} and {} connection(s)", removed.name, dropped.len());
        Some(removed)
    }

    /// Merge the supplied fields. Validation happens before any field is written.
    pub fn update_device(&mut self, id: DeviceId, update: DeviceUpdate) -> Result<(), NetworkError> {
        let device = self.device_mut(id).ok_or(NetworkError::DeviceNotFound(id))?;
        if update.address.is_some() && device.kind() != DeviceKind::EndStation {
            return Err(NetworkError::AddressNotSupported(id));
        }

        if let Some(name) = update.name {
            device.name = name;
        }
        if let Some(position) = update.position {
            device.position = position;
        }
        if let Some(config) = update.address {
            if let Some(primary) = device.interfaces.first_mut() {
                primary.address = Some(config.address);
            }
            device.profile = DeviceProfile::EndStation(config);
        }
        if let Some(power) = update.power {
            device.power = power;
            device.refresh_link_states();
        }
        Ok(())
    }

    /// Whether `endpoint` names an existing interface with no cable attached.
    pub fn is_free(&self, endpoint: &Endpoint) -> Result<bool, NetworkError> {
        let device = self.device(endpoint.device).ok_or(NetworkError::DeviceNotFound(endpoint.device))?;
        Ok(device.interface(&endpoint.interface).is_some_and(|i| !i.is_connected()))
    }

    /// Cable two free interfaces together. Both sides get mirrored links and
    /// a link state derived from their own device's power.
    pub fn connect<R: Rng>(&mut self, from: Endpoint, to: Endpoint, rng: &mut R) -> Result<ConnectionId, NetworkError> {
        if !self.is_free(&from)? || !self.is_free(&to)? || from == to {
            return Err(NetworkError::InterfaceAlreadyConnected);
        }

        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;

        for (local, remote) in [(&from, &to), (&to, &from)] {
            if let Some(device) = self.device_mut(local.device) {
                let state = LinkState::for_connected(device.power);
                if let Some(interface) = device.interface_mut(&local.interface) {
                    interface.link = Some(InterfaceLink {
                        device: remote.device,
                        interface: remote.interface.clone(),
                        connection: id,
                    });
                    interface.link_state = state;
                }
            }
        }

        self.connections.push(Connection {
            id,
            from,
            to,
            state: ConnectionState::Active,
            bandwidth_mbps: rng.gen_range(100..1000),
            latency_ms: rng.gen_range(1..=20),
        });
        Ok(id)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn end_station_address(ordinal: u32) -> AddressConfig {
    // Ordinals past the /24 wrap instead of overflowing the last octet.
    let host = ((END_STATION_HOST_OFFSET + ordinal) % 256) as u8;
    let [a, b, c] = END_STATION_NETWORK;
    AddressConfig {
        address: Ipv4Addr::new(a, b, c, host),
        mask: END_STATION_MASK,
        gateway: Some(END_STATION_GATEWAY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn end_stations_get_sequential_addresses() {
        let mut rng = rng();
        let mut topology = Topology::new();
        let first = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        let second = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);

        let first = topology.device(first).unwrap();
        assert_eq!(first.name, "Laptop1");
        let config = first.profile.address_config().unwrap();
        assert_eq!(config.address, Ipv4Addr::new(192, 168, 1, 11));
        assert_eq!(config.mask, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(config.gateway, Some(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(first.interfaces[0].address, Some(config.address));

        let second = topology.device(second).unwrap();
        assert_eq!(second.name, "Laptop2");
        assert_eq!(second.address(), Some(Ipv4Addr::new(192, 168, 1, 12)));
    }

    #[test]
    fn names_count_per_kind_and_gauges_start_in_range() {
        let mut rng = rng();
        let mut topology = Topology::new();
        topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        let router = topology.add_device(DeviceKind::Router, Point::default(), &mut rng);
        let switch = topology.add_device(DeviceKind::Switch, Point::default(), &mut rng);

        let router = topology.device(router).unwrap();
        assert_eq!(router.name, "Router1");
        assert!(router.address().is_none());
        assert_eq!(topology.device(switch).unwrap().interfaces.len(), 4);

        for device in topology.devices() {
            assert!((10.0..40.0).contains(&device.cpu));
            assert!((20.0..60.0).contains(&device.memory));
            assert_eq!(device.traffic, 0.0);
            assert_eq!(device.power, PowerState::Off);
            assert_eq!(device.interfaces.len(), device.kind().interface_template().len());
        }
    }

    #[test]
    fn connect_is_symmetric() {
        let mut rng = rng();
        let mut topology = Topology::new();
        let a = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        let r = topology.add_device(DeviceKind::Router, Point::default(), &mut rng);
        topology.update_device(a, DeviceUpdate::power(PowerState::On)).unwrap();

        let id = topology
            .connect(Endpoint::new(a, "Ethernet0"), Endpoint::new(r, "GigabitEthernet0/1"), &mut rng)
            .unwrap();

        let a_if = topology.device(a).unwrap().interface("Ethernet0").unwrap();
        let link = a_if.link.as_ref().unwrap();
        assert_eq!((link.device, link.interface.as_str(), link.connection), (r, "GigabitEthernet0/1", id));
        assert_eq!(a_if.link_state, LinkState::Up);

        // Router is off: AdminDown is replaced by Down once cabled.
        let r_if = topology.device(r).unwrap().interface("GigabitEthernet0/1").unwrap();
        let link = r_if.link.as_ref().unwrap();
        assert_eq!((link.device, link.interface.as_str(), link.connection), (a, "Ethernet0", id));
        assert_eq!(r_if.link_state, LinkState::Down);

        let untouched = topology.device(r).unwrap().interface("GigabitEthernet0/0").unwrap();
        assert_eq!(untouched.link_state, LinkState::AdminDown);

        let connection = &topology.connections()[0];
        assert_eq!(connection.state, ConnectionState::Active);
        assert!((100..1000).contains(&connection.bandwidth_mbps));
        assert!((1..=20).contains(&connection.latency_ms));
    }

    #[test]
    fn connect_rejects_busy_interfaces() {
        let mut rng = rng();
        let mut topology = Topology::new();
        let a = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        let b = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        let c = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        topology.connect(Endpoint::new(a, "Ethernet0"), Endpoint::new(b, "Ethernet0"), &mut rng).unwrap();

        let result = topology.connect(Endpoint::new(c, "Ethernet0"), Endpoint::new(a, "Ethernet0"), &mut rng);
        assert_eq!(result, Err(NetworkError::InterfaceAlreadyConnected));
        assert_eq!(topology.connections().len(), 1);
        assert!(!topology.device(c).unwrap().interfaces[0].is_connected());
    }

    #[test]
    fn remove_cascades_to_connections_only_of_that_device() {
        let mut rng = rng();
        let mut topology = Topology::new();
        let sw = topology.add_device(DeviceKind::Switch, Point::default(), &mut rng);
        let a = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        let b = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        let r = topology.add_device(DeviceKind::Router, Point::default(), &mut rng);
        topology.connect(Endpoint::new(a, "Ethernet0"), Endpoint::new(sw, "FastEthernet0/1"), &mut rng).unwrap();
        topology.connect(Endpoint::new(b, "Ethernet0"), Endpoint::new(sw, "FastEthernet0/2"), &mut rng).unwrap();
        let kept = topology
            .connect(Endpoint::new(r, "GigabitEthernet0/0"), Endpoint::new(r, "GigabitEthernet0/1"), &mut rng)
            .unwrap();

        let removed = topology.remove_device(sw).unwrap();
        assert_eq!(removed.name, "Switch1");
        assert!(topology.device(sw).is_none());

        let ids: Vec<ConnectionId> = topology.connections().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![kept]);
        for id in [a, b] {
            let interface = &topology.device(id).unwrap().interfaces[0];
            assert!(!interface.is_connected());
            assert_eq!(interface.link_state, LinkState::Down);
        }
        assert!(topology.device(r).unwrap().interfaces.iter().all(|i| i.is_connected()));

        // Second removal is a no-op.
        assert!(topology.remove_device(sw).is_none());
    }

    #[test]
    fn power_update_only_touches_connected_interfaces() {
        let mut rng = rng();
        let mut topology = Topology::new();
        let r = topology.add_device(DeviceKind::Router, Point::default(), &mut rng);
        let a = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        topology.connect(Endpoint::new(r, "GigabitEthernet0/0"), Endpoint::new(a, "Ethernet0"), &mut rng).unwrap();

        topology.update_device(r, DeviceUpdate::power(PowerState::On)).unwrap();
        let router = topology.device(r).unwrap();
        assert_eq!(router.interfaces[0].link_state, LinkState::Up);
        assert_eq!(router.interfaces[1].link_state, LinkState::AdminDown);

        topology.update_device(r, DeviceUpdate::power(PowerState::Off)).unwrap();
        assert_eq!(topology.device(r).unwrap().interfaces[0].link_state, LinkState::Down);
    }

    #[test]
    fn address_update_is_rejected_for_routers_without_side_effects() {
        let mut rng = rng();
        let mut topology = Topology::new();
        let r = topology.add_device(DeviceKind::Router, Point::default(), &mut rng);
        let update = DeviceUpdate {
            name: Some("Core".to_string()),
            address: Some(end_station_address(1)),
            ..Default::default()
        };
        assert_eq!(topology.update_device(r, update), Err(NetworkError::AddressNotSupported(r)));
        assert_eq!(topology.device(r).unwrap().name, "Router1");
        assert_eq!(
            topology.update_device(DeviceId(99), DeviceUpdate::default()),
            Err(NetworkError::DeviceNotFound(DeviceId(99)))
        );
    }

    #[test]
    fn duplicate_addresses_resolve_to_earliest_device() {
        let mut rng = rng();
        let mut topology = Topology::new();
        let first = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        let second = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        let update = DeviceUpdate {
            address: Some(end_station_address(1)),
            ..Default::default()
        };
        topology.update_device(second, update).unwrap();

        let found = topology.device_by_address(Ipv4Addr::new(192, 168, 1, 11)).unwrap();
        assert_eq!(found.id, first);
        assert!(topology.device_by_address(Ipv4Addr::new(192, 168, 1, 12)).is_none());
    }
}
