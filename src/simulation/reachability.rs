//! Ping reachability decision.
//!
//! A same-subnet heuristic stands in for IP forwarding: two end stations can
//! reach each other when both are powered and their addresses share the
//! first three octets. Routers on the path are not traversed.

use std::net::Ipv4Addr;

use super::error::NetworkError;
use super::topology::Topology;
use super::types::DeviceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Reachable { destination: DeviceId },
    OriginNotFound,
    DeviceOffline,
    DestinationNotFound,
    DestinationOffline,
    NoRouteToHost,
}

impl Outcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Outcome::Reachable { .. })
    }

    /// Failure as an error value, `None` when reachable.
    pub fn into_error(self, origin: DeviceId, destination: Ipv4Addr) -> Option<NetworkError> {
        match self {
            Outcome::Reachable { .. } => None,
            Outcome::OriginNotFound => Some(NetworkError::DeviceNotFound(origin)),
            Outcome::DeviceOffline => Some(NetworkError::DeviceOffline),
            Outcome::DestinationNotFound => Some(NetworkError::DestinationNotFound(destination)),
            Outcome::DestinationOffline => Some(NetworkError::DestinationOffline(destination)),
            Outcome::NoRouteToHost => Some(NetworkError::NoRouteToHost(destination)),
        }
    }
}

/// Decide whether a ping from `origin` to `destination` can succeed.
pub fn resolve(topology: &Topology, origin: DeviceId, destination: Ipv4Addr) -> Outcome {
    let Some(origin) = topology.device(origin) else {
        return Outcome::OriginNotFound;
    };
    if !origin.is_on() {
        return Outcome::DeviceOffline;
    }

    let Some(target) = topology.device_by_address(destination) else {
        return Outcome::DestinationNotFound;
    };
    if !target.is_on() {
        return Outcome::DestinationOffline;
    }

    match origin.address() {
        Some(source) if same_subnet(source, destination) => Outcome::Reachable { destination: target.id },
        _ => Outcome::NoRouteToHost,
    }
}

/// Compare the first three octets.
pub fn same_subnet(a: Ipv4Addr, b: Ipv4Addr) -> bool {
    a.octets()[..3] == b.octets()[..3]
}
