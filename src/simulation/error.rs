//! Recoverable failures surfaced by the engine.
//!
//! None of these are fatal: each one describes a user-visible condition
//! that leaves the simulation state untouched.

use std::net::Ipv4Addr;

use super::types::DeviceId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Origin of a ping is powered off.
    DeviceOffline,
    /// No device owns the pinged address.
    DestinationNotFound(Ipv4Addr),
    /// The device owning the pinged address is powered off.
    DestinationOffline(Ipv4Addr),
    /// Origin and destination are not on the same /24.
    NoRouteToHost(Ipv4Addr),
    InvalidAddressFormat(String),
    UnrecognizedCommand(String),
    /// Cabling attempt on an interface that already has a peer. Never logged.
    InterfaceAlreadyConnected,
    DeviceNotFound(DeviceId),
    NoDeviceSelected,
    /// Device-level addressing is only available on end stations.
    AddressNotSupported(DeviceId),
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::DeviceOffline => write!(f, "Device is powered off"),
            NetworkError::DestinationNotFound(address) => write!(f, "Ping to {}: destination not found", address),
            NetworkError::DestinationOffline(address) => write!(f, "Ping to {}: destination powered off", address),
            NetworkError::NoRouteToHost(address) => write!(f, "Ping to {}: no route to host", address),
            NetworkError::InvalidAddressFormat(input) => write!(f, "Invalid IP address format: '{}'", input),
            NetworkError::UnrecognizedCommand(input) => write!(f, "Command not recognized: {}", input),
            NetworkError::InterfaceAlreadyConnected => write!(f, "Interface already connected"),
            NetworkError::DeviceNotFound(id) => write!(f, "Device {} not found", id),
            NetworkError::NoDeviceSelected => write!(f, "No device selected"),
            NetworkError::AddressNotSupported(id) => write!(f, "Device {} does not carry a device-level address", id),
        }
    }
}

impl std::error::Error for NetworkError {}
