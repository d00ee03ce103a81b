//! Two-click cabling protocol.
//!
//! The builder only tracks where the user is in the handshake; the cable
//! itself is created by `Topology::connect`. There is no timeout: a pending
//! origin stays until the second click lands or the mode is cancelled.

use rand::Rng;
use serde::Serialize;

use super::topology::Topology;
use super::types::{ConnectionId, DeviceId, Endpoint};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum BuilderState {
    #[default]
    Idle,
    AwaitingOrigin,
    AwaitingDestination { origin: Endpoint },
}

/// Result of a single interface click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    OriginSelected,
    Connected(ConnectionId),
    /// The click did not change anything (busy interface, same interface
    /// twice, unknown target, or not in connect mode).
    Ignored,
}

#[derive(Debug, Default)]
pub struct ConnectionBuilder {
    state: BuilderState,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != BuilderState::Idle
    }

    pub fn enter_connect_mode(&mut self) {
        if self.state == BuilderState::Idle {
            self.state = BuilderState::AwaitingOrigin;
        }
    }

    /// Leave connect mode, discarding any pending origin.
    pub fn exit_connect_mode(&mut self) {
        self.state = BuilderState::Idle;
    }

    pub fn select_interface<R: Rng>(&mut self, topology: &mut Topology, target: Endpoint, rng: &mut R) -> SelectOutcome {
        // Unknown devices and interfaces are treated like busy ones.
        if !topology.is_free(&target).unwrap_or(false) {
            log::debug!("Ignoring click on unavailable interface {}/{}", target.device, target.interface);
            return SelectOutcome::Ignored;
        }

        match &self.state {
            BuilderState::Idle => SelectOutcome::Ignored,
            BuilderState::AwaitingOrigin => {
                self.state = BuilderState::AwaitingDestination { origin: target };
                SelectOutcome::OriginSelected
            }
            BuilderState::AwaitingDestination { origin } => {
                if *origin == target {
                    return SelectOutcome::Ignored;
                }
                match topology.connect(origin.clone(), target, rng) {
                    Ok(id) => {
                        self.state = BuilderState::Idle;
                        SelectOutcome::Connected(id)
                    }
                    Err(err) => {
                        log::debug!("Connection attempt ignored: {}", err);
                        SelectOutcome::Ignored
                    }
                }
            }
        }
    }

    /// Drop a pending origin that lives on a removed device. Connect mode
    /// itself stays active.
    pub fn forget_device(&mut self, device: DeviceId) {
        if let BuilderState::AwaitingDestination { origin } = &self.state {
            if origin.device == device {
                self.state = BuilderState::AwaitingOrigin;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::{DeviceKind, Point};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (Topology, ChaCha8Rng, DeviceId, DeviceId) {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut topology = Topology::new();
        let a = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        let b = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        (topology, rng, a, b)
    }

    #[test]
    fn two_clicks_create_a_connection() {
        let (mut topology, mut rng, a, b) = setup();
        let mut builder = ConnectionBuilder::new();
        builder.enter_connect_mode();
        assert_eq!(builder.state(), &BuilderState::AwaitingOrigin);

        let outcome = builder.select_interface(&mut topology, Endpoint::new(a, "Ethernet0"), &mut rng);
        assert_eq!(outcome, SelectOutcome::OriginSelected);
        assert!(matches!(builder.state(), BuilderState::AwaitingDestination { .. }));

        let outcome = builder.select_interface(&mut topology, Endpoint::new(b, "Ethernet0"), &mut rng);
        assert!(matches!(outcome, SelectOutcome::Connected(_)));
        assert_eq!(builder.state(), &BuilderState::Idle);
        assert_eq!(topology.connections().len(), 1);
    }

    #[test]
    fn same_interface_twice_is_ignored() {
        let (mut topology, mut rng, a, _) = setup();
        let mut builder = ConnectionBuilder::new();
        builder.enter_connect_mode();
        builder.select_interface(&mut topology, Endpoint::new(a, "Ethernet0"), &mut rng);

        let outcome = builder.select_interface(&mut topology, Endpoint::new(a, "Ethernet0"), &mut rng);
        assert_eq!(outcome, SelectOutcome::Ignored);
        assert_eq!(
            builder.state(),
            &BuilderState::AwaitingDestination {
                origin: Endpoint::new(a, "Ethernet0")
            }
        );
        assert!(topology.connections().is_empty());
    }

    #[test]
    fn connected_interfaces_are_ignored_in_both_phases() {
        let (mut topology, mut rng, a, b) = setup();
        let c = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        topology.connect(Endpoint::new(a, "Ethernet0"), Endpoint::new(b, "Ethernet0"), &mut rng).unwrap();

        let mut builder = ConnectionBuilder::new();
        builder.enter_connect_mode();
        assert_eq!(builder.select_interface(&mut topology, Endpoint::new(a, "Ethernet0"), &mut rng), SelectOutcome::Ignored);
        assert_eq!(builder.state(), &BuilderState::AwaitingOrigin);

        builder.select_interface(&mut topology, Endpoint::new(c, "Ethernet0"), &mut rng);
        assert_eq!(builder.select_interface(&mut topology, Endpoint::new(b, "Ethernet0"), &mut rng), SelectOutcome::Ignored);
        assert!(matches!(builder.state(), BuilderState::AwaitingDestination { .. }));
    }

    #[test]
    fn idle_clicks_and_cancel() {
        let (mut topology, mut rng, a, _) = setup();
        let mut builder = ConnectionBuilder::new();
        assert_eq!(builder.select_interface(&mut topology, Endpoint::new(a, "Ethernet0"), &mut rng), SelectOutcome::Ignored);
        assert!(!builder.is_active());

        builder.enter_connect_mode();
        builder.select_interface(&mut topology, Endpoint::new(a, "Ethernet0"), &mut rng);
        builder.exit_connect_mode();
        assert_eq!(builder.state(), &BuilderState::Idle);
        assert!(!topology.device(a).unwrap().interfaces[0].is_connected());
    }

    #[test]
    fn removed_origin_returns_to_awaiting_origin() {
        let (mut topology, mut rng, a, _) = setup();
        let mut builder = ConnectionBuilder::new();
        builder.enter_connect_mode();
        builder.select_interface(&mut topology, Endpoint::new(a, "Ethernet0"), &mut rng);
        builder.forget_device(a);
        assert_eq!(builder.state(), &BuilderState::AwaitingOrigin);
    }
}
