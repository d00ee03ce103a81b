// Front end contract for the Nexus network simulator
//
// The network task owns all simulation state. Front ends talk to it only
// through these two message types:
// - `UICommand`: user intent, sent front end → network task
// - `UIRefreshState`: snapshots and alerts, sent network task → front end
//
// - `console`: line-oriented front end used by the binary

pub mod console;

use crate::simulation::snapshot::Snapshot;
use crate::simulation::types::{DeviceId, DeviceKind, DeviceUpdate, Endpoint, Point};

#[derive(Debug)]
pub enum UIRefreshState {
    Alert(String),
    Snapshot(Box<Snapshot>),
}

#[derive(Debug, Clone)]
pub enum UICommand {
    AddDevice(DeviceKind, Point),
    RemoveDevice(DeviceId),
    UpdateDevice(DeviceId, DeviceUpdate),
    /// Open a terminal on a device, or close it with `None`.
    SelectDevice(Option<DeviceId>),
    EnterConnectMode,
    SelectInterface(Endpoint),
    ExitConnectMode,
    /// Terminal input for the selected device.
    Execute(String),
    SetRunning(bool),
    Reset,
    RequestSnapshot,
}
