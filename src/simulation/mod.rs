//! Network simulation core module.
//!
//! This module holds the whole simulation engine for a small LAN of
//! laptops, routers and switches:
//! - Device and connection bookkeeping with cascade delete
//! - The two-click cabling handshake
//! - Same-subnet ping reachability
//! - Tick-driven packet travel and device gauges
//! - A bounded, most-recent-first event log
//!
//! ## Module Organization
//!
//! - `types`: Core data structures (devices, interfaces, connections, packets, channels)
//! - `error`: Domain error values
//! - `event_log`: Bounded event record
//! - `topology`: Device and connection store
//! - `connection_builder`: Cabling handshake state machine
//! - `reachability`: Ping decision function
//! - `scheduler`: Per-tick packet and gauge advancement
//! - `snapshot`: Read-only projections for the front end
//! - `network`: `Simulator`, the single owner of all of the above
//! - `network_task`: Embassy task serializing UI commands and ticks
//!
//! ## Public API
//!
//! The main entry point is `network_task`, which should be spawned by the
//! Embassy executor. It communicates with the front end via the channels
//! defined in `types`. `Simulator` can also be driven directly.

pub mod connection_builder;
pub mod error;
pub mod event_log;
pub mod network;
pub mod network_task;
pub mod reachability;
pub mod scheduler;
pub mod snapshot;
pub mod topology;
pub mod types;

pub use error::NetworkError;
pub use network::Simulator;
pub use network_task::network_task;
pub use snapshot::Snapshot;
