//! Nexus network simulator engine.
//!
//! A toy LAN simulator: place devices, cable their interfaces, open a
//! terminal on a laptop and watch pings travel across the canvas.

pub mod config;
pub mod simulation;
pub mod terminal;
pub mod time_driver;
pub mod ui;
