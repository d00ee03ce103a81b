//! Simulation configuration loading.
//!
//! Every key is optional; missing keys fall back to the reference values
//! below. Keys are kebab-case:
//!
//! ```toml
//! tick-interval-ms = 300
//! progress-step = 8
//! speed-percent = 200
//! seed = 1234
//! ```

use anyhow::{Context, bail};
use serde::Deserialize;
use std::path::Path;

use crate::simulation::event_log::EVENT_LOG_CAPACITY;

pub const MIN_SPEED_PERCENT: u32 = 1;
pub const MAX_SPEED_PERCENT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Interval between scheduler ticks (ms).
    pub tick_interval_ms: u64,
    /// Progress added to every in-flight packet per tick (percent).
    pub progress_step: u8,
    /// Traffic added to both endpoints when a ping is sent.
    pub traffic_bump: f64,
    /// Traffic removed from every device per tick.
    pub traffic_decay: f64,
    /// Width of the per-tick CPU random walk; the delta is uniform in ±span/2.
    pub cpu_walk_span: f64,
    /// Width of the per-tick memory random walk.
    pub memory_walk_span: f64,
    /// Inclusive bounds of the reported round-trip time (ms).
    pub rtt_min_ms: u32,
    pub rtt_max_ms: u32,
    /// Number of retained event log entries.
    pub event_log_capacity: usize,
    /// Simulation clock speed relative to wall time (100 = real time).
    pub speed_percent: u32,
    /// Seed for all ambient randomness. Entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 300,
            progress_step: 8,
            traffic_bump: 15.0,
            traffic_decay: 3.0,
            cpu_walk_span: 8.0,
            memory_walk_span: 4.0,
            rtt_min_ms: 1,
            rtt_max_ms: 50,
            event_log_capacity: EVENT_LOG_CAPACITY,
            speed_percent: 100,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(config_path).with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: SimulationConfig = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or corrupt the simulation.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tick-interval-ms must be positive");
        }
        if self.progress_step == 0 || self.progress_step > 100 {
            bail!("Invalid progress-step {}, must be 1-100", self.progress_step);
        }
        if !(MIN_SPEED_PERCENT..=MAX_SPEED_PERCENT).contains(&self.speed_percent) {
            bail!("Invalid speed-percent {}, must be {}-{}", self.speed_percent, MIN_SPEED_PERCENT, MAX_SPEED_PERCENT);
        }
        if self.event_log_capacity == 0 {
            bail!("event-log-capacity must be positive");
        }
        for (name, value) in [
            ("traffic-bump", self.traffic_bump),
            ("traffic-decay", self.traffic_decay),
            ("cpu-walk-span", self.cpu_walk_span),
            ("memory-walk-span", self.memory_walk_span),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("Invalid {} {}, must be a non-negative number", name, value);
            }
        }
        if self.rtt_min_ms > self.rtt_max_ms {
            bail!("rtt-min-ms ({}) exceeds rtt-max-ms ({})", self.rtt_min_ms, self.rtt_max_ms);
        }
        Ok(())
    }

    /// Ticks a packet needs to travel from 0 to 100.
    pub fn ticks_per_packet(&self) -> u32 {
        100u32.div_ceil(u32::from(self.progress_step.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_reference_values() {
        let config = SimulationConfig::from_toml("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.ticks_per_packet(), 13);
    }

    #[test]
    fn kebab_case_keys_override_defaults() {
        let config = SimulationConfig::from_toml("tick-interval-ms = 50\nprogress-step = 25\nseed = 9\n").unwrap();
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.progress_step, 25);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.ticks_per_packet(), 4);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SimulationConfig::from_toml("progress-step = 0").is_err());
        assert!(SimulationConfig::from_toml("tick-interval-ms = 0").is_err());
        assert!(SimulationConfig::from_toml("traffic-decay = -1.0").is_err());
        assert!(SimulationConfig::from_toml("rtt-min-ms = 60").is_err());
        assert!(SimulationConfig::from_toml("speed-percent = 0").is_err());
        assert!(SimulationConfig::from_toml("speed-percent = 5000").is_err());
        assert!(SimulationConfig::from_toml("unknown-key = 1").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SimulationConfig::load(Path::new("/nonexistent/nexus.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/nexus.toml"));
    }
}
