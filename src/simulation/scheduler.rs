//! Tick-driven packet and gauge advancement.
//!
//! One `tick` call is one batch: every in-flight packet moves forward, then
//! every device gauge is updated. The controller never interleaves other
//! mutations with a tick, so observers see either all of it or none of it.

use rand::Rng;
use std::net::Ipv4Addr;

use super::event_log::{EventLog, Severity};
use super::topology::Topology;
use super::types::{DeviceId, GAUGE_MAX, PING_PAYLOAD_SIZE, PROGRESS_COMPLETE, Packet, PacketId, PacketKind};
use crate::config::SimulationConfig;

/// Parameters of a ping that passed (or failed) reachability.
#[derive(Debug, Clone)]
pub struct PingRequest {
    pub origin: DeviceId,
    pub destination: DeviceId,
    pub source_address: Ipv4Addr,
    pub destination_address: Ipv4Addr,
    pub origin_label: String,
    pub success: bool,
}

#[derive(Debug, Default)]
pub struct PacketScheduler {
    packets: Vec<Packet>,
    next_packet_id: u64,
}

impl PacketScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-flight packets, in injection order.
    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    /// Queue a ping at progress 0 and bump both endpoints' traffic.
    pub fn inject(&mut self, topology: &mut Topology, request: PingRequest, config: &SimulationConfig) -> PacketId {
        let id = PacketId(self.next_packet_id);
        self.next_packet_id += 1;

        for device in [request.origin, request.destination] {
            if let Some(device) = topology.device_mut(device) {
                device.bump_traffic(config.traffic_bump);
            }
        }

        self.packets.push(Packet {
            id,
            source: request.origin,
            destination: request.destination,
            source_address: request.source_address,
            destination_address: request.destination_address,
            progress: 0,
            kind: PacketKind::Ping,
            success: request.success,
            size: PING_PAYLOAD_SIZE,
            origin_label: request.origin_label,
        });
        id
    }

    /// Advance every packet and gauge by one step. Returns the packets that
    /// completed during this tick.
    pub fn tick<R: Rng>(&mut self, topology: &mut Topology, log: &mut EventLog, rng: &mut R, config: &SimulationConfig) -> Vec<Packet> {
        let mut completed = Vec::new();
        for packet in self.packets.iter_mut() {
            packet.progress = packet.progress.saturating_add(config.progress_step).min(PROGRESS_COMPLETE);
        }

        let (done, in_flight): (Vec<Packet>, Vec<Packet>) = self.packets.drain(..).partition(|p| p.progress >= PROGRESS_COMPLETE);
        self.packets = in_flight;

        for packet in done {
            if packet.kind == PacketKind::Ping {
                if packet.success {
                    let rtt = rng.gen_range(config.rtt_min_ms..=config.rtt_max_ms);
                    log.push(
                        &packet.origin_label,
                        Severity::Success,
                        format!("Ping to {}: response received ({}ms)", packet.destination_address, rtt),
                    );
                } else {
                    log.push(&packet.origin_label, Severity::Error, format!("Ping to {}: request timed out", packet.destination_address));
                }
            }
            completed.push(packet);
        }

        for device in topology.devices_mut() {
            device.cpu = random_walk(device.cpu, config.cpu_walk_span, rng);
            device.memory = random_walk(device.memory, config.memory_walk_span, rng);
            device.traffic = (device.traffic - config.traffic_decay).max(0.0);
        }

        completed
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Uniform step in ±span/2, clamped to the gauge range.
fn random_walk<R: Rng>(value: f64, span: f64, rng: &mut R) -> f64 {
    let delta = (rng.gen_range(0.0..1.0) - 0.5) * span;
    (value + delta).clamp(0.0, GAUGE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::{DeviceKind, Point};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (Topology, ChaCha8Rng, DeviceId, DeviceId) {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut topology = Topology::new();
        let a = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        let b = topology.add_device(DeviceKind::EndStation, Point::default(), &mut rng);
        (topology, rng, a, b)
    }

    fn request(origin: DeviceId, destination: DeviceId, success: bool) -> PingRequest {
        PingRequest {
            origin,
            destination,
            source_address: Ipv4Addr::new(192, 168, 1, 11),
            destination_address: Ipv4Addr::new(192, 168, 1, 12),
            origin_label: "Laptop1".to_string(),
            success,
        }
    }

    #[test]
    fn inject_bumps_traffic_with_ceiling() {
        let (mut topology, _, a, b) = setup();
        let config = SimulationConfig::default();
        let mut scheduler = PacketScheduler::new();
        for _ in 0..8 {
            scheduler.inject(&mut topology, request(a, b, true), &config);
        }
        assert_eq!(scheduler.packets().len(), 8);
        assert!(scheduler.packets().iter().all(|p| p.progress == 0 && p.kind == PacketKind::Ping && p.size == 64));
        assert_eq!(topology.device(a).unwrap().traffic, 100.0);
        assert_eq!(topology.device(b).unwrap().traffic, 100.0);
    }

    #[test]
    fn packet_completes_exactly_once_after_thirteen_ticks() {
        let (mut topology, mut rng, a, b) = setup();
        let config = SimulationConfig::default();
        let mut log = EventLog::default();
        let mut scheduler = PacketScheduler::new();
        let id = scheduler.inject(&mut topology, request(a, b, true), &config);

        let mut last_progress = 0;
        for _ in 0..12 {
            assert!(scheduler.tick(&mut topology, &mut log, &mut rng, &config).is_empty());
            let progress = scheduler.packets()[0].progress;
            assert!(progress > last_progress);
            last_progress = progress;
        }
        assert_eq!(last_progress, 96);
        assert!(log.is_empty());

        let completed = scheduler.tick(&mut topology, &mut log, &mut rng, &config);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, id);
        assert_eq!(completed[0].progress, 100);
        assert!(scheduler.packets().is_empty());

        let entry = log.latest().unwrap();
        assert_eq!(entry.severity, Severity::Success);
        assert_eq!(entry.label, "Laptop1");
        assert!(entry.message.starts_with("Ping to 192.168.1.12: response received ("));
        let rtt: u32 = entry.message.trim_end_matches("ms)").rsplit('(').next().unwrap().parse().unwrap();
        assert!((1..=50).contains(&rtt));

        assert!(scheduler.tick(&mut topology, &mut log, &mut rng, &config).is_empty());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn failed_packet_reports_timeout() {
        let (mut topology, mut rng, a, b) = setup();
        let config = SimulationConfig {
            progress_step: 100,
            ..Default::default()
        };
        let mut log = EventLog::default();
        let mut scheduler = PacketScheduler::new();
        scheduler.inject(&mut topology, request(a, b, false), &config);
        scheduler.tick(&mut topology, &mut log, &mut rng, &config);
        let entry = log.latest().unwrap();
        assert_eq!(entry.severity, Severity::Error);
        assert_eq!(entry.message, "Ping to 192.168.1.12: request timed out");
    }

    #[test]
    fn gauges_stay_in_range_and_traffic_decays() {
        let (mut topology, mut rng, a, b) = setup();
        let config = SimulationConfig::default();
        let mut log = EventLog::default();
        let mut scheduler = PacketScheduler::new();
        scheduler.inject(&mut topology, request(a, b, true), &config);
        assert_eq!(topology.device(a).unwrap().traffic, 15.0);

        scheduler.tick(&mut topology, &mut log, &mut rng, &config);
        assert_eq!(topology.device(a).unwrap().traffic, 12.0);

        for _ in 0..500 {
            let cpu_before: Vec<f64> = topology.devices().iter().map(|d| d.cpu).collect();
            scheduler.tick(&mut topology, &mut log, &mut rng, &config);
            for (device, before) in topology.devices().iter().zip(cpu_before) {
                assert!((0.0..=100.0).contains(&device.cpu));
                assert!((0.0..=100.0).contains(&device.memory));
                assert!((device.cpu - before).abs() <= 4.0);
                assert!(device.traffic >= 0.0);
            }
        }
        assert_eq!(topology.device(a).unwrap().traffic, 0.0);
    }

    #[test]
    fn packets_survive_endpoint_removal() {
        let (mut topology, mut rng, a, b) = setup();
        let config = SimulationConfig {
            progress_step: 50,
            ..Default::default()
        };
        let mut log = EventLog::default();
        let mut scheduler = PacketScheduler::new();
        scheduler.inject(&mut topology, request(a, b, true), &config);
        topology.remove_device(a);

        scheduler.tick(&mut topology, &mut log, &mut rng, &config);
        let completed = scheduler.tick(&mut topology, &mut log, &mut rng, &config);
        assert_eq!(completed.len(), 1);
        assert_eq!(log.latest().unwrap().label, "Laptop1");
    }
}
