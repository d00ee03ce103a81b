//! Central network task driving the simulation timeline and UI updates.
//!
//! High-level flow each loop iteration:
//! 1) While running, `select` waits for a UI command or the next tick
//!    deadline. While paused, only commands are awaited.
//! 2) Commands are applied to the `Simulator` one at a time; a tick is
//!    applied as a single batch.
//! 3) After either, a fresh snapshot is published to the front end.

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};

use super::error::NetworkError;
use super::network::Simulator;
use super::types::{UICommandQueueReceiver, UIRefreshQueueSender};
use crate::config::SimulationConfig;
use crate::ui::{UICommand, UIRefreshState};

#[embassy_executor::task]
pub async fn network_task(config: SimulationConfig, ui_refresh_tx: UIRefreshQueueSender, ui_command_rx: UICommandQueueReceiver) {
    let tick_interval = Duration::from_millis(config.tick_interval_ms);
    log::info!("Network task started, tick interval {} ms", tick_interval.as_millis());
    run(Simulator::new(config), tick_interval, ui_refresh_tx, ui_command_rx).await;
}

/// Command/tick loop owned by `network_task`. Never returns.
pub async fn run(mut simulator: Simulator, tick_interval: Duration, ui_refresh_tx: UIRefreshQueueSender, ui_command_rx: UICommandQueueReceiver) {
    let mut schedule = TickSchedule::new(tick_interval, Instant::now());
    publish_snapshot(&simulator, &ui_refresh_tx);

    loop {
        let command = if simulator.is_running() {
            match select(ui_command_rx.receive(), Timer::at(schedule.deadline())).await {
                Either::First(command) => Some(command),
                Either::Second(()) => None,
            }
        } else {
            Some(ui_command_rx.receive().await)
        };

        match command {
            Some(command) => {
                let was_running = simulator.is_running();
                if let Err(err) = apply_command(&mut simulator, command) {
                    log::warn!("Command rejected: {}", err);
                    ui_refresh_tx.try_send(UIRefreshState::Alert(err.to_string())).ok();
                }
                if !was_running && simulator.is_running() {
                    schedule.resume(Instant::now());
                }
            }
            None => {
                let completed = simulator.tick();
                if !completed.is_empty() {
                    log::debug!("{} packet(s) delivered", completed.len());
                }
                schedule.advance(Instant::now());
            }
        }

        publish_snapshot(&simulator, &ui_refresh_tx);
    }
}

/// Deadline of the next tick. Only consulted while the simulation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    interval: Duration,
    next: Instant,
}

impl TickSchedule {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self { interval, next: now + interval }
    }

    pub fn deadline(&self) -> Instant {
        self.next
    }

    /// Re-arm a full interval after `now`; time spent paused is not owed.
    pub fn resume(&mut self, now: Instant) {
        self.next = now + self.interval;
    }

    /// Step past a tick that just fired. After a stall the schedule restarts
    /// from `now` instead of bursting the missed ticks.
    pub fn advance(&mut self, now: Instant) {
        self.next += self.interval;
        if self.next < now {
            self.next = now + self.interval;
        }
    }
}

/// Apply one front end command.
///
/// Terminal failures are already reported in the transcript and event log,
/// so only failures the user would otherwise not see are returned.
pub fn apply_command(simulator: &mut Simulator, command: UICommand) -> Result<(), NetworkError> {
    match command {
        UICommand::AddDevice(kind, position) => {
            simulator.add_device(kind, position);
        }
        UICommand::RemoveDevice(id) => simulator.remove_device(id),
        UICommand::UpdateDevice(id, update) => simulator.update_device(id, update)?,
        UICommand::SelectDevice(id) => simulator.select_device(id)?,
        UICommand::EnterConnectMode => simulator.enter_connect_mode(),
        UICommand::SelectInterface(endpoint) => {
            let outcome = simulator.select_interface(endpoint.device, &endpoint.interface);
            log::debug!("Interface {}:{} selected: {:?}", endpoint.device, endpoint.interface, outcome);
        }
        UICommand::ExitConnectMode => simulator.exit_connect_mode(),
        UICommand::Execute(line) => match simulator.execute(&line) {
            Err(NetworkError::NoDeviceSelected) => return Err(NetworkError::NoDeviceSelected),
            Err(err) => log::debug!("Terminal command '{}' failed: {}", line.trim(), err),
            Ok(()) => {}
        },
        UICommand::SetRunning(running) => simulator.set_running(running),
        UICommand::Reset => simulator.reset(),
        UICommand::RequestSnapshot => {}
    }
    Ok(())
}

fn publish_snapshot(simulator: &Simulator, ui_refresh_tx: &UIRefreshQueueSender) {
    if ui_refresh_tx.try_send(UIRefreshState::Snapshot(Box::new(simulator.snapshot()))).is_err() {
        log::trace!("Refresh queue full, snapshot dropped");
    }
}
