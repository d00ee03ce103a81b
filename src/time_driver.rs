//! Scaled embassy-time driver.
//!
//! Simulation time advances at `speed_percent` of wall time, so the tick
//! timer of the network task can be sped up or slowed down without touching
//! the configured tick interval. Wakers are queued by virtual deadline and
//! woken by a dedicated scheduler thread.

use core::task::Waker;
use embassy_time_driver::{Driver, TICK_HZ, time_driver_impl};
use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant as StdInstant};

use crate::config::{MAX_SPEED_PERCENT, MIN_SPEED_PERCENT};

/// Real-time upper bound on a scheduler wait, so speed changes apply promptly.
const MAX_WAIT_SLICE: Duration = Duration::from_millis(25);

#[derive(Debug)]
struct SimulationClock {
    /// Wall time at which `origin_ticks` was current.
    origin_real: StdInstant,
    origin_ticks: u64,
    speed_percent: u32,
}

impl SimulationClock {
    fn to_virtual(&self, real: StdInstant) -> u64 {
        let real_ns = real.saturating_duration_since(self.origin_real).as_nanos();
        let ticks = real_ns * u128::from(TICK_HZ) * u128::from(self.speed_percent) / (100 * 1_000_000_000);
        self.origin_ticks.saturating_add(ticks.min(u128::from(u64::MAX)) as u64)
    }

    fn to_real(&self, ticks: u64) -> StdInstant {
        // Deadlines before the origin are already due.
        let Some(delta) = ticks.checked_sub(self.origin_ticks) else {
            return self.origin_real;
        };
        let real_ns = u128::from(delta) * 100 * 1_000_000_000 / (u128::from(TICK_HZ) * u128::from(self.speed_percent));
        self.origin_real + Duration::from_nanos(real_ns.min(u128::from(u64::MAX)) as u64)
    }
}

#[derive(Default)]
struct WakeQueue {
    deadlines: BTreeMap<u64, Vec<Waker>>,
}

static CLOCK: OnceLock<Mutex<SimulationClock>> = OnceLock::new();
static QUEUE: OnceLock<Mutex<WakeQueue>> = OnceLock::new();
static QUEUE_CHANGED: Condvar = Condvar::new();
static SCHEDULER_STARTED: OnceLock<()> = OnceLock::new();

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn clock() -> MutexGuard<'static, SimulationClock> {
    lock(CLOCK.get_or_init(|| {
        Mutex::new(SimulationClock {
            origin_real: StdInstant::now(),
            origin_ticks: 0,
            speed_percent: 100,
        })
    }))
}

fn queue_mutex() -> &'static Mutex<WakeQueue> {
    QUEUE.get_or_init(|| Mutex::new(WakeQueue::default()))
}

fn ensure_scheduler_thread() {
    SCHEDULER_STARTED.get_or_init(|| {
        if let Err(err) = std::thread::Builder::new().name("nexus-time-scheduler".into()).spawn(scheduler_thread) {
            log::error!("Failed to start time scheduler thread: {}", err);
        }
    });
}

fn scheduler_thread() {
    loop {
        // The clock lock is never taken while the queue lock is held.
        let next_deadline = {
            let mut queue = lock(queue_mutex());
            while queue.deadlines.is_empty() {
                queue = QUEUE_CHANGED.wait(queue).unwrap_or_else(PoisonError::into_inner);
            }
            queue.deadlines.keys().next().copied()
        };
        let Some(next_deadline) = next_deadline else {
            continue;
        };

        let due_at = clock().to_real(next_deadline);
        let now = StdInstant::now();
        if due_at > now {
            let queue = lock(queue_mutex());
            let wait = (due_at - now).min(MAX_WAIT_SLICE);
            drop(QUEUE_CHANGED.wait_timeout(queue, wait).unwrap_or_else(PoisonError::into_inner));
            continue;
        }

        let now_ticks = clock().to_virtual(StdInstant::now());
        let ready: Vec<Waker> = {
            let mut queue = lock(queue_mutex());
            let later = queue.deadlines.split_off(&now_ticks.saturating_add(1));
            std::mem::replace(&mut queue.deadlines, later).into_values().flatten().collect()
        };
        for waker in ready {
            waker.wake();
        }
    }
}

struct ScaledDriver;

impl Driver for ScaledDriver {
    fn now(&self) -> u64 {
        clock().to_virtual(StdInstant::now())
    }

    fn schedule_wake(&self, at: u64, waker: &Waker) {
        ensure_scheduler_thread();
        {
            let mut queue = lock(queue_mutex());
            let wakers = queue.deadlines.entry(at).or_default();
            // Futures re-polled before their deadline re-register the same waker.
            if !wakers.iter().any(|w| w.will_wake(waker)) {
                wakers.push(waker.clone());
            }
        }
        QUEUE_CHANGED.notify_all();
    }
}

time_driver_impl!(static DRIVER: ScaledDriver = ScaledDriver);

/// Change the simulation clock speed. Virtual time stays continuous across
/// the change; only its rate is affected.
pub fn set_speed_percent(percent: u32) {
    let percent = percent.clamp(MIN_SPEED_PERCENT, MAX_SPEED_PERCENT);
    {
        let mut clock = clock();
        if clock.speed_percent == percent {
            return;
        }
        let now = StdInstant::now();
        clock.origin_ticks = clock.to_virtual(now);
        clock.origin_real = now;
        clock.speed_percent = percent;
    }
    log::info!("Simulation speed set to {}%", percent);
    QUEUE_CHANGED.notify_all();
}

pub fn speed_percent() -> u32 {
    clock().speed_percent
}
