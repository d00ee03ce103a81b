use anyhow::Context;
use embassy_executor::{Executor, Spawner};
use env_logger::Builder;
use log::{LevelFilter, info, warn};
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use nexus_network_simulator::config::SimulationConfig;
use nexus_network_simulator::simulation::network_task;
use nexus_network_simulator::simulation::snapshot::Snapshot;
use nexus_network_simulator::simulation::types::{UICommandQueue, UICommandQueueReceiver, UIRefreshQueue, UIRefreshQueueReceiver, UIRefreshQueueSender};
use nexus_network_simulator::time_driver;
use nexus_network_simulator::ui::UIRefreshState;
use nexus_network_simulator::ui::console::{CONSOLE_HELP, ConsoleInput, ConsoleView, parse_input};

/// How often the console drains the refresh queue.
const REFRESH_POLL_INTERVAL: Duration = Duration::from_millis(20);

type LatestSnapshot = Arc<Mutex<Option<Box<Snapshot>>>>;

fn embassy_init(spawner: Spawner, config: SimulationConfig, ui_refresh_tx: UIRefreshQueueSender, ui_command_rx: UICommandQueueReceiver) {
    let _ = spawner.spawn(network_task(config, ui_refresh_tx, ui_command_rx));
}

/// Print new log entries, transcript lines and alerts as they arrive.
fn refresh_loop(ui_refresh_rx: UIRefreshQueueReceiver, latest: LatestSnapshot) {
    let mut view = ConsoleView::new();
    loop {
        while let Ok(state) = ui_refresh_rx.try_receive() {
            match state {
                UIRefreshState::Alert(message) => println!("! {}", message),
                UIRefreshState::Snapshot(snapshot) => {
                    for line in view.render(&snapshot) {
                        println!("{}", line);
                    }
                    *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
                }
            }
        }
        thread::sleep(REFRESH_POLL_INTERVAL);
    }
}

fn main() -> anyhow::Result<()> {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter(Some("nexus_network_simulator"), LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load(Path::new(&path))?,
        None => SimulationConfig::default(),
    };
    info!("Starting up with {:?}", config);
    time_driver::set_speed_percent(config.speed_percent);

    let ui_refresh_channel: &'static UIRefreshQueue = Box::leak(Box::new(UIRefreshQueue::new()));
    let ui_command_channel: &'static UICommandQueue = Box::leak(Box::new(UICommandQueue::new()));

    let ui_refresh_tx = ui_refresh_channel.sender();
    let ui_refresh_rx = ui_refresh_channel.receiver();
    let ui_command_tx = ui_command_channel.sender();
    let ui_command_rx = ui_command_channel.receiver();

    // Spawn Embassy executor on a dedicated background thread
    thread::Builder::new()
        .name("embassy-executor".to_string())
        .spawn(move || {
            // Leak the executor to satisfy the 'static lifetime required by run()
            let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
            executor.run(|spawner| embassy_init(spawner, config, ui_refresh_tx, ui_command_rx));
        })
        .context("failed to spawn embassy thread")?;

    let latest: LatestSnapshot = Arc::new(Mutex::new(None));
    let refresh_latest = Arc::clone(&latest);
    thread::Builder::new()
        .name("console-refresh".to_string())
        .spawn(move || refresh_loop(ui_refresh_rx, refresh_latest))
        .context("failed to spawn console refresh thread")?;

    println!("Nexus network simulator. Type 'help' for commands.");
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read console input")?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_input(&line) {
            Ok(ConsoleInput::Command(command)) => {
                if ui_command_tx.try_send(command).is_err() {
                    warn!("Command queue full, input dropped");
                }
            }
            Ok(ConsoleInput::Snapshot) => match latest.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
                Some(snapshot) => println!("{}", serde_json::to_string_pretty(snapshot)?),
                None => println!("! no snapshot received yet"),
            },
            Ok(ConsoleInput::Speed(percent)) => {
                time_driver::set_speed_percent(percent);
                println!("speed {}%", time_driver::speed_percent());
            }
            Ok(ConsoleInput::Help) => {
                for help_line in CONSOLE_HELP {
                    println!("{}", help_line);
                }
            }
            Ok(ConsoleInput::Quit) => break,
            Err(err) => println!("! {:#}", err),
        }
    }

    info!("Shutting down");
    Ok(())
}
