mod coordinator;
mod domain;
mod infrastructure;
mod presentation;

use crate::coordinator::Coordinator;
use crate::domain::settings::{Settings, SettingsService};
use crate::infrastructure::bluetooth::connection::ConnectionManager;
use crate::infrastructure::bluetooth::scanner::DeviceScanner;
use crate::infrastructure::bluetooth::simulated::{SimulatedLink, SimulatedMedium};
use crate::infrastructure::bluetooth::transport::{Connector, DiscoveryMedium};
use crate::presentation::presence::{self, ControlCommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let settings = match SettingsService::new() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match infrastructure::logging::init_logger(&settings.get().log_settings) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging setup failed, continuing without: {e:#}");
            None
        }
    };

    // Client mode: talk to the running instance and leave.
    if args.first().map(String::as_str) == Some("--ctl") {
        return run_control_client(settings.get(), args.get(1).map(String::as_str));
    }

    let simulate = args.iter().any(|a| a == "--simulate");
    run_controller(settings.get().clone(), simulate)
}

fn run_controller(settings: Settings, simulate: bool) -> ExitCode {
    info!("Starting Motor Controller Companion");

    let (medium, connector, simulated_link) = match select_backend(simulate, &settings) {
        Ok(backend) => backend,
        Err(e) => {
            error!("No usable Bluetooth backend: {e:#}");
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    // Startup is strictly sequential: discover, then a single connection
    // attempt. Either failure aborts before any surface starts.
    let scanner = DeviceScanner::new(medium);
    let address = match scanner.discover(
        &settings.device_name,
        Duration::from_secs(settings.scan_duration_secs),
    ) {
        Ok(address) => address,
        Err(e) => {
            error!("Discovery failed: {}", e);
            eprintln!("Could not find '{}': {}", settings.device_name, e);
            return ExitCode::FAILURE;
        }
    };

    let connection = Arc::new(ConnectionManager::new());
    if let Err(e) = connection.open(connector.as_ref(), &address, settings.rfcomm_channel) {
        eprintln!("Could not connect to the motor controller: {}", e);
        return ExitCode::FAILURE;
    }

    let coordinator = Arc::new(Coordinator::new(connection));

    // Presence worker: background surface, lives until the process exits.
    {
        let coordinator = Arc::clone(&coordinator);
        let socket_name = settings.control_socket_name.clone();
        std::thread::spawn(move || {
            if let Err(e) = presence::run_presence_listener(&socket_name, coordinator) {
                error!("Presence listener stopped: {e:#}");
            }
        });
    }

    presentation::cli::run_command_loop(Arc::clone(&coordinator));

    // Quit or EOF on the foreground path; the presence surface may already
    // have won the race, in which case this is a no-op.
    coordinator.request_exit();
    if let Some(link) = simulated_link {
        info!(
            "Simulated peer received {} byte(s): {:?}",
            link.written().len(),
            String::from_utf8_lossy(&link.written())
        );
    }
    info!("Goodbye");
    ExitCode::SUCCESS
}

type Backend = (
    Box<dyn DiscoveryMedium>,
    Box<dyn Connector>,
    Option<SimulatedLink>,
);

fn select_backend(simulate: bool, settings: &Settings) -> anyhow::Result<Backend> {
    if simulate {
        info!("Using the simulated medium");
        let medium = SimulatedMedium::single_peer("AA:BB:CC:DD:EE:01", &settings.device_name);
        let link = medium.link();
        return Ok((Box::new(medium.clone()), Box::new(medium), Some(link)));
    }

    #[cfg(windows)]
    {
        use crate::infrastructure::bluetooth::rfcomm::RfcommMedium;
        Ok((Box::new(RfcommMedium), Box::new(RfcommMedium), None))
    }
    #[cfg(not(windows))]
    {
        anyhow::bail!("no native Bluetooth backend on this platform; run with --simulate")
    }
}

fn run_control_client(settings: &Settings, command: Option<&str>) -> ExitCode {
    let command = match command {
        Some("show") => ControlCommand::Show,
        Some("hide") => ControlCommand::Hide,
        Some("exit") => ControlCommand::Exit,
        Some("ping") => ControlCommand::Ping,
        _ => {
            eprintln!("Usage: motor_controller_rust --ctl <show|hide|exit|ping>");
            return ExitCode::FAILURE;
        }
    };

    match presence::send_control_command(&settings.control_socket_name, command) {
        Ok(response) => {
            println!("{:?}", response);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Control command failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
