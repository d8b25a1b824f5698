//! Background presence surface.
//!
//! Stand-in for the original tray icon: a local-socket control listener that
//! accepts Show / Hide / Exit commands while the foreground loop owns the
//! terminal. A second invocation with `--ctl` acts as the client side.

use crate::coordinator::Coordinator;
use anyhow::{Context, Result};
use interprocess::local_socket::{
    traits::{ListenerExt, Stream as _},
    GenericFilePath, ListenerOptions, Stream as LocalStream, ToFsName,
};
use interprocess::TryClone;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Serialize, Deserialize, Debug)]
pub enum ControlCommand {
    Ping,
    Show,
    Hide,
    Exit,
}

#[derive(Serialize, Deserialize, Debug)]
pub enum ControlResponse {
    Pong,
    Ok,
    Error(String),
}

/// Run the control listener loop. Blocks; intended for the presence worker
/// thread. The loop ends with the process: an `Exit` command tears the
/// connection down via the coordinator and then terminates.
pub fn run_presence_listener(socket_name: &str, coordinator: Arc<Coordinator>) -> Result<()> {
    let name = socket_name.to_fs_name::<GenericFilePath>()?;
    let listener = ListenerOptions::new().name(name).create_sync()?;

    info!("Presence control listening on {}", socket_name);

    for conn in listener.incoming().filter_map(|c| c.ok()) {
        if coordinator.exit_requested() {
            break;
        }
        if let Err(e) = handle_connection(conn, &coordinator) {
            error!("Control connection error: {}", e);
        }
    }

    Ok(())
}

fn handle_connection(mut stream: LocalStream, coordinator: &Coordinator) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut buffer = String::new();

    loop {
        buffer.clear();
        match reader.read_line(&mut buffer) {
            Ok(0) => break, // EOF
            Ok(_) => {
                let Ok(command) = serde_json::from_str::<ControlCommand>(&buffer) else {
                    continue;
                };
                info!("Control command: {:?}", command);

                let exiting = matches!(command, ControlCommand::Exit);
                let response = apply_command(command, coordinator);
                let json = serde_json::to_string(&response)? + "\n";
                stream.write_all(json.as_bytes())?;
                stream.flush()?;

                if exiting {
                    // Connection teardown already ran inside request_exit
                    std::process::exit(0);
                }
            }
            Err(e) => {
                error!("Control read error: {}", e);
                break;
            }
        }
    }
    Ok(())
}

fn apply_command(command: ControlCommand, coordinator: &Coordinator) -> ControlResponse {
    match command {
        ControlCommand::Ping => ControlResponse::Pong,
        ControlCommand::Show => {
            coordinator.request_show();
            ControlResponse::Ok
        }
        ControlCommand::Hide => {
            coordinator.request_hide();
            ControlResponse::Ok
        }
        ControlCommand::Exit => {
            coordinator.request_exit();
            ControlResponse::Ok
        }
    }
}

/// Send one control command to a running instance and await the response
/// (the `--ctl` client mode).
pub fn send_control_command(socket_name: &str, command: ControlCommand) -> Result<ControlResponse> {
    let name = socket_name.to_fs_name::<GenericFilePath>()?;
    let mut stream = LocalStream::connect(name).context("no running controller instance")?;

    let json = serde_json::to_string(&command)? + "\n";
    stream.write_all(json.as_bytes())?;
    stream.flush()?;

    let mut reader = BufReader::new(stream);
    let mut buffer = String::new();
    reader.read_line(&mut buffer)?;

    let response: ControlResponse = serde_json::from_str(&buffer)?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_command_wire_names() {
        assert_eq!(serde_json::to_string(&ControlCommand::Show).unwrap(), "\"Show\"");
        assert_eq!(serde_json::to_string(&ControlCommand::Exit).unwrap(), "\"Exit\"");

        let parsed: ControlCommand = serde_json::from_str("\"Hide\"").unwrap();
        assert!(matches!(parsed, ControlCommand::Hide));
    }
}
