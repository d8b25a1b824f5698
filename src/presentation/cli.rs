//! Foreground interactive surface.
//!
//! Terminal stand-in for the original two-button window. The press/release
//! edge semantics live here: a motion key starts the motor and `s` (or an
//! empty line, the "release") stops it. The core only ever sees stateless
//! `send(Command)` calls.

use crate::coordinator::Coordinator;
use crate::infrastructure::bluetooth::connection::SendError;
use crate::infrastructure::bluetooth::protocol::Command;
use std::io::{self, BufRead};
use std::sync::Arc;

pub fn run_command_loop(coordinator: Arc<Coordinator>) {
    if coordinator.connection().is_open() {
        println!("Connected. Type 'help' for commands.");
    } else {
        println!("Not connected. Type 'help' for commands.");
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if coordinator.exit_requested() {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };

        match line.trim() {
            "f" | "forward" => dispatch(&coordinator, Command::Forward),
            "b" | "backward" => dispatch(&coordinator, Command::Backward),
            "s" | "stop" | "" => dispatch(&coordinator, Command::Stop),
            "show" => {
                coordinator.request_show();
                println!("Surface visible: {}", coordinator.is_visible());
            }
            "hide" => {
                coordinator.request_hide();
                println!("Surface visible: {}", coordinator.is_visible());
            }
            "q" | "quit" | "exit" => {
                coordinator.request_exit();
                break;
            }
            "?" | "help" => print_help(),
            other => println!("Unknown input '{}' (try 'help')", other),
        }

        if coordinator.exit_requested() {
            break;
        }
    }
}

fn dispatch(coordinator: &Coordinator, command: Command) {
    match coordinator.send(command) {
        Ok(()) => println!("Sent: {}", command),
        Err(SendError::NotConnected) => println!("Not connected; '{}' dropped", command),
        Err(SendError::LinkLost(e)) => {
            println!("Lost connection to the motor controller: {}", e);
        }
    }
}

fn print_help() {
    println!("  f | forward    run the motor forward");
    println!("  b | backward   run the motor backward");
    println!("  s | stop       stop the motor (empty line works too)");
    println!("  show / hide    toggle the controller surface");
    println!("  q | quit       close the connection and exit");
}
