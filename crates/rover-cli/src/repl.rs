//! REPL – the operator shell.
//!
//! Every plain line is treated as a recognised utterance and handed to the
//! command dispatcher, exactly as a speech recogniser would.  Slash-commands
//! inspect or steer the running rig:
//!   /help              – show this list
//!   /status            – drive state, clearance, avoidance, threshold
//!   /threshold <cm>    – change the minimum clearance at runtime
//!   /obstacle <cm>     – (sim only) set the simulated forward distance
//!   /quit | /exit      – stop the robot and exit

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rover_types::DriveCommand;

use crate::rig::Rig;

/// One parsed line of operator input.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellLine {
    Empty,
    Help,
    Status,
    Threshold(f64),
    Obstacle(f64),
    Quit,
    /// A slash-command that could not be parsed.
    Invalid(String),
    /// Anything else: passed to the dispatcher verbatim.
    Utterance(String),
}

pub fn parse_line(line: &str) -> ShellLine {
    let line = line.trim();
    if line.is_empty() {
        return ShellLine::Empty;
    }
    if !line.starts_with('/') {
        return ShellLine::Utterance(line.to_string());
    }

    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or_default();
    let arg = parts.next();
    match (cmd, arg) {
        ("/help", None) => ShellLine::Help,
        ("/status", None) => ShellLine::Status,
        ("/quit" | "/exit", None) => ShellLine::Quit,
        ("/threshold", Some(v)) => parse_cm(v)
            .map_or_else(|| ShellLine::Invalid(line.to_string()), ShellLine::Threshold),
        ("/obstacle", Some(v)) => parse_cm(v)
            .map_or_else(|| ShellLine::Invalid(line.to_string()), ShellLine::Obstacle),
        _ => ShellLine::Invalid(line.to_string()),
    }
}

fn parse_cm(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|cm| cm.is_finite() && *cm >= 0.0)
}

/// Entry point for the interactive shell.
///
/// `shutdown` is polled each iteration; when set the shell exits cleanly.
pub fn run(rig: &Rig, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "rover>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        match parse_line(&line) {
            ShellLine::Empty => {}
            ShellLine::Help => cmd_help(),
            ShellLine::Status => cmd_status(rig),
            ShellLine::Threshold(cm) => {
                rig.min_distance().set(cm);
                println!("  Minimum clearance set to {} cm", format!("{cm:.1}").yellow());
            }
            ShellLine::Obstacle(cm) => match &rig.sim_ranger {
                Some(ranger) => {
                    ranger.set_distance(cm);
                    println!("  Simulated obstacle at {} cm", format!("{cm:.1}").yellow());
                }
                None => println!(
                    "{}",
                    "  /obstacle is only available with hardware = \"sim\"".yellow()
                ),
            },
            ShellLine::Quit => {
                rig.drive.execute(DriveCommand::Stop);
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            ShellLine::Invalid(other) => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
            ShellLine::Utterance(text) => {
                if let Some(cmd) = rig.dispatcher.dispatch(&text) {
                    println!("  {} {}", "▶".green(), cmd.to_string().bold());
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Drive Commands".bold().underline());
    println!("  move forward · move reverse · turn right · turn left");
    println!("  rotate right · rotate left · stop");
    println!("  enable avoidance · disable avoidance");
    println!();
    println!("{}", "Shell Commands".bold().underline());
    println!("  {}          – drive and sensor status", "/status".bold().cyan());
    println!("  {}  – set the minimum clearance", "/threshold <cm>".bold().cyan());
    println!("  {}   – set the simulated distance", "/obstacle <cm>".bold().cyan());
    println!("  {}     – stop and exit", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_status(rig: &Rig) {
    let avoidance = if rig.interlock.is_enabled() {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("{}", "Rover Status".bold().underline());
    println!("  Hardware      : {}", rig.hardware.to_string().bold());
    let actuators = if rig.drive.is_bound() {
        "bound".green()
    } else {
        "not ready".red()
    };
    println!("  Actuators     : {}", actuators);
    println!("  Drive state   : {}", rig.drive.state().to_string().bold());
    println!("  Clearance     : {}", rig.clearance().get().to_string().bold());
    println!("  Avoidance     : {}", avoidance);
    println!("  Min distance  : {:.1} cm", rig.min_distance().get());
    println!("  Forced stops  : {}", rig.interlock.interventions());
}
