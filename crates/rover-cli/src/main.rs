//! `rover-cli` – operator entry point for the rover motion core.
//!
//! This binary:
//!
//! 1. Loads `~/.rover/config.toml` (writing defaults on first run) and
//!    applies `ROVER_*` environment overrides.
//! 2. Assembles the rig: actuator and ranging ports, drive controller,
//!    safety interlock, and the obstacle monitor thread.
//! 3. Drops the operator into a shell where each line is an utterance for
//!    the command dispatcher.
//! 4. Intercepts **Ctrl-C** to stop the motors before exiting.

mod config;
mod repl;
mod rig;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use rover_types::DriveCommand;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG controls the filter (default "info"); ROVER_LOG_FORMAT=json
    // switches to newline-delimited JSON.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("ROVER_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let mut cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };
    config::apply_env_overrides(&mut cfg);

    // ── Rig ───────────────────────────────────────────────────────────────
    let rig = match rig::assemble(&cfg) {
        Ok(rig) => rig,
        Err(e) => {
            eprintln!("{}: {}", "Startup failed".red().bold(), e);
            std::process::exit(1);
        }
    };
    println!(
        "  Hardware {} · min clearance {} cm · avoidance {}",
        cfg.hardware.to_string().bold(),
        cfg.min_distance_cm,
        if cfg.avoidance_enabled {
            "on".green()
        } else {
            "off".yellow()
        }
    );

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    let drive_for_ctrlc = rig.drive.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping motors …".yellow().bold());
        drive_for_ctrlc.execute(DriveCommand::Stop);
        println!("{}", "  ✓ Motors braked. Exiting.".green());
        shutdown_clone.store(true, Ordering::SeqCst);
        std::process::exit(0);
    }) {
        warn!(
            error = %e,
            "Failed to install Ctrl-C handler; motors will not be braked on Ctrl-C"
        );
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive shell ─────────────────────────────────────────────────
    repl::run(&rig, shutdown);
    rig.drive.execute(DriveCommand::Stop);
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "rover".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Voice-driven motion core");
    println!();
}
