//! Sarathi daemon - robot-side command server
//!
//! Listens for teleoperation clients on the command port and drives the
//! hardware backend selected in configuration. Camera frames are produced
//! by the video pipeline elsewhere on the robot; this daemon owns the
//! command channel and the robot state.

use parking_lot::Mutex;
use sarathi::command::CommandServer;
use sarathi::config::AppConfig;
use sarathi::error::{Error, Result};
use sarathi::robot::create_robot;
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `sarathi-server <path>` (positional)
/// - `sarathi-server --config <path>` (flag-based)
/// - `sarathi-server -c <path>` (short flag)
///
/// Defaults to `/etc/sarathi.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/sarathi.toml".to_string()
}

fn main() -> Result<()> {
    // A missing config file is fine (defaults apply); a broken one is not
    let config_path = parse_config_path();
    let config = if std::path::Path::new(&config_path).exists() {
        AppConfig::from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Sarathi v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", config_path);

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    // =========================================================================
    // Robot backend
    // =========================================================================
    let mut robot = create_robot(&config.robot)?;
    robot.center_arm()?;
    log::info!("✓ Robot backend ready ({})", config.robot.backend);
    let robot = Arc::new(Mutex::new(robot));

    // =========================================================================
    // Command server
    // =========================================================================
    let bind_addr = config.command_bind_addr();
    let mut server = CommandServer::start(&bind_addr, &config.command, Arc::clone(&robot))?;

    log::info!("Sarathi running. Press Ctrl-C to stop.");

    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }

    // Sessions drain first so no handler is mid-flight when the robot parks
    log::info!("Shutting down...");
    server.stop();
    robot.lock().shutdown()?;

    log::info!("Sarathi stopped");
    Ok(())
}
