//! dog_teleop — interactive entry point.
//!
//! Usage: `dog_teleop [HOST] [--headless]`
//!
//! Tuning constants are compiled in (`TeleopConfig::default`).

use dog_session::SimConnector;
use dog_teleop::{run, AppConfig, TeleopError};
use teleop_core::ConfigError;
use tracing::error;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            Quadruped Keyboard Teleop                 ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let cfg = match parse_args(std::env::args().skip(1)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cfg.headless {
        println!("  Mode: headless scripted tour");
    } else {
        println!("  Mode: keyboard window  (focus the window to drive)");
    }
    println!("  Host: {}", cfg.host);
    println!();

    let host = cfg.host.clone();
    if let Err(e) = run(cfg, &SimConnector::new()) {
        error!("teleop aborted: {}", e);
        eprintln!("Error: {}", e);
        if e.is_connect() {
            eprintln!();
            eprintln!("  Could not reach the robot at {}. Check that:", host);
            eprintln!("    1. the robot is powered on");
            eprintln!("    2. this machine is on the same network as the robot");
            eprintln!("    3. the host address is correct");
        }
        std::process::exit(1);
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<AppConfig, TeleopError> {
    let mut cfg = AppConfig::default();
    for arg in args {
        match arg.as_str() {
            "--headless" => cfg.headless = true,
            _ if arg.starts_with("--") => {
                return Err(ConfigError::Invalid(format!("unknown flag {}", arg)).into());
            }
            host => cfg.host = host.to_string(),
        }
    }
    Ok(cfg)
}
