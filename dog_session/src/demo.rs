//! basic_demo — scripted movement walkthrough against the simulated robot.
//!
//! Height adjustment, a forward/backward speed sweep, then a body tilt.
//! The default posture is restored on every exit path by the session guard.
//!
//! Usage: `basic_demo [HOST] [--fast]`

use std::thread;
use std::time::Duration;

use dog_session::{
    RobotSession, SessionConnector, SessionError, SessionGuard, SimConnector, SimHandle, UserMode,
};
use teleop_core::{Posture, VelocityCommand};
use tracing::{error, info};

const DEFAULT_HOST: &str = "10.10.10.10";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let fast = args.iter().any(|a| a == "--fast");
    let host = args.iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           Quadruped Basic Movement Demo              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let pace = if fast { Duration::from_millis(100) } else { Duration::from_secs(2) };

    if let Err(e) = run(&host, pace) {
        error!("demo aborted: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(host: &str, pace: Duration) -> Result<(), SessionError> {
    let connector = SimConnector::new();
    let handle = connector.handle();
    let mut guard = SessionGuard::new(connector.enter(host)?, Posture::default());
    info!(host, "session entered");

    guard.session_mut().set_user_mode(UserMode::Normal)?;
    demo_basic_movement(guard.session_mut(), &handle, pace)?;

    guard.shutdown()?;
    print_state(&handle, "After reset");
    Ok(())
}

fn demo_basic_movement(
    dog:    &mut impl RobotSession,
    handle: &SimHandle,
    pace:   Duration,
) -> Result<(), SessionError> {
    println!("\n  1. Adjusting height…");
    dog.write_height(0.25)?;
    thread::sleep(pace);
    print_state(handle, "After height adjustment");

    println!("\n  2. Forward / backward sweep…");
    for speed in [0.1_f32, -0.1, 0.0] {
        println!("     forward speed {:+.1} m/s", speed);
        dog.write_velocity(VelocityCommand::new(speed, 0.0, 0.0))?;
        thread::sleep(pace);
    }
    print_state(handle, "After movement test");

    println!("\n  3. Body tilt…");
    let mut posture = Posture { body_height: 0.25, ..Posture::default() };
    posture.roll = 0.2;
    dog.write_posture(&posture)?;
    thread::sleep(pace / 2);
    posture.pitch = 0.2;
    dog.write_posture(&posture)?;
    thread::sleep(pace);
    print_state(handle, "After tilt test");

    Ok(())
}

fn print_state(handle: &SimHandle, title: &str) {
    let st = handle.state();
    println!("\n  ===== {} =====", title);
    println!("  User mode : {}", st.user_mode);
    println!("  Velocity  : {}", st.velocity);
    println!("  Height    : {:.2} m", st.body_height);
    println!("  Posture   : roll={:.2}, pitch={:.2}, yaw={:.2}", st.roll, st.pitch, st.yaw);
}
