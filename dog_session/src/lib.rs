//! # dog_session
//!
//! Everything the teleop loop knows about the robot on the other end.
//!
//! * [`RobotSession`] / [`SessionConnector`] — the seam a vendor SDK binding
//!   implements.
//! * [`SessionGuard`] — owns an entered session; resets posture, zeroes
//!   velocity and leaves on every exit path.
//! * [`SimDog`] — in-process backend with a write journal.
//!
//! ```rust
//! use dog_session::{SessionConnector, SessionGuard, SimConnector, UserMode, RobotSession};
//! use teleop_core::{Posture, VelocityCommand};
//!
//! let connector = SimConnector::new();
//! let handle = connector.handle();
//! {
//!     let mut guard = SessionGuard::new(connector.enter("sim").unwrap(), Posture::default());
//!     guard.session_mut().set_user_mode(UserMode::Normal).unwrap();
//!     guard.session_mut().write_velocity(VelocityCommand::new(0.5, 0.0, 0.0)).unwrap();
//! }
//! assert!(handle.velocity().is_zero());
//! assert!(!handle.is_open());
//! ```

pub mod guard;
pub mod session;
pub mod sim;

pub use guard::SessionGuard;
pub use session::{RobotSession, SessionConnector, SessionError, UserMode};
pub use sim::{SessionWrite, SimConnector, SimDog, SimHandle, SimState};
