use thiserror::Error;

use dog_session::SessionError;
use teleop_core::ConfigError;

/// Everything that can end a teleop run early.
#[derive(Debug, Error)]
pub enum TeleopError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("window error: {0}")]
    Window(String),

    #[error("control loop thread panicked")]
    LoopPanicked,
}

impl TeleopError {
    /// Connection failures get operator guidance in `main`.
    pub fn is_connect(&self) -> bool {
        matches!(self, TeleopError::Session(SessionError::Connect { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_errors_are_recognised() {
        let e: TeleopError = SessionError::Connect {
            host:   "192.168.118.29".into(),
            reason: "timed out".into(),
        }.into();
        assert!(e.is_connect());
        assert!(e.to_string().contains("192.168.118.29"));

        let e: TeleopError = SessionError::Closed.into();
        assert!(!e.is_connect());
        assert!(!TeleopError::Window("no display".into()).is_connect());
    }

    #[test]
    fn config_errors_wrap() {
        let e: TeleopError = ConfigError::Invalid("speed_levels is empty".into()).into();
        assert_eq!(e.to_string(), "Invalid configuration: speed_levels is empty");
    }
}
