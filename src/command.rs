//! Voice command identifiers
//!
//! The recognizer reports plain integers. Anything outside the known set
//! lands in [`Command::Unknown`] and is ignored by the effectors, so a
//! retrained model with extra phrases cannot trigger motion.

/// Commands the helmet understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Raise the faceplate
    Open,
    /// Alternate lighting effect
    AlternateFeedback,
    /// Lower the faceplate
    Close,
    /// Listed in the model, deliberately unused
    Reserved,
    /// Not in the command table
    Unknown(i32),
}

impl Command {
    /// Whether dispatching this command touches any effector
    pub fn is_actuating(&self) -> bool {
        matches!(self, Command::Open | Command::Close)
    }
}

impl From<i32> for Command {
    fn from(id: i32) -> Self {
        match id {
            0 => Command::Open,
            1 => Command::AlternateFeedback,
            2 => Command::Close,
            3 => Command::Reserved,
            other => Command::Unknown(other),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Open => write!(f, "open"),
            Command::AlternateFeedback => write!(f, "alternate-feedback"),
            Command::Close => write!(f, "close"),
            Command::Reserved => write!(f, "reserved"),
            Command::Unknown(id) => write!(f, "unknown({})", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids() {
        assert_eq!(Command::from(0), Command::Open);
        assert_eq!(Command::from(1), Command::AlternateFeedback);
        assert_eq!(Command::from(2), Command::Close);
        assert_eq!(Command::from(3), Command::Reserved);
    }

    #[test]
    fn test_out_of_range_ids_are_unknown() {
        for id in [-1, 4, 17, i32::MAX, i32::MIN] {
            let command = Command::from(id);
            assert_eq!(command, Command::Unknown(id));
            assert!(!command.is_actuating());
        }
    }

    #[test]
    fn test_only_open_and_close_actuate() {
        assert!(Command::Open.is_actuating());
        assert!(Command::Close.is_actuating());
        assert!(!Command::AlternateFeedback.is_actuating());
        assert!(!Command::Reserved.is_actuating());
    }
}
