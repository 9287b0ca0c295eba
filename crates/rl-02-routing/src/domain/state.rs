//! Peer lifecycle.

use std::fmt;

/// Lifecycle state of a peer. Ordered: sends are suppressed from `Exit` on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PeerState {
    #[default]
    Init,
    Joining,
    Joined,
    Exit,
}

impl PeerState {
    /// Whether outgoing traffic is still allowed.
    #[must_use]
    pub fn can_send(self) -> bool {
        self < Self::Exit
    }
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Joining => "joining",
            Self::Joined => "joined",
            Self::Exit => "exit",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_exit_blocks_sends() {
        assert!(PeerState::Init.can_send());
        assert!(PeerState::Joined.can_send());
        assert!(!PeerState::Exit.can_send());
        assert!(PeerState::Joining < PeerState::Exit);
    }
}
