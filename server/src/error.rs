//! Errors surfaced synchronously to callers of the match API.

use shared::{MAX_DATAGRAM_SIZE, MAX_PLAYERS};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("invalid grid size {height}x{width}: sides must be between 1 and {max}")]
    InvalidDimensions { height: u32, width: u32, max: u32 },

    #[error("a {height}x{width} grid has no room for {required} separate starting positions")]
    GridTooSmall {
        height: u32,
        width: u32,
        required: usize,
    },

    #[error("frames of a {height}x{width} match can reach {size} bytes, over the {} byte datagram limit", MAX_DATAGRAM_SIZE)]
    FrameTooLarge { height: u32, width: u32, size: u64 },

    #[error("a match needs at least one player")]
    NoPlayers,

    #[error("cannot add more than {} players", MAX_PLAYERS)]
    MaxPlayers,

    #[error("game is already in progress")]
    InProgress,

    #[error("no free starting position left on the grid")]
    NoFreeSlot,

    #[error("match {0} not found")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            MatchError::MaxPlayers.to_string(),
            "cannot add more than 4 players"
        );
        assert_eq!(
            MatchError::InProgress.to_string(),
            "game is already in progress"
        );
        assert_eq!(
            MatchError::InvalidDimensions {
                height: 0,
                width: 10,
                max: 256
            }
            .to_string(),
            "invalid grid size 0x10: sides must be between 1 and 256"
        );
        assert_eq!(
            MatchError::GridTooSmall {
                height: 2,
                width: 2,
                required: 4
            }
            .to_string(),
            "a 2x2 grid has no room for 4 separate starting positions"
        );
        assert_eq!(
            MatchError::NotFound("abc".to_string()).to_string(),
            "match abc not found"
        );
    }
}
