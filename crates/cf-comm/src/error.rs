//! Error types for message passing.

/// Errors raised by a [`Communicator`](crate::Communicator).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CommError {
    /// A rank called [`abort`](crate::Communicator::abort).
    #[error("communication aborted")]
    Aborted,

    /// The peer hung up before the expected message arrived.
    #[error("rank {peer} disconnected")]
    Disconnected {
        /// The rank that went away.
        peer: usize,
    },

    /// A rank id outside `0..size`.
    #[error("rank {rank} is out of range for a world of size {size}")]
    InvalidRank {
        /// The offending rank.
        rank: usize,
        /// Number of ranks in the world.
        size: usize,
    },

    /// A world needs at least one rank.
    #[error("a world needs at least one rank")]
    EmptyWorld,

    /// A payload could not be decoded.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A rank's closure panicked.
    #[error("rank {rank} panicked")]
    WorkerPanicked {
        /// The rank whose closure panicked.
        rank: usize,
    },
}

/// Result type for communication operations.
pub type CommResult<T> = Result<T, CommError>;

impl CommError {
    /// Create a malformed-message error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Check a rank against the world size.
    ///
    /// # Errors
    ///
    /// Returns [`CommError::InvalidRank`] if `rank >= size`.
    pub const fn check_rank(rank: usize, size: usize) -> CommResult<()> {
        if rank < size {
            Ok(())
        } else {
            Err(Self::InvalidRank { rank, size })
        }
    }
}
