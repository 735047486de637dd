//! The communicator trait and the collectives built on point-to-point
//! messages.

use crate::error::{CommError, CommResult};

/// Message tag used to match sends with receives.
pub type Tag = u32;

/// First tag reserved for the provided collectives.
///
/// User messages must use tags below this value.
pub const COLLECTIVE_TAG_BASE: Tag = u32::MAX - 15;

const GATHER_TAG: Tag = COLLECTIVE_TAG_BASE;
const BROADCAST_TAG: Tag = COLLECTIVE_TAG_BASE + 1;
const REDUCE_TAG: Tag = COLLECTIVE_TAG_BASE + 2;
const BARRIER_TAG: Tag = COLLECTIVE_TAG_BASE + 3;

/// Reduction applied by the `all_reduce_*` collectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Sum of all contributions.
    Sum,
    /// Largest contribution.
    Max,
    /// Smallest contribution.
    Min,
}

impl ReduceOp {
    /// Combine two floating point contributions.
    #[must_use]
    pub fn apply_f64(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Sum => a + b,
            Self::Max => a.max(b),
            Self::Min => a.min(b),
        }
    }

    /// Combine two integer contributions. Sums saturate.
    #[must_use]
    pub fn apply_u64(self, a: u64, b: u64) -> u64 {
        match self {
            Self::Sum => a.saturating_add(b),
            Self::Max => a.max(b),
            Self::Min => a.min(b),
        }
    }
}

/// Handle for a non-blocking operation, completed by
/// [`Communicator::wait_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "requests complete only in wait_all"]
pub enum Request {
    /// A send whose payload has already been handed to the transport.
    Sent,
    /// A pending receive.
    Receive {
        /// Sending rank.
        source: usize,
        /// Expected tag.
        tag: Tag,
    },
}

/// Rank-based message passing between `size()` workers.
///
/// Implementors provide point-to-point [`send`](Self::send) and
/// [`recv`](Self::recv) plus [`abort`](Self::abort); every collective has a
/// provided implementation on top of them. Collectives must be called by
/// every rank in the same order. Messages between one pair of ranks are
/// delivered in send order, and a receive for one tag buffers messages with
/// other tags until they are asked for.
pub trait Communicator {
    /// This worker's rank, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks.
    fn size(&self) -> usize;

    /// Send `bytes` to `dest` with `tag`. Buffered; does not wait for the
    /// matching receive.
    ///
    /// # Errors
    ///
    /// Fails on an invalid rank, a disconnected peer, or after an abort.
    fn send(&self, dest: usize, tag: Tag, bytes: Vec<u8>) -> CommResult<()>;

    /// Block until a message with `tag` arrives from `source`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid rank, a disconnected peer, or after an abort.
    fn recv(&self, source: usize, tag: Tag) -> CommResult<Vec<u8>>;

    /// Raise the abort flag; peers blocked in a receive return
    /// [`CommError::Aborted`].
    fn abort(&self);

    /// Start a send.
    ///
    /// # Errors
    ///
    /// As for [`send`](Self::send).
    fn isend(&self, dest: usize, tag: Tag, bytes: Vec<u8>) -> CommResult<Request> {
        self.send(dest, tag, bytes)?;
        Ok(Request::Sent)
    }

    /// Post a receive, completed by [`wait_all`](Self::wait_all).
    ///
    /// # Errors
    ///
    /// Returns [`CommError::InvalidRank`] for a bad source.
    fn irecv(&self, source: usize, tag: Tag) -> CommResult<Request> {
        CommError::check_rank(source, self.size())?;
        Ok(Request::Receive { source, tag })
    }

    /// Complete every request; receives yield `Some(payload)`, sends `None`.
    ///
    /// # Errors
    ///
    /// Returns the first receive error.
    fn wait_all(&self, requests: Vec<Request>) -> CommResult<Vec<Option<Vec<u8>>>> {
        requests
            .into_iter()
            .map(|request| match request {
                Request::Sent => Ok(None),
                Request::Receive { source, tag } => self.recv(source, tag).map(Some),
            })
            .collect()
    }

    /// Every rank's payload, in rank order.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    fn all_gather_bytes(&self, bytes: Vec<u8>) -> CommResult<Vec<Vec<u8>>> {
        exchange(self, GATHER_TAG, bytes)
    }

    /// Payload of `root`, delivered to every rank. Non-root ranks pass
    /// `None`; a root passing `None` broadcasts an empty payload.
    ///
    /// # Errors
    ///
    /// Returns [`CommError::InvalidRank`] for a bad root, or a transport
    /// error.
    fn broadcast_bytes(&self, bytes: Option<Vec<u8>>, root: usize) -> CommResult<Vec<u8>> {
        CommError::check_rank(root, self.size())?;
        if self.rank() != root {
            return self.recv(root, BROADCAST_TAG);
        }
        let payload = bytes.unwrap_or_default();
        for dest in (0..self.size()).filter(|&d| d != root) {
            self.send(dest, BROADCAST_TAG, payload.clone())?;
        }
        Ok(payload)
    }

    /// Reduce one `f64` per rank. Contributions are combined in rank order,
    /// so every rank sees the bit-identical result.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    fn all_reduce_f64(&self, value: f64, op: ReduceOp) -> CommResult<f64> {
        let parts = exchange(self, REDUCE_TAG, value.to_le_bytes().to_vec())?;
        let mut values = parts.iter().map(|p| read_word(p).map(f64::from_le_bytes));
        let first = values.next().unwrap_or(Ok(value))?;
        values.try_fold(first, |acc, v| Ok(op.apply_f64(acc, v?)))
    }

    /// Reduce one `u64` per rank.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    fn all_reduce_u64(&self, value: u64, op: ReduceOp) -> CommResult<u64> {
        let parts = exchange(self, REDUCE_TAG, value.to_le_bytes().to_vec())?;
        let mut values = parts.iter().map(|p| read_word(p).map(u64::from_le_bytes));
        let first = values.next().unwrap_or(Ok(value))?;
        values.try_fold(first, |acc, v| Ok(op.apply_u64(acc, v?)))
    }

    /// Block until every rank has entered the barrier.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    fn barrier(&self) -> CommResult<()> {
        exchange(self, BARRIER_TAG, Vec::new()).map(|_| ())
    }
}

/// All-to-all of one payload per rank, returned in rank order.
fn exchange<C: Communicator + ?Sized>(comm: &C, tag: Tag, bytes: Vec<u8>) -> CommResult<Vec<Vec<u8>>> {
    let (rank, size) = (comm.rank(), comm.size());
    for dest in (0..size).filter(|&d| d != rank) {
        comm.send(dest, tag, bytes.clone())?;
    }
    let mut own = Some(bytes);
    (0..size)
        .map(|source| {
            if source == rank {
                Ok(own.take().unwrap_or_default())
            } else {
                comm.recv(source, tag)
            }
        })
        .collect()
}

fn read_word(bytes: &[u8]) -> CommResult<[u8; 8]> {
    bytes
        .try_into()
        .map_err(|_| CommError::malformed(format!("expected 8 reduction bytes, got {}", bytes.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_ops() {
        assert!((ReduceOp::Sum.apply_f64(1.5, 2.0) - 3.5).abs() < f64::EPSILON);
        assert!((ReduceOp::Max.apply_f64(1.5, 2.0) - 2.0).abs() < f64::EPSILON);
        assert!((ReduceOp::Min.apply_f64(1.5, 2.0) - 1.5).abs() < f64::EPSILON);
        assert_eq!(ReduceOp::Sum.apply_u64(u64::MAX, 1), u64::MAX);
        assert_eq!(ReduceOp::Min.apply_u64(3, 9), 3);
    }

    #[test]
    fn read_word_checks_length() {
        assert!(read_word(&[0; 8]).is_ok());
        assert!(matches!(read_word(&[0; 3]), Err(CommError::Malformed(_))));
    }
}
