//! In-process world: one OS thread per rank, channels between them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::communicator::{Communicator, Tag};
use crate::error::{CommError, CommResult};

/// How long a blocked receive waits before re-checking the abort flag.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
struct Envelope {
    tag: Tag,
    payload: Vec<u8>,
}

/// Runs a closure on `size` ranks inside the current process.
///
/// # Example
///
/// ```
/// use cf_comm::{Communicator, LocalWorld, ReduceOp};
///
/// let sums = LocalWorld::run(4, |comm| {
///     comm.all_reduce_u64(comm.rank() as u64, ReduceOp::Sum)
/// })
/// .unwrap();
///
/// assert!(sums.iter().all(|s| *s == Ok(6)));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LocalWorld;

impl LocalWorld {
    /// Spawn `size` scoped threads, hand each its [`LocalComm`], and return
    /// the closure results in rank order once all of them finish.
    ///
    /// A rank that panics raises the abort flag and drops its channels, so
    /// peers waiting on it fail instead of hanging.
    ///
    /// # Errors
    ///
    /// Returns [`CommError::EmptyWorld`] for `size == 0` and
    /// [`CommError::WorkerPanicked`] naming the first rank that panicked.
    pub fn run<R, F>(size: usize, f: F) -> CommResult<Vec<R>>
    where
        R: Send,
        F: Fn(LocalComm) -> R + Sync,
    {
        if size == 0 {
            return Err(CommError::EmptyWorld);
        }
        debug!(ranks = size, "Starting local world");

        let aborted = Arc::new(AtomicBool::new(false));
        let comms = connect(size, &aborted);

        let outcomes: Vec<thread::Result<R>> = thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    let f = &f;
                    scope.spawn(move || {
                        let _guard = AbortOnPanic(Arc::clone(&comm.aborted));
                        f(comm)
                    })
                })
                .collect();
            handles.into_iter().map(thread::ScopedJoinHandle::join).collect()
        });

        outcomes
            .into_iter()
            .enumerate()
            .map(|(rank, outcome)| outcome.map_err(|_| CommError::WorkerPanicked { rank }))
            .collect()
    }
}

/// Build one communicator per rank, with a channel for every ordered pair.
fn connect(size: usize, aborted: &Arc<AtomicBool>) -> Vec<LocalComm> {
    let mut outboxes: Vec<Vec<Sender<Envelope>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
    let mut inboxes: Vec<Vec<Receiver<Envelope>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
    for source in 0..size {
        for dest in 0..size {
            let (tx, rx) = mpsc::channel();
            outboxes[source].push(tx);
            inboxes[dest].push(rx);
        }
    }
    outboxes
        .into_iter()
        .zip(inboxes)
        .enumerate()
        .map(|(rank, (outboxes, inboxes))| LocalComm {
            rank,
            size,
            outboxes,
            inboxes,
            pending: RefCell::new((0..size).map(|_| VecDeque::new()).collect()),
            aborted: Arc::clone(aborted),
        })
        .collect()
}

struct AbortOnPanic(Arc<AtomicBool>);

impl Drop for AbortOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::SeqCst);
        }
    }
}

/// One rank's endpoint in a [`LocalWorld`].
///
/// Owned by its rank's thread; not shared.
#[derive(Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    /// Indexed by destination rank.
    outboxes: Vec<Sender<Envelope>>,
    /// Indexed by source rank.
    inboxes: Vec<Receiver<Envelope>>,
    /// Messages already received whose tag nobody asked for yet.
    pending: RefCell<Vec<VecDeque<Envelope>>>,
    aborted: Arc<AtomicBool>,
}

impl LocalComm {
    /// A single-rank communicator; every collective is the identity.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_comm::{Communicator, LocalComm, all_gather};
    ///
    /// let comm = LocalComm::solo();
    /// assert_eq!(comm.size(), 1);
    /// assert_eq!(all_gather(&comm, &[1_u32, 2]).unwrap(), vec![1, 2]);
    /// ```
    #[must_use]
    pub fn solo() -> Self {
        let aborted = Arc::new(AtomicBool::new(false));
        let mut comms = connect(1, &aborted);
        comms.remove(0)
    }

    /// True once any rank of this world has aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn take_pending(&self, source: usize, tag: Tag) -> Option<Vec<u8>> {
        let mut pending = self.pending.borrow_mut();
        let queue = &mut pending[source];
        let position = queue.iter().position(|e| e.tag == tag)?;
        queue.remove(position).map(|e| e.payload)
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: usize, tag: Tag, bytes: Vec<u8>) -> CommResult<()> {
        CommError::check_rank(dest, self.size)?;
        if self.is_aborted() {
            return Err(CommError::Aborted);
        }
        self.outboxes[dest]
            .send(Envelope { tag, payload: bytes })
            .map_err(|_| CommError::Disconnected { peer: dest })
    }

    fn recv(&self, source: usize, tag: Tag) -> CommResult<Vec<u8>> {
        CommError::check_rank(source, self.size)?;
        if let Some(payload) = self.take_pending(source, tag) {
            return Ok(payload);
        }
        loop {
            if self.is_aborted() {
                return Err(CommError::Aborted);
            }
            match self.inboxes[source].recv_timeout(POLL_INTERVAL) {
                Ok(envelope) if envelope.tag == tag => return Ok(envelope.payload),
                Ok(envelope) => self.pending.borrow_mut()[source].push_back(envelope),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CommError::Disconnected { peer: source });
                }
            }
        }
    }

    fn abort(&self) {
        if !self.aborted.swap(true, Ordering::SeqCst) {
            warn!(rank = self.rank, "Rank aborted the world");
        }
    }
}
