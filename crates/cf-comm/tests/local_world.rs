//! Collectives and failure handling of the in-process world.
//!
//! Run with: cargo test -p cf-comm --test local_world

use cf_comm::{
    CommError, Communicator, LocalWorld, ReduceOp, Request, all_gather, all_gather_value,
    broadcast, broadcast_value,
};
use proptest::prelude::*;

// =============================================================================
// Collectives
// =============================================================================

#[test]
fn gather_is_in_rank_order() {
    let results = LocalWorld::run(4, |comm| {
        let rank = comm.rank() as i64;
        all_gather(&comm, &[rank * 10, rank * 10 + 1])
    })
    .unwrap();
    for result in results {
        assert_eq!(result.unwrap(), vec![0, 1, 10, 11, 20, 21, 30, 31]);
    }
}

#[test]
fn gather_handles_empty_contributions() {
    let results = LocalWorld::run(3, |comm| {
        let mine: Vec<f64> = if comm.rank() == 1 { vec![2.5] } else { Vec::new() };
        all_gather(&comm, &mine)
    })
    .unwrap();
    for result in results {
        assert_eq!(result.unwrap(), vec![2.5]);
    }
}

#[test]
fn gather_value_one_per_rank() {
    let results = LocalWorld::run(5, |comm| all_gather_value(&comm, comm.rank() as u64 * 3)).unwrap();
    for result in results {
        assert_eq!(result.unwrap(), vec![0, 3, 6, 9, 12]);
    }
}

#[test]
fn broadcast_from_any_root() {
    let results = LocalWorld::run(3, |comm| {
        let values = [comm.rank() as u32 + 100, 7];
        broadcast(&comm, &values, 2)
    })
    .unwrap();
    for result in results {
        assert_eq!(result.unwrap(), vec![102, 7]);
    }

    let results = LocalWorld::run(3, |comm| broadcast_value(&comm, comm.rank() as i32 - 5, 0)).unwrap();
    for result in results {
        assert_eq!(result.unwrap(), -5);
    }
}

#[test]
fn broadcast_rejects_bad_root() {
    let results = LocalWorld::run(2, |comm| comm.broadcast_bytes(None, 9)).unwrap();
    for result in results {
        assert_eq!(result, Err(CommError::InvalidRank { rank: 9, size: 2 }));
    }
}

#[test]
fn reductions_agree_on_every_rank() {
    let results = LocalWorld::run(4, |comm| {
        let x = comm.rank() as f64 + 0.5;
        (
            comm.all_reduce_f64(x, ReduceOp::Sum),
            comm.all_reduce_f64(x, ReduceOp::Max),
            comm.all_reduce_f64(x, ReduceOp::Min),
            comm.all_reduce_u64(comm.rank() as u64, ReduceOp::Max),
        )
    })
    .unwrap();
    for (sum, max, min, umax) in results {
        assert!((sum.unwrap() - 8.0).abs() < 1e-12);
        assert!((max.unwrap() - 3.5).abs() < 1e-12);
        assert!((min.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(umax.unwrap(), 3);
    }
}

#[test]
fn barrier_completes() {
    let results = LocalWorld::run(6, |comm| {
        comm.barrier()?;
        comm.barrier()
    })
    .unwrap();
    assert!(results.iter().all(Result::is_ok));
}

// =============================================================================
// Point-to-point
// =============================================================================

#[test]
fn ring_exchange_with_requests() {
    let results = LocalWorld::run(4, |comm| -> Result<Vec<u8>, CommError> {
        let size = comm.size();
        let next = (comm.rank() + 1) % size;
        let prev = (comm.rank() + size - 1) % size;
        let requests = vec![
            comm.irecv(prev, 5)?,
            comm.isend(next, 5, vec![comm.rank() as u8])?,
        ];
        let mut done = comm.wait_all(requests)?;
        assert_eq!(done[1], None);
        Ok(done.remove(0).unwrap_or_default())
    })
    .unwrap();
    for (rank, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), vec![((rank + 3) % 4) as u8]);
    }
}

#[test]
fn tags_are_matched_across_interleaving() {
    let results = LocalWorld::run(2, |comm| -> Result<Vec<Vec<u8>>, CommError> {
        if comm.rank() == 0 {
            comm.send(1, 1, vec![1])?;
            comm.send(1, 2, vec![2])?;
            Ok(Vec::new())
        } else {
            Ok(vec![comm.recv(0, 2)?, comm.recv(0, 1)?])
        }
    })
    .unwrap();
    assert_eq!(results[1].as_ref().unwrap(), &vec![vec![2], vec![1]]);
}

#[test]
fn irecv_validates_source() {
    let results = LocalWorld::run(1, |comm| comm.irecv(3, 0)).unwrap();
    assert_eq!(results[0], Err(CommError::InvalidRank { rank: 3, size: 1 }));
    assert_ne!(Request::Sent, Request::Receive { source: 0, tag: 0 });
}

// =============================================================================
// Failure handling
// =============================================================================

#[test]
fn abort_releases_blocked_peers() {
    let results = LocalWorld::run(3, |comm| {
        if comm.rank() == 0 {
            comm.abort();
            Ok(Vec::new())
        } else {
            // Nobody ever sends this; the abort must wake us up.
            comm.recv(0, 42)
        }
    })
    .unwrap();
    assert!(results[0].is_ok());
    for result in &results[1..] {
        assert!(matches!(
            result,
            Err(CommError::Aborted | CommError::Disconnected { .. })
        ));
    }
}

#[test]
fn panicking_rank_is_reported() {
    let result = LocalWorld::run(2, |comm| {
        if comm.rank() == 1 {
            panic!("rank 1 fails");
        }
        comm.recv(1, 0)
    });
    assert_eq!(result.unwrap_err(), CommError::WorkerPanicked { rank: 1 });
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Gathering arbitrary per-rank vectors concatenates them in rank order.
    #[test]
    fn gather_concatenates(parts in prop::collection::vec(prop::collection::vec(any::<u32>(), 0..20), 1..5)) {
        let expected: Vec<u32> = parts.iter().flatten().copied().collect();
        let results = LocalWorld::run(parts.len(), |comm| all_gather(&comm, &parts[comm.rank()])).unwrap();
        for result in results {
            prop_assert_eq!(result.unwrap(), expected.clone());
        }
    }
}
