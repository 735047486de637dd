//! Typed collectives over plain-old-data records.
//!
//! Records cross rank boundaries as their raw bytes, so the element type
//! must be [`Pod`]: no pointers, no padding, every bit pattern valid.

use bytemuck::Pod;

use crate::communicator::Communicator;
use crate::error::{CommError, CommResult};

/// Raw bytes of a slice of records.
#[must_use]
pub fn encode<T: Pod>(values: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

/// Records from raw bytes. The input need not be aligned.
///
/// # Errors
///
/// Returns [`CommError::Malformed`] if `T` is zero-sized or the length is
/// not a multiple of its size.
///
/// # Example
///
/// ```
/// use cf_comm::{decode, encode};
///
/// let bytes = encode(&[1.5_f64, -2.0]);
/// assert_eq!(decode::<f64>(&bytes).unwrap(), vec![1.5, -2.0]);
/// assert!(decode::<f64>(&bytes[..5]).is_err());
/// ```
pub fn decode<T: Pod>(bytes: &[u8]) -> CommResult<Vec<T>> {
    let size = std::mem::size_of::<T>();
    if size == 0 {
        return Err(CommError::malformed("cannot decode zero-sized records"));
    }
    if bytes.len() % size != 0 {
        return Err(CommError::malformed(format!(
            "{} bytes is not a whole number of {size}-byte records",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(size)
        .map(bytemuck::pod_read_unaligned)
        .collect())
}

/// Concatenation of every rank's records, in rank order.
///
/// # Errors
///
/// Propagates transport and decoding errors.
pub fn all_gather<T: Pod, C: Communicator + ?Sized>(comm: &C, values: &[T]) -> CommResult<Vec<T>> {
    let parts = comm.all_gather_bytes(encode(values))?;
    let mut out = Vec::new();
    for part in &parts {
        out.extend(decode::<T>(part)?);
    }
    Ok(out)
}

/// One record per rank, indexed by rank.
///
/// # Errors
///
/// Propagates transport errors, and fails with [`CommError::Malformed`] if
/// a rank contributed anything other than exactly one record.
pub fn all_gather_value<T: Pod, C: Communicator + ?Sized>(comm: &C, value: T) -> CommResult<Vec<T>> {
    let values = all_gather(comm, std::slice::from_ref(&value))?;
    if values.len() != comm.size() {
        return Err(CommError::malformed(format!(
            "gathered {} values from {} ranks",
            values.len(),
            comm.size()
        )));
    }
    Ok(values)
}

/// `root`'s records delivered to every rank; other ranks' input is ignored.
///
/// # Errors
///
/// Propagates transport and decoding errors.
pub fn broadcast<T: Pod, C: Communicator + ?Sized>(comm: &C, values: &[T], root: usize) -> CommResult<Vec<T>> {
    let payload = (comm.rank() == root).then(|| encode(values));
    decode(&comm.broadcast_bytes(payload, root)?)
}

/// `root`'s single record delivered to every rank.
///
/// # Errors
///
/// Propagates transport errors, and fails with [`CommError::Malformed`] if
/// the root sent anything other than one record.
pub fn broadcast_value<T: Pod, C: Communicator + ?Sized>(comm: &C, value: T, root: usize) -> CommResult<T> {
    match broadcast(comm, std::slice::from_ref(&value), root)?.as_slice() {
        [one] => Ok(*one),
        other => Err(CommError::malformed(format!(
            "expected one broadcast record, got {}",
            other.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    struct Pair {
        id: i64,
        weight: f64,
    }

    #[test]
    fn decode_unaligned_input() {
        let values = [Pair { id: 7, weight: 0.5 }, Pair { id: -1, weight: 2.0 }];
        let mut bytes = vec![0_u8];
        bytes.extend(encode(&values));
        let decoded: Vec<Pair> = decode(&bytes[1..]).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn decode_rejects_partial_record() {
        let bytes = encode(&[Pair { id: 1, weight: 1.0 }]);
        assert!(matches!(decode::<Pair>(&bytes[..15]), Err(CommError::Malformed(_))));
        assert!(decode::<Pair>(&[]).unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_zero_sized() {
        assert!(matches!(decode::<()>(&[]), Err(CommError::Malformed(_))));
    }
}
