//! Big-endian wire encoding for the quACK datagram sent from the proxy to
//! the sender: `num_received` (u32) | `last_received_id` (u32) | k × 4-byte
//! power-sum components (i = 1..k).
//!
//! This replaces the teacher's little-endian raw-pointer layout
//! (`std::ptr::copy_nonoverlapping` over `ModularInteger`'s in-memory
//! representation) with an explicit, safe byte-by-byte codec, since here the
//! wire format is pinned exactly rather than left to match the host's
//! native layout.

use thiserror::Error;

use crate::arithmetic::{ModularArithmetic, ModularInteger};
use crate::power_sum::PowerSumQuackU32;
use crate::Quack;

const HEADER_LEN: usize = 8;
const COMPONENT_LEN: usize = 4;

/// Errors from decoding a malformed or truncated quACK datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("quack datagram too short: got {got} bytes, need at least {HEADER_LEN}")]
    TooShort { got: usize },
    #[error("quack datagram length {len} leaves a partial power-sum component")]
    TrailingBytes { len: usize },
}

/// The number of bytes [`serialize`] will write for a quACK of this
/// threshold.
pub fn wire_len(threshold: usize) -> usize {
    HEADER_LEN + threshold * COMPONENT_LEN
}

/// Serializes a quACK's wire form into `buf`, returning the number of bytes
/// written. `buf` must be at least `wire_len(quack.threshold())` bytes.
pub fn serialize(quack: &PowerSumQuackU32, buf: &mut [u8]) -> usize {
    buf[0..4].copy_from_slice(&quack.count().to_be_bytes());
    buf[4..8].copy_from_slice(&quack.last_value().unwrap_or(0).to_be_bytes());
    for (i, sum) in quack.power_sums_slice().iter().enumerate() {
        let start = HEADER_LEN + i * COMPONENT_LEN;
        buf[start..start + COMPONENT_LEN].copy_from_slice(&sum.value().to_be_bytes());
    }
    wire_len(quack.threshold())
}

/// Deserializes a quACK wire datagram.
///
/// Per §4.2, the embedded threshold `k` is not transmitted explicitly: it is
/// inferred from the buffer length after the two fixed fields are consumed.
pub fn deserialize(buf: &[u8]) -> Result<PowerSumQuackU32, WireError> {
    if buf.len() < HEADER_LEN {
        return Err(WireError::TooShort { got: buf.len() });
    }
    let remainder = buf.len() - HEADER_LEN;
    if remainder % COMPONENT_LEN != 0 {
        return Err(WireError::TrailingBytes { len: buf.len() });
    }
    let count = u32::from_be_bytes(buf[0..4].try_into().unwrap());
    let last_received_id = u32::from_be_bytes(buf[4..8].try_into().unwrap());
    let k = remainder / COMPONENT_LEN;
    let power_sums = (0..k)
        .map(|i| {
            let start = HEADER_LEN + i * COMPONENT_LEN;
            let bytes = buf[start..start + COMPONENT_LEN].try_into().unwrap();
            ModularInteger::new(u32::from_be_bytes(bytes))
        })
        .collect();
    Ok(PowerSumQuackU32::from_wire_parts(
        count,
        last_received_id,
        power_sums,
    ))
}

/// Extracts the opaque packet identifier from a UDP payload, per §4.2: the
/// 4 big-endian bytes at `QUACK_ID_OFFSET`. Returns `None` if the payload is
/// too short to contain an id.
pub const QUACK_ID_OFFSET: usize = 8;

pub fn extract_packet_id(payload: &[u8]) -> Option<u32> {
    let end = QUACK_ID_OFFSET.checked_add(4)?;
    if payload.len() < end {
        return None;
    }
    let bytes = payload[QUACK_ID_OFFSET..end].try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_serialize_deserialize_round_trip() {
        let mut quack = PowerSumQuackU32::new(10);
        quack.insert(1);
        quack.insert(2);
        quack.insert(3);

        let mut buf = [0u8; 1500];
        let len = serialize(&quack, &mut buf);
        assert_eq!(len, wire_len(10));
        assert_eq!(len, 8 + 4 * 10);

        let decoded = deserialize(&buf[..len]).unwrap();
        assert_eq!(decoded.count(), quack.count());
        assert_eq!(decoded.last_value(), quack.last_value());
        assert_eq!(decoded.threshold(), quack.threshold());
        assert_eq!(decoded.to_coeffs(), quack.to_coeffs());
    }

    #[test]
    fn test_deserialize_infers_threshold_from_length() {
        let mut quack = PowerSumQuackU32::new(3);
        quack.insert(7);
        let mut buf = [0u8; 8 + 4 * 3];
        let len = serialize(&quack, &mut buf);
        let decoded = deserialize(&buf[..len]).unwrap();
        assert_eq!(decoded.threshold(), 3);
    }

    #[test]
    fn test_deserialize_rejects_short_buffer() {
        let buf = [0u8; 4];
        assert_eq!(deserialize(&buf), Err(WireError::TooShort { got: 4 }));
    }

    #[test]
    fn test_deserialize_rejects_trailing_bytes() {
        let buf = [0u8; 8 + 4 + 2];
        assert_eq!(
            deserialize(&buf),
            Err(WireError::TrailingBytes { len: buf.len() })
        );
    }

    #[test]
    fn test_extract_packet_id_big_endian_at_offset() {
        let mut payload = vec![0u8; 16];
        payload[8..12].copy_from_slice(&42u32.to_be_bytes());
        assert_eq!(extract_packet_id(&payload), Some(42));
    }

    #[test]
    fn test_extract_packet_id_too_short() {
        let payload = vec![0u8; 10];
        assert_eq!(extract_packet_id(&payload), None);
    }
}
