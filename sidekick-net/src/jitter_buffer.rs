//! The downstream jitter buffer contract (§4.6). The playback peer uses an
//! implementation of this trait to decide when to NACK; the concrete
//! implementation lives on the peer (`sidekick-peer`), grounded in
//! `thearossman-sidekick`'s `BufferedPackets` and
//! `examples/original_source/util/jitter_buffer.hh`.

use std::collections::HashMap;
use std::time::Instant;

/// Sequence numbers not yet received, mapped to the time of the last NACK
/// sent for them. `None` means "never NACKed".
pub type MissingSeqnos = HashMap<u32, Option<Instant>>;

pub trait JitterBuffer {
    /// Inserts `bytes` received for `seqno`: updates missing-seqno
    /// bookkeeping and makes playable any newly-contiguous prefix.
    fn push(&mut self, seqno: u32, bytes: Vec<u8>);

    /// Blocks for the next in-order payload.
    fn pop(&mut self) -> Vec<u8>;

    /// Seqnos the buffer is still waiting on, and when each was last
    /// NACKed.
    fn missing_seqnos(&self) -> MissingSeqnos;
}
