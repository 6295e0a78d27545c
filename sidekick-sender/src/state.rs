//! The sender's shared, mutex-guarded state (spec §4.4, §5, §9):
//! `sent_data`, `packet_ids_to_seqnos`, and `sent_packet_ids` are owned as
//! one aggregate behind a single mutex, since a quACK decode walks the log
//! and then issues retransmits that mutate all three — splitting the lock
//! risks a torn view where an id is in the log but its payload is not yet
//! in the map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use quack::wire;

struct Inner {
    /// seqno -> the encrypted payload bytes as they left the sender.
    sent_data: HashMap<u32, Vec<u8>>,
    /// opaque packet id -> the seqno it was most recently sent under.
    packet_ids_to_seqnos: HashMap<u32, u32>,
    /// Ids in transmission order, including retransmissions re-appended at
    /// the tail. Append-only.
    sent_packet_ids: Vec<u32>,
}

/// Owns the three structures §5 requires to move together under one lock,
/// plus the seqno counter for new transmissions.
pub struct SenderState {
    inner: Mutex<Inner>,
    next_seqno: AtomicU32,
}

impl Default for SenderState {
    fn default() -> Self {
        Self::new()
    }
}

impl SenderState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                sent_data: HashMap::new(),
                packet_ids_to_seqnos: HashMap::new(),
                sent_packet_ids: Vec::new(),
            }),
            next_seqno: AtomicU32::new(0),
        }
    }

    /// Allocates the next seqno without recording anything yet. Exposed
    /// separately from [`record_new_transmission`](Self::record_new_transmission)
    /// because the transmit path (§4.4 step 1) needs the seqno to build the
    /// plaintext (it is encrypted into the payload) before the payload
    /// itself exists to record.
    pub fn reserve_seqno(&self) -> u32 {
        self.next_seqno.fetch_add(1, Ordering::SeqCst)
    }

    /// Transmit path step 2-3 (§4.4): records a brand-new payload under
    /// `seqno` (previously allocated with [`reserve_seqno`](Self::reserve_seqno)).
    /// The caller sends `payload` on the data socket after this returns
    /// (step 4, unlocked).
    pub fn record_transmission_at(&self, seqno: u32, id: u32, payload: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        inner.sent_data.insert(seqno, payload);
        inner.packet_ids_to_seqnos.insert(id, seqno);
        inner.sent_packet_ids.push(id);
    }

    /// Convenience wrapper over [`reserve_seqno`](Self::reserve_seqno) +
    /// [`record_transmission_at`](Self::record_transmission_at) for callers
    /// that don't need the seqno ahead of time.
    pub fn record_new_transmission(&self, id: u32, payload: Vec<u8>) -> u32 {
        let seqno = self.reserve_seqno();
        self.record_transmission_at(seqno, id, payload);
        seqno
    }

    /// NACK path (§4.4): looks up the payload previously sent under
    /// `seqno`, appends its id to the log again, and returns the payload
    /// for the caller to resend. Every transmission — original or
    /// retransmit — appends to the log, which is what makes the sketch
    /// invariant hold.
    pub fn retransmit_by_seqno(&self, seqno: u32) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        let payload = inner.sent_data.get(&seqno)?.clone();
        let id = wire::extract_packet_id(&payload)?;
        inner.sent_packet_ids.push(id);
        Some(payload)
    }

    /// quACK decode path step 4 (§4.4): looks up the payload last sent for
    /// `id`, appends the id to the log again, and returns the payload for
    /// the caller to resend.
    pub fn retransmit_by_id(&self, id: u32) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        let seqno = *inner.packet_ids_to_seqnos.get(&id)?;
        let payload = inner.sent_data.get(&seqno)?.clone();
        inner.sent_packet_ids.push(id);
        Some(payload)
    }

    /// The length of the log at the moment of the call. Used by the quACK
    /// thread to bound its walk without holding the lock across the whole
    /// decode.
    pub fn log_len(&self) -> usize {
        self.inner.lock().unwrap().sent_packet_ids.len()
    }

    /// Copies out `sent_packet_ids[start..end]`.
    pub fn log_slice(&self, start: usize, end: usize) -> Vec<u32> {
        let inner = self.inner.lock().unwrap();
        let end = end.min(inner.sent_packet_ids.len());
        if start >= end {
            return Vec::new();
        }
        inner.sent_packet_ids[start..end].to_vec()
    }

    /// Copies out `sent_packet_ids[start..]` plus reports how many more
    /// entries were appended since. Used by the quACK decode walk, which
    /// needs to both fold new ids into its running sums and know where it
    /// stopped.
    pub fn log_from(&self, start: usize) -> Vec<u32> {
        let inner = self.inner.lock().unwrap();
        if start >= inner.sent_packet_ids.len() {
            return Vec::new();
        }
        inner.sent_packet_ids[start..].to_vec()
    }
}
