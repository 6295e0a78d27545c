//! Concrete implementation of [`sidekick_net::JitterBuffer`] for the demo
//! peer, grounded in `examples/original_source/util/jitter_buffer.hh`
//! (received-packet bookkeeping, missing-seqno map, contiguous-prefix
//! advancement) and `thearossman-sidekick`'s `BufferedPackets` (the
//! `next_seqno` / buffer-of-`Packet` shape, and NACK cadence by elapsed
//! time since `time_nack`).
//!
//! The upstream trait's `pop` is documented to block, which only makes
//! sense if push and pop run on different threads; this demo instead
//! drives everything from one thread (mirroring `webrtc_server.rs`'s
//! single `current_thread` task, which interleaves receive and playback
//! in one loop rather than splitting them across OS threads) and only
//! calls `pop` once `has_playable` confirms there is something to return,
//! so the blocking path is never actually exercised. The per-seqno latency
//! the statistics need isn't expressible through the trait's `Vec<u8>`-only
//! `pop`, so [`pop_with_latency`](DemoJitterBuffer::pop_with_latency) is
//! kept as an inherent method alongside it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use sidekick_net::{JitterBuffer, MissingSeqnos};

struct Received {
    received_at: Instant,
    data: Vec<u8>,
}

struct Inner {
    received: HashMap<u32, Received>,
    missing: HashMap<u32, Option<Instant>>,
    next_seqno: u32,
    next_unplayable_seqno: u32,
    playback: VecDeque<(u32, Vec<u8>, Instant)>,
}

pub struct DemoJitterBuffer {
    inner: Mutex<Inner>,
    not_empty: Condvar,
}

impl Default for DemoJitterBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoJitterBuffer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                received: HashMap::new(),
                missing: HashMap::new(),
                next_seqno: 0,
                next_unplayable_seqno: 0,
                playback: VecDeque::new(),
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Whether a call to [`pop_with_latency`](Self::pop_with_latency) would
    /// return immediately.
    pub fn has_playable(&self) -> bool {
        !self.inner.lock().unwrap().playback.is_empty()
    }

    /// Like the trait's `pop`, but also returns the seqno and how long the
    /// packet sat in the buffer, for the per-seqno latency CSV (§6).
    pub fn pop_with_latency(&mut self) -> (u32, Vec<u8>, Duration) {
        let mut guard = self.inner.lock().unwrap();
        loop {
            if let Some((seqno, data, received_at)) = guard.playback.pop_front() {
                return (seqno, data, received_at.elapsed());
            }
            guard = self.not_empty.wait(guard).unwrap();
        }
    }

    /// Records that a NACK for `seqno` was just sent, so the next cadence
    /// check waits a full RTT before resending. The trait's
    /// `missing_seqnos` only returns an owned snapshot (unlike the
    /// original header's mutable reference), so write-back needs its own
    /// method.
    pub fn record_nack_sent(&mut self, seqno: u32, at: Instant) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(slot) = inner.missing.get_mut(&seqno) {
            *slot = Some(at);
        }
    }
}

impl JitterBuffer for DemoJitterBuffer {
    fn push(&mut self, seqno: u32, bytes: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.received.contains_key(&seqno) {
            log::trace!("duplicate seqno {seqno}, ignoring");
            return;
        }

        while inner.next_seqno <= seqno {
            let gap = inner.next_seqno;
            inner.missing.insert(gap, None);
            inner.next_seqno += 1;
        }

        let received_at = Instant::now();
        inner.received.insert(
            seqno,
            Received {
                received_at,
                data: bytes,
            },
        );
        inner.missing.remove(&seqno);

        let mut became_playable = false;
        while let Some(packet) = inner.received.remove(&inner.next_unplayable_seqno) {
            let played_seqno = inner.next_unplayable_seqno;
            inner
                .playback
                .push_back((played_seqno, packet.data, packet.received_at));
            inner.next_unplayable_seqno += 1;
            became_playable = true;
        }
        if became_playable {
            self.not_empty.notify_one();
        }
    }

    fn pop(&mut self) -> Vec<u8> {
        self.pop_with_latency().1
    }

    fn missing_seqnos(&self) -> MissingSeqnos {
        self.inner.lock().unwrap().missing.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_push_in_order_is_immediately_playable() {
        let mut buf = DemoJitterBuffer::new();
        buf.push(0, vec![1]);
        assert!(buf.has_playable());
        let (seqno, data, _) = buf.pop_with_latency();
        assert_eq!(seqno, 0);
        assert_eq!(data, vec![1]);
        assert!(!buf.has_playable());
    }

    #[test]
    fn test_out_of_order_push_tracks_missing_and_holds_back_playback() {
        let mut buf = DemoJitterBuffer::new();
        buf.push(2, vec![2]);
        assert!(!buf.has_playable(), "seqno 0 and 1 are still missing");
        assert_eq!(buf.missing_seqnos().len(), 2);

        buf.push(0, vec![0]);
        let (seqno, _, _) = buf.pop_with_latency();
        assert_eq!(seqno, 0);
        assert!(!buf.has_playable(), "seqno 1 is still missing");

        buf.push(1, vec![1]);
        let (seqno, _, _) = buf.pop_with_latency();
        assert_eq!(seqno, 1);
        let (seqno, _, _) = buf.pop_with_latency();
        assert_eq!(seqno, 2);
        assert!(buf.missing_seqnos().is_empty());
    }

    #[test]
    fn test_duplicate_push_is_ignored() {
        let mut buf = DemoJitterBuffer::new();
        buf.push(0, vec![1]);
        buf.pop_with_latency();
        buf.push(0, vec![99]);
        assert!(!buf.has_playable());
    }

    #[test]
    fn test_record_nack_sent_updates_missing_timestamp() {
        let mut buf = DemoJitterBuffer::new();
        buf.push(3, vec![0]);
        assert_eq!(buf.missing_seqnos().get(&0), Some(&None));
        let now = Instant::now();
        buf.record_nack_sent(0, now);
        assert!(buf.missing_seqnos().get(&0).unwrap().is_some());
    }
}
