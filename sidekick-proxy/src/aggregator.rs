//! Per-source quACK aggregation (§4.3). Named `SidekickSender` after the
//! role the original C++ prototype gives this component in
//! `examples/original_source/src/sidekick_proxy.cc` — it "sends quACKs",
//! even though in this direction of the protocol the proxy is the quACK
//! producer, not the data sender.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

use quack::wire;
use quack::{PowerSumQuackU32, Quack};
use sidekick_net::{Conqueue, Ipv4Datagram, PacketSource, IPPROTO_UDP};

/// Destination port for quACK datagrams (§6).
pub const QUACK_LISTEN_PORT: u16 = 8765;

struct SourceState {
    quack: PowerSumQuackU32,
}

impl SourceState {
    fn new(threshold: usize) -> Self {
        Self {
            quack: PowerSumQuackU32::new(threshold),
        }
    }
}

/// Aggregates observed packet ids per source IPv4 address and emits a
/// quACK every `interval` qualifying packets for that source.
pub struct SidekickSender {
    threshold: usize,
    interval: u32,
    sources: HashMap<Ipv4Addr, SourceState>,
    socket: UdpSocket,
}

impl SidekickSender {
    pub fn new(socket: UdpSocket, threshold: usize, interval: u32) -> Self {
        assert!(interval > 0, "quacking interval must be positive");
        Self {
            threshold,
            interval,
            sources: HashMap::new(),
            socket,
        }
    }

    /// Runs the aggregator loop to completion, pulling datagrams off
    /// `source` until it is exhausted. Used directly in tests with
    /// [`MockSource`](sidekick_net::MockSource); the live binary instead
    /// runs capture and aggregation on separate threads (see
    /// [`run_from_queue`](Self::run_from_queue)), per §5's thread model.
    pub fn run(&mut self, mut source: impl PacketSource) {
        while let Some(datagram) = source.recv() {
            self.handle_datagram(&datagram);
        }
    }

    /// Runs the aggregator loop against a [`Conqueue`] fed by a separate
    /// capture thread (§5: "proxy: packet-capture thread (blocks in the
    /// capture call) and aggregator thread (blocks on the datagram FIFO)").
    /// Never returns; the capture thread is the one that observes
    /// end-of-stream.
    pub fn run_from_queue(&mut self, queue: &Conqueue<Ipv4Datagram>) -> ! {
        loop {
            let datagram = queue.pop();
            self.handle_datagram(&datagram);
        }
    }

    /// Per-datagram procedure (§4.3): drop non-UDP traffic and payloads too
    /// short to carry a packet id, otherwise fold the id into this source's
    /// running power sums and emit a quACK every `interval` packets.
    pub fn handle_datagram(&mut self, datagram: &Ipv4Datagram) {
        if datagram.header.proto != IPPROTO_UDP {
            log::trace!("dropping non-UDP datagram from {}", datagram.header.src);
            return;
        }
        let Some(id) = wire::extract_packet_id(&datagram.payload) else {
            log::trace!(
                "dropping UDP datagram from {} too short for a packet id",
                datagram.header.src
            );
            return;
        };

        let threshold = self.threshold;
        let state = self
            .sources
            .entry(datagram.header.src)
            .or_insert_with(|| SourceState::new(threshold));
        state.quack.insert(id);

        if state.quack.count() % self.interval == 0 {
            self.emit(datagram.header.src, &state.quack);
        }
    }

    fn emit(&self, src: Ipv4Addr, quack: &PowerSumQuackU32) {
        let mut buf = vec![0u8; wire::wire_len(quack.threshold())];
        let len = wire::serialize(quack, &mut buf);
        let dest = SocketAddrV4::new(src, QUACK_LISTEN_PORT);
        if let Err(e) = self.socket.send_to(&buf[..len], dest) {
            log::error!("failed to send quACK to {dest}: {e}");
        }
    }
}
