//! The packet-source contract (§4.5): a blocking stream of parsed IPv4
//! datagrams, filtered to "ip and udp", with outbound traffic dropped.
//!
//! Grounded in `examples/original_source/src/sidekick_proxy.cc`'s
//! `PacketSniffer` (libpcap, promiscuous, `PCAP_D_IN` direction filter, BPF
//! compile+apply) and the teacher's own use of the `pcap` crate in
//! `examples/ygina-quack/accumulator/src/main.rs` (`Capture::from_device`,
//! `.promisc(true)`, `.timeout(..)`, `.open()`, `.next()`).

use thiserror::Error;

use crate::datagram::{parse_ipv4_datagram, Ipv4Datagram};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open capture device {interface:?}: {reason}")]
    Open { interface: String, reason: String },
    #[error("failed to set capture direction on {interface:?}: {reason}")]
    Direction { interface: String, reason: String },
    #[error("failed to compile or apply BPF filter {filter:?}: {reason}")]
    Filter { filter: String, reason: String },
}

/// A blocking source of parsed IPv4 datagrams. The aggregator thread (§4.3)
/// pops from this in a loop; it makes no assumptions beyond "ip and udp".
pub trait PacketSource {
    /// Blocks for the next parsed datagram. Returns `None` when the source
    /// is permanently exhausted (capture loop ended).
    fn recv(&mut self) -> Option<Ipv4Datagram>;
}

/// Live capture off a network interface using libpcap, promiscuous and
/// inbound-only, with a caller-supplied BPF filter (default `ip and udp`).
pub struct PcapSource {
    capture: pcap::Capture<pcap::Active>,
    interface: String,
}

impl PcapSource {
    pub fn open(interface: &str, filter: &str, timeout_ms: i32) -> Result<Self, CaptureError> {
        let device = pcap::Device::list()
            .map_err(|e| CaptureError::Open {
                interface: interface.to_string(),
                reason: e.to_string(),
            })?
            .into_iter()
            .find(|d| d.name == interface)
            .ok_or_else(|| CaptureError::Open {
                interface: interface.to_string(),
                reason: "no such device".to_string(),
            })?;

        let mut capture = pcap::Capture::from_device(device)
            .map_err(|e| CaptureError::Open {
                interface: interface.to_string(),
                reason: e.to_string(),
            })?
            .promisc(true)
            .timeout(timeout_ms)
            .open()
            .map_err(|e| CaptureError::Open {
                interface: interface.to_string(),
                reason: e.to_string(),
            })?;

        capture
            .direction(pcap::Direction::In)
            .map_err(|e| CaptureError::Direction {
                interface: interface.to_string(),
                reason: e.to_string(),
            })?;

        capture.filter(filter, true).map_err(|e| CaptureError::Filter {
            filter: filter.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            capture,
            interface: interface.to_string(),
        })
    }
}

impl PacketSource for PcapSource {
    fn recv(&mut self) -> Option<Ipv4Datagram> {
        loop {
            match self.capture.next() {
                Ok(packet) => match parse_ipv4_datagram(packet.data) {
                    Ok(datagram) => return Some(datagram),
                    Err(e) => {
                        log::warn!("{}: dropping unparseable frame: {e}", self.interface);
                        continue;
                    }
                },
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(e) => {
                    log::error!("{}: capture loop ended: {e}", self.interface);
                    return None;
                }
            }
        }
    }
}

/// Yields a fixed, pre-built sequence of datagrams. Matches the teacher's
/// `pcap_listen_mock` in `router/src/main.rs` (canned data for test runs
/// without a real capture device).
pub struct MockSource {
    remaining: std::collections::VecDeque<Ipv4Datagram>,
}

impl MockSource {
    pub fn new(datagrams: Vec<Ipv4Datagram>) -> Self {
        Self {
            remaining: datagrams.into(),
        }
    }
}

impl PacketSource for MockSource {
    fn recv(&mut self) -> Option<Ipv4Datagram> {
        self.remaining.pop_front()
    }
}
