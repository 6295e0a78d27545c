//! External-collaborator interfaces for the Sidekick core (spec §4.5, §4.6,
//! §6): parsed-packet capture, the downstream jitter buffer contract, and
//! AEAD-protected data/NACK datagrams.
//!
//! This crate is kept thin on purpose: one real capture backend (`pcap`,
//! matching the teacher's `router` crate) and one real AEAD backend
//! (`chacha20poly1305`'s XChaCha20-Poly1305, which has the same 24-byte
//! nonce as the reference implementation's XSalsa20-Poly1305). The jitter
//! buffer itself has no concrete implementation here — it lives on the
//! downstream peer, implemented in the `sidekick-peer` binary crate.

mod aead;
mod conqueue;
mod datagram;
mod jitter_buffer;
mod packet_source;

pub use aead::{Aead, ChaChaAead, FIXED_DEMO_KEY, NONCE_LEN};
pub use conqueue::Conqueue;
pub use datagram::{parse_ipv4_datagram, Ipv4Datagram, Ipv4Header, ParseError, IPPROTO_UDP};
pub use jitter_buffer::{JitterBuffer, MissingSeqnos};
pub use packet_source::{CaptureError, MockSource, PacketSource, PcapSource};
