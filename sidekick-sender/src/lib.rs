//! Sender-side quACK decoding and retransmission (spec §4.4, §5): the
//! append-only identifier log and locking discipline (`state`), the
//! decode/retransmit procedure (`decode`), and the bounded outbound buffer
//! the transmit thread drains (`queue`).

mod decode;
mod queue;
mod state;

pub use decode::Decoder;
pub use queue::BoundedQueue;
pub use state::SenderState;
