//! `sidekick-peer`: a demo implementation of the downstream jitter-buffer
//! contract (§4.6), sufficient to drive an end-to-end test of the proxy +
//! sender without real WebRTC/audio plumbing. Grounded in
//! `thearossman-sidekick`'s `webrtc_server.rs` (single receive loop,
//! buffer + NACK cadence + latency statistics) and
//! `examples/original_source/src/webrtc_server.cc`.

mod jitter_buffer;
mod statistics;

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use clap::Parser;

use jitter_buffer::DemoJitterBuffer;
use sidekick_net::{Aead, ChaChaAead, JitterBuffer as _, FIXED_DEMO_KEY};
use statistics::Statistics;

/// Downstream peer: buffers out-of-order data packets, NACKs gaps, and
/// reports per-seqno de-jitter latency on exit.
#[derive(Parser)]
#[command(name = "sidekick-peer")]
struct Cli {
    /// Port to listen for data packets on.
    #[arg(long)]
    listen_port: u16,

    /// Expected end-to-end RTT in ms; also the minimum spacing between
    /// repeated NACKs for the same seqno.
    #[arg(long, default_value_t = 100)]
    rtt_ms: u64,

    /// How often to re-check the missing-seqno list for overdue NACKs, in
    /// ms. Independent of the sender's own send cadence; small relative to
    /// `rtt_ms` so NACKs go out promptly after the RTT elapses.
    #[arg(long, default_value_t = 20)]
    send_period_ms: u64,

    /// How long to listen for before reporting statistics and exiting.
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    let cli = Cli::parse();

    let socket = UdpSocket::bind(("0.0.0.0", cli.listen_port))?;
    socket.set_read_timeout(Some(Duration::from_millis(cli.send_period_ms.max(1))))?;

    let aead = ChaChaAead::new(&FIXED_DEMO_KEY);
    let mut jitter = DemoJitterBuffer::new();
    let mut stats = Statistics::new();
    let mut client_addr: Option<SocketAddr> = None;

    let rtt = Duration::from_millis(cli.rtt_ms);
    let deadline = Instant::now() + Duration::from_secs(cli.duration_secs);
    let mut buf = vec![0u8; 2048];

    log::info!("sidekick-peer listening on port {}", cli.listen_port);
    while Instant::now() < deadline {
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                client_addr = Some(from);
                handle_data_packet(&aead, &buf[..len], &mut jitter, &mut stats);
            }
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {}
            Err(e) => {
                log::error!("listen socket closed: {e}");
                break;
            }
        }

        if let Some(addr) = client_addr {
            send_overdue_nacks(&socket, &aead, &mut jitter, addr, rtt)?;
        }
    }

    stats.log_summary();
    stats.write_csv("jitter_buffer_stats.csv")?;
    log::info!("wrote jitter_buffer_stats.csv ({} rows)", stats.len());
    Ok(())
}

/// Opens a data datagram, pushes its payload into the jitter buffer, and
/// drains whatever became playable into `stats`.
fn handle_data_packet(
    aead: &ChaChaAead,
    sealed: &[u8],
    jitter: &mut DemoJitterBuffer,
    stats: &mut Statistics,
) {
    let Some(plaintext) = aead.open(sealed) else {
        log::warn!("dropping data packet: AEAD open failed");
        return;
    };
    if plaintext.len() < 4 {
        log::warn!("dropping data packet: too short for a seqno header");
        return;
    }
    let seqno = u32::from_be_bytes(plaintext[0..4].try_into().unwrap());
    let data = plaintext[4..].to_vec();
    jitter.push(seqno, data);
    while jitter.has_playable() {
        let (played_seqno, _payload, latency) = jitter.pop_with_latency();
        stats.record(played_seqno, latency);
    }
}

/// NACKs every missing seqno that has never been NACKed, or was last
/// NACKed more than an RTT ago (§4.6).
fn send_overdue_nacks(
    socket: &UdpSocket,
    aead: &ChaChaAead,
    jitter: &mut DemoJitterBuffer,
    client_addr: SocketAddr,
    rtt: Duration,
) -> anyhow::Result<()> {
    let now = Instant::now();
    let missing = jitter.missing_seqnos();
    for (seqno, last_nack) in missing {
        let overdue = match last_nack {
            None => true,
            Some(t) => now.duration_since(t) > rtt,
        };
        if !overdue {
            continue;
        }
        let sealed = aead.seal(seqno.to_string().as_bytes());
        if let Err(e) = socket.send_to(&sealed, client_addr) {
            log::error!("failed to send NACK for seqno {seqno}: {e}");
            continue;
        }
        log::debug!("sent NACK for seqno {seqno}");
        jitter.record_nack_sent(seqno, now);
    }
    Ok(())
}
