//! `sidekick-sender`: the data sender in a Sidekick deployment. Owns the
//! append-only identifier log and decode/retransmit logic (spec §4.4, §5)
//! behind four long-lived threads, mirroring the thread layout the spec
//! pins: a producer that feeds the outbound buffer, a transmit thread that
//! paces sends, a NACK-receive thread, and a quACK-receive thread.
//!
//! Grounded in the teacher's `accumulator`/`verifier` binaries for the
//! CLI/logging idiom, and in
//! `examples/original_source/src/webrtc_client.cc` for the thread split
//! (`send_thread` / `nack_thread`) and the audio-buffer producer.

use std::fs::File;
use std::io::Read;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use quack::wire;
use sidekick_net::{Aead, ChaChaAead, FIXED_DEMO_KEY};
use sidekick_sender::{BoundedQueue, Decoder, SenderState};

/// Sender-side quACK decoder and retransmitter.
#[derive(Parser)]
#[command(name = "sidekick-sender")]
struct Cli {
    /// IP address of the downstream peer that plays back the stream.
    #[arg(long)]
    server_ip: IpAddr,

    /// Port the downstream peer listens for data on.
    #[arg(long)]
    server_port: u16,

    /// Local port used to send data and receive NACKs.
    #[arg(long, default_value_t = 0)]
    client_port: u16,

    /// Local port used to receive quACKs from the proxy.
    #[arg(long, default_value_t = 8765)]
    quack_port: u16,

    /// Raw PCM audio file to stream. Cycled to fill `duration_secs` if
    /// shorter, zero-padded sample by sample if it doesn't divide evenly.
    /// Silence (all-zero samples) is sent if omitted.
    #[arg(long)]
    audio_file: Option<PathBuf>,

    /// Pacing period between sends, in milliseconds.
    #[arg(long, default_value_t = 20)]
    send_period_ms: u64,

    /// How long to stream for, in seconds.
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,

    /// Number of application-data bytes per packet.
    #[arg(long, default_value_t = 160)]
    sample_bytes: usize,

    /// Maximum number of losses the decoder can recover per quACK window
    /// (k). Must match the proxy's `--threshold`.
    #[arg(short = 'k', long, default_value_t = 8)]
    threshold: usize,
}

/// Reads `audio_file` (if any) and splits it into `sample_bytes`-sized
/// samples, cycling and zero-padding to produce exactly `count` of them.
/// Mirrors `sidekick-router`'s `write_data` padding and
/// `examples/original_source/util/audio_buffer.hh`'s `load_samples`.
fn build_samples(audio_file: &Option<PathBuf>, sample_bytes: usize, count: usize) -> Vec<Vec<u8>> {
    let source: Vec<u8> = match audio_file {
        Some(path) => {
            let mut bytes = Vec::new();
            File::open(path)
                .and_then(|mut f| f.read_to_end(&mut bytes))
                .unwrap_or_else(|e| {
                    log::error!("failed to read audio file {path:?}: {e}");
                    std::process::exit(1);
                });
            bytes
        }
        None => Vec::new(),
    };

    if source.is_empty() {
        return (0..count).map(|_| vec![0u8; sample_bytes]).collect();
    }

    let mut samples = Vec::with_capacity(count);
    let mut offset = 0;
    for _ in 0..count {
        let mut sample = vec![0u8; sample_bytes];
        let mut filled = 0;
        while filled < sample_bytes {
            if offset >= source.len() {
                offset = 0;
            }
            let take = (sample_bytes - filled).min(source.len() - offset);
            sample[filled..filled + take].copy_from_slice(&source[offset..offset + take]);
            filled += take;
            offset += take;
        }
        samples.push(sample);
    }
    samples
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    let cli = Cli::parse();

    let data_socket = UdpSocket::bind(("0.0.0.0", cli.client_port))?;
    let quack_socket = UdpSocket::bind(("0.0.0.0", cli.quack_port))?;
    let server_addr = SocketAddr::new(cli.server_ip, cli.server_port);

    let aead: Arc<dyn Aead> = Arc::new(ChaChaAead::new(&FIXED_DEMO_KEY));
    let state = Arc::new(SenderState::new());
    let outbound: Arc<BoundedQueue<Vec<u8>>> = Arc::new(BoundedQueue::new(64));

    let num_packets = ((cli.duration_secs * 1000) / cli.send_period_ms.max(1)) as usize;
    let samples = build_samples(&cli.audio_file, cli.sample_bytes, num_packets);

    let producer_queue = outbound.clone();
    let producer = thread::spawn(move || {
        for sample in samples {
            producer_queue.push(sample);
        }
    });

    let transmit_state = state.clone();
    let transmit_aead = aead.clone();
    let transmit_socket = data_socket.try_clone()?;
    let transmit_period = Duration::from_millis(cli.send_period_ms);
    let transmit = thread::spawn(move || {
        for _ in 0..num_packets {
            let sample = outbound.pop();
            let seqno = transmit_state.reserve_seqno();
            let mut plaintext = Vec::with_capacity(4 + sample.len());
            plaintext.extend_from_slice(&seqno.to_be_bytes());
            plaintext.extend_from_slice(&sample);
            let sealed = transmit_aead.seal(&plaintext);

            let Some(id) = wire::extract_packet_id(&sealed) else {
                log::error!("sealed payload too short to carry a packet id; dropping send");
                continue;
            };
            transmit_state.record_transmission_at(seqno, id, sealed.clone());
            if let Err(e) = transmit_socket.send_to(&sealed, server_addr) {
                log::error!("transient send error to {server_addr}: {e}");
            }
            thread::sleep(transmit_period);
        }
    });

    let nack_state = state.clone();
    let nack_aead = aead.clone();
    let nack_socket = data_socket.try_clone()?;
    let nack_send_socket = data_socket.try_clone()?;
    let decode_send_socket = data_socket;
    thread::spawn(move || {
        let mut buf = vec![0u8; 2048];
        loop {
            let (len, from) = match nack_socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(e) => {
                    log::error!("NACK socket closed: {e}");
                    return;
                }
            };
            let Some(plaintext) = nack_aead.open(&buf[..len]) else {
                log::warn!("dropping NACK from {from}: AEAD open failed");
                continue;
            };
            let Ok(digits) = std::str::from_utf8(&plaintext) else {
                log::warn!("dropping NACK from {from}: not valid UTF-8");
                continue;
            };
            let Ok(seqno) = digits.parse::<u32>() else {
                log::warn!("dropping NACK from {from}: {digits:?} is not a seqno");
                continue;
            };
            match nack_state.retransmit_by_seqno(seqno) {
                Some(payload) => {
                    log::debug!("retransmitting seqno {seqno} on NACK from {from}");
                    if let Err(e) = nack_send_socket.send_to(&payload, server_addr) {
                        log::error!("transient send error to {server_addr}: {e}");
                    }
                }
                None => log::warn!("NACK for unknown seqno {seqno} from {from}"),
            }
        }
    });

    let decode_state = state.clone();
    let threshold = cli.threshold;
    thread::spawn(move || {
        let mut decoder = Decoder::new(threshold);
        let mut buf = vec![0u8; 2048];
        loop {
            let (len, from) = match quack_socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(e) => {
                    log::error!("quACK socket closed: {e}");
                    return;
                }
            };
            let received = match wire::deserialize(&buf[..len]) {
                Ok(q) => q,
                Err(e) => {
                    log::warn!("dropping unparseable quACK from {from}: {e}");
                    continue;
                }
            };
            let lost = decoder.decode_and_retransmit(&decode_state, &received);
            for (id, payload) in lost {
                log::info!("quACK from {from} decoded loss: packet id {id}");
                if let Err(e) = decode_send_socket.send_to(&payload, server_addr) {
                    log::error!("transient send error to {server_addr}: {e}");
                }
            }
        }
    });

    log::info!(
        "sidekick-sender streaming {num_packets} packets to {server_addr} (k={}, period={}ms)",
        cli.threshold,
        cli.send_period_ms,
    );
    producer.join().expect("producer thread panicked");
    transmit.join().expect("transmit thread panicked");
    Ok(())
}
