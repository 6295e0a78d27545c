//! `sidekick-proxy`: an in-network proxy that passively observes
//! forward-direction UDP packets and periodically emits quACK digests to
//! the data sender (spec §4.3). Structured like the teacher's `router`
//! crate: a small `clap`/`env_logger` binary wrapping one capture loop.

mod aggregator;

use std::net::UdpSocket;
use std::sync::Arc;
use std::thread;

use clap::Parser;

use aggregator::SidekickSender;
use sidekick_net::{Conqueue, PacketSource, PcapSource};

/// In-network proxy that aggregates observed packets per source and emits
/// quACK digests back to each source.
#[derive(Parser)]
#[command(name = "sidekick-proxy")]
struct Cli {
    /// Interface to capture on.
    #[arg(short, long, default_value = "eth0")]
    interface: String,

    /// BPF filter applied to the capture.
    #[arg(long, default_value = "ip and udp")]
    filter: String,

    /// Read timeout for the capture, in ms.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: i32,

    /// Number of observed packets between quACK emissions (Q).
    #[arg(short = 'q', long = "quacking-interval", default_value_t = 2)]
    quacking_interval: u32,

    /// Maximum number of losses the sender-side decoder can recover per
    /// window (k).
    #[arg(short = 'k', long, default_value_t = 8)]
    threshold: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    let cli = Cli::parse();

    let mut source = PcapSource::open(&cli.interface, &cli.filter, cli.timeout_ms)?;
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    let mut sender = SidekickSender::new(socket, cli.threshold, cli.quacking_interval);

    log::info!(
        "sidekick-proxy listening on {} (filter {:?}, k={}, Q={})",
        cli.interface,
        cli.filter,
        cli.threshold,
        cli.quacking_interval,
    );

    // §5's two-thread model: a capture thread blocks in the pcap read and
    // hands parsed datagrams to the aggregator thread over a blocking FIFO,
    // so a slow aggregation pass never causes the capture call to stall and
    // drop packets at the NIC.
    let queue = Arc::new(Conqueue::new());
    let capture_queue = queue.clone();
    let capture = thread::spawn(move || {
        while let Some(datagram) = source.recv() {
            capture_queue.push(datagram);
        }
        log::info!("capture thread exiting: source exhausted");
    });

    let aggregator = thread::spawn(move || {
        sender.run_from_queue(&queue);
    });

    capture.join().expect("capture thread panicked");
    aggregator.join().expect("aggregator thread panicked");
    Ok(())
}
