//! Packet aggregator subscription.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::Result;
use crate::source::AggregatorSource;
use crate::wire::{AggregatorSample, SubscriptionRule};

/// Buffered samples before the reader applies backpressure.
const SAMPLE_CAPACITY: usize = 8192;

/// Connect to an aggregator, send `rule`, and stream the samples it forwards.
///
/// The returned source reports itself disconnected once the connection
/// closes and every buffered sample has been drained.
pub async fn subscribe<A: ToSocketAddrs>(addr: A, rule: SubscriptionRule) -> Result<AggregatorSource> {
    let mut stream = TcpStream::connect(addr).await?;
    info!("Connected to aggregator at {}", stream.peer_addr()?);

    let line = serde_json::to_string(&rule)? + "\n";
    stream.write_all(line.as_bytes()).await?;

    let (tx, rx) = mpsc::channel(SAMPLE_CAPACITY);
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Aggregator read error: {}", e);
                    break;
                }
            }
            match serde_json::from_str::<AggregatorSample>(&line) {
                Ok(sample) => {
                    if tx.send(sample).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Ignoring malformed aggregator sample: {}", e),
            }
        }
        info!("Aggregator connection closed");
    });

    Ok(AggregatorSource::new(rx))
}
