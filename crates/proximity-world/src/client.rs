//! World model client connection (read side).
//!
//! One TCP connection carries any number of streaming queries. A reader
//! task demultiplexes responses by ticket into per-query channels; when the
//! connection drops every query stream reports itself disconnected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::stream::{ChannelAttributeStream, StreamEvent};
use crate::wire::{ClientRequest, ClientResponse};

/// Buffered batches per query before the reader applies backpressure.
const STREAM_CAPACITY: usize = 1024;

type Routes = Arc<Mutex<HashMap<u32, mpsc::Sender<StreamEvent>>>>;

/// Connection to the world model's client port.
pub struct WorldModelClient {
    writer: Mutex<OwnedWriteHalf>,
    routes: Routes,
    next_ticket: AtomicU32,
}

impl WorldModelClient {
    /// Connect and start the response reader.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let peer = stream.peer_addr()?;
        info!("Connected to world model client port at {}", peer);

        let (reader, writer) = stream.into_split();
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));

        let reader_routes = Arc::clone(&routes);
        tokio::spawn(async move {
            read_responses(reader, reader_routes).await;
            info!("World model client connection closed");
        });

        Ok(Self {
            writer: Mutex::new(writer),
            routes,
            next_ticket: AtomicU32::new(1),
        })
    }

    /// Open a streaming query for entities matching `uri` that carry
    /// attributes matching any of `attributes`, refreshed every `interval`.
    pub async fn stream_request(
        &self,
        uri: &str,
        attributes: &[&str],
        interval: Duration,
    ) -> Result<ChannelAttributeStream> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let (tx, stream) = ChannelAttributeStream::channel(STREAM_CAPACITY);
        self.routes.lock().await.insert(ticket, tx);

        let request = ClientRequest::StreamRequest {
            ticket,
            uri: uri.to_string(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            interval_ms: interval.as_millis() as u64,
        };
        let line = serde_json::to_string(&request)? + "\n";
        self.writer.lock().await.write_all(line.as_bytes()).await?;

        debug!(ticket, uri, ?attributes, "Opened stream request");
        Ok(stream)
    }
}

async fn read_responses(reader: OwnedReadHalf, routes: Routes) {
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("World model read error: {}", e);
                break;
            }
        }

        let response = match serde_json::from_str::<ClientResponse>(&line) {
            Ok(response) => response,
            Err(e) => {
                warn!("Ignoring malformed world model response: {}", e);
                continue;
            }
        };

        let (ticket, event) = match response {
            ClientResponse::Data { ticket, results } => (ticket, StreamEvent::Data(results)),
            ClientResponse::Complete { ticket } => (ticket, StreamEvent::Complete),
        };
        let complete = matches!(event, StreamEvent::Complete);

        let tx = routes.lock().await.get(&ticket).cloned();
        match tx {
            Some(tx) => {
                if tx.send(event).await.is_err() {
                    debug!(ticket, "Stream consumer dropped");
                    routes.lock().await.remove(&ticket);
                } else if complete {
                    routes.lock().await.remove(&ticket);
                }
            }
            None => debug!(ticket, "Response for unknown ticket"),
        }
    }

    // Dropping the senders disconnects every open stream.
    routes.lock().await.clear();
}
