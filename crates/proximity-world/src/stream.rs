//! Streaming query results from the world model.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::wire::QueryResults;

/// What a stream delivers to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Data(QueryResults),
    Complete,
}

/// Result of polling a stream once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamBatch {
    /// New results are ready.
    Data(QueryResults),
    /// Nothing ready yet; poll again later.
    Pending,
    /// The query finished and will deliver nothing more.
    Completed,
}

/// A streaming query: entity name → attribute batches as they arrive.
///
/// Polling never blocks; callers wait between [`StreamBatch::Pending`]
/// results themselves. A closed connection is reported as
/// [`Error::Disconnected`].
#[async_trait]
pub trait AttributeStream: Send {
    async fn next_batch(&mut self) -> Result<StreamBatch>;

    fn is_connected(&self) -> bool;
}

/// Stream fed through an mpsc channel.
///
/// The TCP client hands these out per request; tests feed them directly.
pub struct ChannelAttributeStream {
    rx: mpsc::Receiver<StreamEvent>,
    connected: bool,
    complete: bool,
}

impl ChannelAttributeStream {
    pub fn new(rx: mpsc::Receiver<StreamEvent>) -> Self {
        Self {
            rx,
            connected: true,
            complete: false,
        }
    }

    /// Create a stream together with the sender that feeds it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<StreamEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

#[async_trait]
impl AttributeStream for ChannelAttributeStream {
    async fn next_batch(&mut self) -> Result<StreamBatch> {
        if self.complete {
            return Ok(StreamBatch::Completed);
        }
        match self.rx.try_recv() {
            Ok(StreamEvent::Data(results)) => Ok(StreamBatch::Data(results)),
            Ok(StreamEvent::Complete) => {
                self.complete = true;
                Ok(StreamBatch::Completed)
            }
            Err(mpsc::error::TryRecvError::Empty) => Ok(StreamBatch::Pending),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.connected = false;
                Err(Error::Disconnected("attribute stream closed".into()))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
