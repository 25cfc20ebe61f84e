//! World model solver connection (write side).

use async_trait::async_trait;
use proximity_core::{SolutionBatch, PROXIMITY_ATTRIBUTE};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, info};

use crate::error::Result;
use crate::sink::SolutionSink;
use crate::wire::{SolverMessage, WireSolution};

/// Connection to the world model's solver port.
///
/// Announces the `proximity` solution type on connect, then pushes one
/// message per batch. Pushes never create entities.
pub struct SolutionPublisher {
    writer: BufWriter<TcpStream>,
    origin: String,
}

impl SolutionPublisher {
    /// Connect and send the handshake.
    pub async fn connect<A: ToSocketAddrs>(addr: A, origin: impl Into<String>) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        info!("Connected to world model solver port at {}", stream.peer_addr()?);

        let mut publisher = Self {
            writer: BufWriter::new(stream),
            origin: origin.into(),
        };
        let handshake = SolverMessage::Handshake {
            origin: publisher.origin.clone(),
            solution_types: vec![PROXIMITY_ATTRIBUTE.to_string()],
        };
        publisher.send(&handshake).await?;
        Ok(publisher)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    async fn send(&mut self, msg: &SolverMessage) -> Result<()> {
        let line = serde_json::to_string(msg)? + "\n";
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl SolutionSink for SolutionPublisher {
    async fn push(&mut self, batch: SolutionBatch) -> Result<()> {
        let create_uris = batch.create_entities();
        let data: Vec<WireSolution> = batch
            .into_iter()
            .map(|solution| WireSolution::from_proximity(solution, &self.origin))
            .collect();
        debug!(solutions = data.len(), "Pushing proximity solutions");
        self.send(&SolverMessage::Push { create_uris, data }).await
    }
}
