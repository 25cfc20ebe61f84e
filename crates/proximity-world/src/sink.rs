//! Destinations for proximity solution batches.

use std::sync::Arc;

use async_trait::async_trait;
use proximity_core::SolutionBatch;
use tokio::sync::Mutex;

use crate::error::Result;

/// Accepts one batch of solutions per evaluation cycle.
#[async_trait]
pub trait SolutionSink: Send {
    async fn push(&mut self, batch: SolutionBatch) -> Result<()>;
}

/// Sink that keeps every batch in memory. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    pushed: Arc<Mutex<Vec<SolutionBatch>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every batch pushed so far.
    pub async fn batches(&self) -> Vec<SolutionBatch> {
        self.pushed.lock().await.clone()
    }
}

#[async_trait]
impl SolutionSink for MemorySink {
    async fn push(&mut self, batch: SolutionBatch) -> Result<()> {
        self.pushed.lock().await.push(batch);
        Ok(())
    }
}
