use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::data_models::SearchLogRecord;
use crate::db::SearchLogStore;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_SAVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Background writer for search audit records.
///
/// Handlers hand records over with [`SearchLogWriter::enqueue`] once their
/// response is built; a single task drains the queue into the store. The
/// queue is bounded and records that do not fit are dropped. A write that
/// fails, hangs past the save timeout or panics is logged and dropped, it
/// never reaches the request that produced it.
#[derive(Clone)]
pub struct SearchLogWriter {
    tx: mpsc::Sender<SearchLogRecord>,
}

impl SearchLogWriter {
    /// Spawns the draining task on the current runtime with default limits.
    pub fn spawn(store: Arc<dyn SearchLogStore>) -> SearchLogWriter {
        Self::with_limits(store, DEFAULT_QUEUE_CAPACITY, DEFAULT_SAVE_TIMEOUT)
    }

    pub fn with_limits(
        store: Arc<dyn SearchLogStore>,
        capacity: usize,
        save_timeout: Duration,
    ) -> SearchLogWriter {
        let (tx, mut rx) = mpsc::channel::<SearchLogRecord>(capacity.max(1));
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                let save = AssertUnwindSafe(store.save(&record)).catch_unwind();
                match tokio::time::timeout(save_timeout, save).await {
                    Ok(Ok(Ok(id))) => {
                        tracing::debug!("stored {} search log: {}", record.kind(), id)
                    }
                    Ok(Ok(Err(e))) => {
                        tracing::error!("background {} search log failed: {:#}", record.kind(), e);
                    }
                    Ok(Err(_)) => {
                        tracing::error!("background {} search log panicked", record.kind());
                    }
                    Err(_) => {
                        tracing::warn!(
                            "background {} search log timed out after {:?}",
                            record.kind(),
                            save_timeout
                        );
                    }
                }
            }
        });
        SearchLogWriter { tx }
    }

    /// Queues `record` without waiting. Returns false when it was dropped.
    pub fn enqueue(&self, record: SearchLogRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(record)) => {
                tracing::warn!("search log queue full, dropping {} record", record.kind());
                false
            }
            Err(TrySendError::Closed(record)) => {
                tracing::error!("search log queue closed, dropping {} record", record.kind());
                false
            }
        }
    }
}
