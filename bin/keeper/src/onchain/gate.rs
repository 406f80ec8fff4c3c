use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::chain::ChainError;

/// Serialization point of the signing account: at most one job runs at a
/// time, and once closed no new job starts.
#[derive(Default)]
pub struct SignerGate {
    lock: Mutex<()>,
    closed: AtomicBool,
}

impl SignerGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<T, Fut>(&self, job: Fut) -> Result<T, ChainError>
    where
        Fut: Future<Output = Result<T, ChainError>>,
    {
        if self.is_closed() {
            return Err(ChainError::SubmitterClosed);
        }
        let _guard = self.lock.lock().await;
        // closed while queued behind the previous job
        if self.is_closed() {
            return Err(ChainError::SubmitterClosed);
        }
        job.await
    }

    /// Reject new jobs and wait for the running one to finish.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _guard = self.lock.lock().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
