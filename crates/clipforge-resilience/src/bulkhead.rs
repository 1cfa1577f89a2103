//! Per-service bulkhead (§4.A): caps concurrent in-flight calls to a
//! collaborator and bounds how long a call may wait for a slot before being
//! rejected, so one overloaded service cannot starve workers serving others.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

pub struct BulkheadPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

pub struct Bulkhead {
    service: String,
    semaphore: Semaphore,
    queue_timeout: Duration,
}

impl Bulkhead {
    pub fn new(service: impl Into<String>, max_concurrency: usize, queue_timeout: Duration) -> Self {
        Self { service: service.into(), semaphore: Semaphore::new(max_concurrency), queue_timeout }
    }

    /// Waits up to `queue_timeout` for a free slot. Returns `Err` if the
    /// queue timeout elapses first, which the caller should surface as
    /// `ResilientError::BulkheadRejected`.
    pub async fn acquire(&self) -> Result<BulkheadPermit<'_>, ()> {
        match tokio::time::timeout(self.queue_timeout, self.semaphore.acquire()).await {
            Ok(Ok(permit)) => Ok(BulkheadPermit { _permit: permit }),
            Ok(Err(_)) => Err(()), // semaphore closed, shouldn't happen: we never call close()
            Err(_) => {
                tracing::warn!(service = %self.service, "bulkhead queue timeout");
                Err(())
            }
        }
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

pub type SharedBulkhead = Arc<Bulkhead>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grants_up_to_capacity_then_queues() {
        let bh = Bulkhead::new("svc", 1, Duration::from_millis(200));
        let p1 = bh.acquire().await.unwrap();
        assert_eq!(bh.available_permits(), 0);
        drop(p1);
        let p2 = bh.acquire().await.unwrap();
        assert_eq!(bh.available_permits(), 0);
        drop(p2);
    }

    #[tokio::test]
    async fn rejects_after_queue_timeout() {
        let bh = Bulkhead::new("svc", 1, Duration::from_millis(50));
        let _held = bh.acquire().await.unwrap();
        let result = bh.acquire().await;
        assert!(result.is_err());
    }
}
