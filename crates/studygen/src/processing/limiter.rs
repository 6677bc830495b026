//! Cap on concurrent calls to an external service

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// Counting gate in front of an external service.
///
/// Waiters queue FIFO on a semaphore. A slot is released when its permit is
/// dropped, so an early return or failed call cannot leak it.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    name: &'static str,
    limit: usize,
    semaphore: Arc<Semaphore>,
}

/// Held while a gated call is in flight
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Limiter allowing `limit` calls at once (clamped to at least one)
    pub fn new(name: &'static str, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            name,
            limit,
            semaphore: Arc::new(Semaphore::new(limit)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Calls currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> Result<LimiterPermit> {
        if self.semaphore.available_permits() == 0 {
            tracing::debug!(
                "{} limiter saturated ({} in flight), waiting for a slot",
                self.name,
                self.limit
            );
        }

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| Error::internal(format!("{} limiter closed", self.name)))?;

        Ok(LimiterPermit { _permit: permit })
    }

    /// Run `call` inside a slot
    pub async fn run<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        Ok(call.await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let limiter = ConcurrencyLimiter::new("test", 2);
        assert_eq!(limiter.in_flight(), 0);

        let a = limiter.acquire().await.unwrap();
        let b = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_flight(), 2);

        drop(a);
        assert_eq!(limiter.in_flight(), 1);
        drop(b);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[test]
    fn test_zero_limit_clamped() {
        let limiter = ConcurrencyLimiter::new("test", 0);
        assert_eq!(limiter.limit(), 1);

        let permit = tokio_test::block_on(limiter.acquire()).unwrap();
        assert_eq!(limiter.in_flight(), 1);
        drop(permit);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_limit() {
        let limiter = ConcurrencyLimiter::new("test", 2);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let calls: Vec<_> = (0..6)
            .map(|_| {
                let limiter = limiter.clone();
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    limiter
                        .run(async {
                            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            current.fetch_sub(1, Ordering::SeqCst);
                        })
                        .await
                        .unwrap();
                })
            })
            .collect();

        for call in calls {
            call.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failed_call_releases_slot() {
        let limiter = ConcurrencyLimiter::new("test", 1);

        let outcome: Result<std::result::Result<(), &str>> =
            limiter.run(async { Err("generation failed") }).await;
        assert!(outcome.unwrap().is_err());
        assert_eq!(limiter.in_flight(), 0);

        // Slot is free for the next caller
        let _permit = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_flight(), 1);
    }
}
