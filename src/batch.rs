//! Bounded-concurrency batch execution.
//!
//! Every item runs to completion under a semaphore cap. One item failing
//! never cancels its siblings, and results come back in input order.

use std::future::Future;

use futures::future::join_all;
use tokio::sync::Semaphore;

/// Default number of operations in flight.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Run `f` for every item with at most `limit` futures in flight.
///
/// A `limit` of zero is treated as one.
///
/// # Example
///
/// ```rust
/// use rs_product_extract::batch::run_bounded;
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let doubled = rt.block_on(run_bounded(vec![1, 2, 3], 2, |n| async move { Ok::<_, String>(n * 2) }));
/// assert_eq!(doubled, vec![Ok(2), Ok(4), Ok(6)]);
/// ```
pub async fn run_bounded<I, T, E, F, Fut>(items: I, limit: usize, f: F) -> Vec<Result<T, E>>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let semaphore = Semaphore::new(limit.max(1));
    let semaphore = &semaphore;
    let f = &f;

    join_all(items.into_iter().map(|item| async move {
        // The semaphore lives for the whole call and is never closed.
        let _permit = semaphore.acquire().await.ok();
        f(item).await
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_cap_is_respected_and_order_preserved() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let results = run_bounded(0..8u64, 3, |n| {
            let in_flight = &in_flight;
            let peak = &peak;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10 * (8 - n))).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(n)
            }
        })
        .await;

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(results, (0..8).map(Ok).collect::<Vec<Result<u64, String>>>());
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let results = run_bounded(vec!["a", "bad", "c"], DEFAULT_CONCURRENCY, |s| async move {
            if s == "bad" {
                Err(format!("failed {s}"))
            } else {
                Ok(s.to_uppercase())
            }
        })
        .await;

        assert_eq!(results, vec![Ok("A".to_string()), Err("failed bad".to_string()), Ok("C".to_string())]);
    }
}
