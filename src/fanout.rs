//! Fan-out/fan-in barrier used by the search and fetch stages.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use tokio::time::Instant;
use tracing::debug;

/// Drive all `futures` concurrently and wait until every one has finished
/// or `deadline` passes, whichever comes first.
///
/// Slot `i` of the result belongs to `futures[i]`, so completion order never
/// leaks into the output. Futures still running at the deadline are dropped
/// (which cancels them) and leave their slot as `None`.
pub async fn gather_until<F, T>(futures: Vec<F>, deadline: Option<Instant>) -> Vec<Option<T>>
where
    F: Future<Output = T>,
{
    let mut slots: Vec<Option<T>> = futures.iter().map(|_| None).collect();
    let mut pending: FuturesUnordered<_> = futures
        .into_iter()
        .enumerate()
        .map(|(index, fut)| async move { (index, fut.await) })
        .collect();

    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(next) => next,
                Err(_) => {
                    debug!("Deadline reached with {} task(s) outstanding", pending.len());
                    break;
                }
            },
            None => pending.next().await,
        };

        match next {
            Some((index, value)) => slots[index] = Some(value),
            None => break,
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn slots_follow_input_order_not_completion_order() {
        let delays = vec![30u64, 10, 20];
        let futures = delays
            .iter()
            .map(|&ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                ms
            })
            .collect();

        let out = gather_until(futures, None).await;
        assert_eq!(out, vec![Some(30), Some(10), Some(20)]);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_leaves_unfinished_slots_empty() {
        let delays = vec![5u64, 500, 10];
        let futures = delays
            .iter()
            .map(|&ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                ms
            })
            .collect();

        let deadline = Instant::now() + Duration::from_millis(100);
        let out = gather_until(futures, Some(deadline)).await;
        assert_eq!(out, vec![Some(5), None, Some(10)]);
    }

    #[tokio::test]
    async fn empty_input_returns_immediately() {
        let futures: Vec<std::future::Ready<u8>> = Vec::new();
        assert!(gather_until(futures, None).await.is_empty());
    }
}
