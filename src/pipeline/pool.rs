//! Bounded-concurrency page worker pool.
//!
//! Every page gets one future; at most `concurrency` of them are polled at a
//! time. Results are written into a pre-sized vector at the page's own
//! index, so completion order never leaks into the output and no lock is
//! needed around the collection.
//!
//! The pool guarantees exactly one result per input. A worker that panics
//! is caught and mapped through `on_abort`, and any slot still empty after
//! the drain (which would mean a lost task) is filled the same way.

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Run `worker(index, input)` for every input with bounded concurrency.
///
/// The returned vector has the same length and order as `inputs`.
pub async fn run_indexed<I, T, F, Fut, A>(
    inputs: Vec<I>,
    concurrency: usize,
    worker: F,
    on_abort: A,
) -> Vec<T>
where
    F: Fn(usize, I) -> Fut,
    Fut: Future<Output = T>,
    A: Fn(usize, String) -> T,
{
    let total = inputs.len();
    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();

    let mut completions = stream::iter(inputs.into_iter().enumerate().map(|(idx, input)| {
        let task = worker(idx, input);
        async move { (idx, AssertUnwindSafe(task).catch_unwind().await) }
    }))
    .buffer_unordered(concurrency.max(1));

    while let Some((idx, outcome)) = completions.next().await {
        let value = match outcome {
            Ok(value) => value,
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                error!("Worker for slot {} panicked: {}", idx, msg);
                on_abort(idx, msg)
            }
        };
        slots[idx] = Some(value);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| slot.unwrap_or_else(|| on_abort(idx, "worker reported no result".into())))
        .collect()
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn results_follow_input_order_not_completion_order() {
        // Later pages finish first.
        let inputs: Vec<u64> = vec![40, 30, 20, 10, 0];
        let out = run_indexed(
            inputs,
            5,
            |idx, delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                idx * 10
            },
            |_, _| usize::MAX,
        )
        .await;
        assert_eq!(out, vec![0, 10, 20, 30, 40]);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let out = run_indexed(
            (0..12).collect::<Vec<_>>(),
            3,
            |_, i| {
                let running = &running;
                let peak = &peak;
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    i
                }
            },
            |_, _| -1,
        )
        .await;
        assert_eq!(out, (0..12).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn panicking_worker_yields_abort_value() {
        let out = run_indexed(
            vec![1, 2, 3],
            2,
            |idx, v| async move {
                if idx == 1 {
                    panic!("page {v} exploded");
                }
                Ok::<_, String>(v)
            },
            |_, msg| Err(msg),
        )
        .await;
        assert_eq!(out[0], Ok(1));
        assert_eq!(out[1], Err("page 2 exploded".to_string()));
        assert_eq!(out[2], Ok(3));
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let out: Vec<i32> = run_indexed(Vec::<i32>::new(), 3, |_, v| async move { v }, |_, _| 0).await;
        assert!(out.is_empty());
    }
}
