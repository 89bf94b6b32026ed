//! Batch accumulator
//!
//! Turns a stream of records into bounded batches. A batch is emitted as
//! soon as it holds `batch_size` records, or when the idle window elapses
//! with records pending. Closing the input flushes whatever is left and
//! then closes the output.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Idle window after which a partial batch is flushed.
pub const DEFAULT_IDLE_FLUSH: Duration = Duration::from_secs(5);

/// Spawn an accumulator over `input` and return the receiving end of its batches.
///
/// A `batch_size` of zero batches every record on its own. The idle timer
/// restarts at startup, after every emitted batch, and every time it fires.
/// Records keep their input order within and across batches.
pub fn accumulate<T>(
    batch_size: usize,
    idle: Duration,
    mut input: mpsc::Receiver<T>,
) -> mpsc::Receiver<Vec<T>>
where
    T: Send + 'static,
{
    let batch_size = batch_size.max(1);
    let (output, batches) = mpsc::channel(1);

    tokio::spawn(async move {
        let mut batch = Vec::new();
        let timer = sleep(idle);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                received = input.recv() => match received {
                    Some(record) => {
                        batch.push(record);
                        if batch.len() >= batch_size {
                            debug!(size = batch.len(), "Emitting batch");
                            let full = std::mem::take(&mut batch);
                            if output.send(full).await.is_err() {
                                return;
                            }
                            timer.as_mut().reset(Instant::now() + idle);
                        }
                    },
                    None => {
                        if !batch.is_empty() {
                            debug!(size = batch.len(), "Flushing final batch");
                            let _ = output.send(batch).await;
                        }
                        return;
                    },
                },
                () = &mut timer => {
                    if !batch.is_empty() {
                        info!(size = batch.len(), "Sending partial batch");
                        let partial = std::mem::take(&mut batch);
                        if output.send(partial).await.is_err() {
                            return;
                        }
                    }
                    timer.as_mut().reset(Instant::now() + idle);
                },
            }
        }
    });

    batches
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn drain<T>(mut batches: mpsc::Receiver<Vec<T>>) -> Vec<Vec<T>> {
        let mut out = Vec::new();
        while let Some(batch) = batches.recv().await {
            out.push(batch);
        }
        out
    }

    fn closed_input(records: impl IntoIterator<Item = u32>) -> mpsc::Receiver<u32> {
        let records: Vec<u32> = records.into_iter().collect();
        let (tx, rx) = mpsc::channel(records.len().max(1));
        for record in records {
            tx.try_send(record).unwrap();
        }
        rx
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_triggered_batches_preserve_order() {
        for (len, size) in [(0usize, 3usize), (1, 3), (9, 3), (10, 3), (7, 1), (5, 10)] {
            let batches = drain(accumulate(size, DEFAULT_IDLE_FLUSH, closed_input(0..len as u32))).await;

            assert_eq!(batches.len(), len.div_ceil(size), "len={} size={}", len, size);
            if let Some((last, full)) = batches.split_last() {
                assert!(full.iter().all(|b| b.len() == size));
                assert!(!last.is_empty() && last.len() <= size);
            }

            let flat: Vec<u32> = batches.into_iter().flatten().collect();
            assert_eq!(flat, (0..len as u32).collect::<Vec<_>>());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_flushes_pending_records() {
        let batches = drain(accumulate(3, DEFAULT_IDLE_FLUSH, closed_input([1, 2]))).await;

        assert_eq!(batches, vec![vec![1, 2]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_window_flushes_one_partial_batch() {
        let (tx, rx) = mpsc::channel(8);
        let mut batches = accumulate(3, DEFAULT_IDLE_FLUSH, rx);

        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();

        let started = Instant::now();
        assert_eq!(batches.recv().await, Some(vec![1, 2]));
        assert!(started.elapsed() >= DEFAULT_IDLE_FLUSH);

        // Nothing pending, so further idle windows emit nothing
        let quiet = tokio::time::timeout(Duration::from_secs(60), batches.recv()).await;
        assert!(quiet.is_err());

        tx.send(3).await.unwrap();
        drop(tx);
        assert_eq!(batches.recv().await, Some(vec![3]));
        assert_eq!(batches.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_idle_window() {
        let (tx, rx) = mpsc::channel(8);
        let mut batches = accumulate(10, Duration::from_millis(250), rx);

        tx.send("a").await.unwrap();

        let started = Instant::now();
        assert_eq!(batches.recv().await, Some(vec!["a"]));
        assert!(started.elapsed() < DEFAULT_IDLE_FLUSH);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_batch_size_still_flushes_on_close() {
        let batches = drain(accumulate(usize::MAX / 4, DEFAULT_IDLE_FLUSH, closed_input([1, 2]))).await;

        assert_eq!(batches, vec![vec![1, 2]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_batch_size_emits_single_records() {
        let batches = drain(accumulate(0, DEFAULT_IDLE_FLUSH, closed_input([1, 2, 3]))).await;

        assert_eq!(batches, vec![vec![1], vec![2], vec![3]]);
    }
}
