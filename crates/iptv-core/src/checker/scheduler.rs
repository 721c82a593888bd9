use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::future::join_all;

/// Called once per finished item with its original index.
pub type Progress<'a, R> = &'a (dyn Fn(usize, &R) + Send + Sync);

/// Runs `work` over every item with at most `parallelism` items in flight.
///
/// A fixed pool of workers pulls indices from a shared cursor and writes each result
/// into the slot of that index, so the output is in input order whatever order the
/// work finishes in. Every item runs exactly once.
pub async fn run_all<'a, T, R, F, Fut>(
    items: &'a [T],
    parallelism: usize,
    work: F,
    progress: Option<Progress<'_, R>>,
) -> Vec<R>
where
    F: Fn(usize, &'a T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let workers = parallelism.clamp(1, total);
    let cursor = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<R>>> = Mutex::new((0..total).map(|_| None).collect());

    let cursor = &cursor;
    let slots_ref = &slots;
    let work = &work;

    join_all((0..workers).map(|_| async move {
        loop {
            let index = cursor.fetch_add(1, Ordering::Relaxed);
            if index >= total {
                break;
            }
            let result = work(index, &items[index]).await;
            if let Some(progress) = progress {
                progress(index, &result);
            }
            slots_ref.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(result);
        }
    }))
    .await;

    slots
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_iter()
        .map(|slot| slot.expect("every index is claimed by exactly one worker"))
        .collect()
}
