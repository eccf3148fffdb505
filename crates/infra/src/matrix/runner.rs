//! Bounded worker pool with an optional overall deadline.
//!
//! Workers pull `(index, item)` pairs from a shared queue and send results
//! back over a channel; the caller is the only collector. On timeout the pool
//! is cancelled and detached: in-flight items finish in the background and
//! their results are dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

/// Results collected before the pool finished or the deadline passed.
#[derive(Debug)]
pub struct BoundedRun<R> {
    /// `(input index, result)`, sorted by index.
    pub results: Vec<(usize, R)>,
    pub timed_out: bool,
}

impl<R> BoundedRun<R> {
    /// Indices of inputs without a result.
    pub fn missing(&self, total: usize) -> Vec<usize> {
        let mut done = vec![false; total];
        for (index, _) in &self.results {
            if let Some(slot) = done.get_mut(*index) {
                *slot = true;
            }
        }
        done.iter()
            .enumerate()
            .filter_map(|(index, finished)| (!finished).then_some(index))
            .collect()
    }
}

type Queue<T> = Arc<Mutex<VecDeque<(usize, T)>>>;

/// Run `work` over `items` on at most `parallelism` threads.
pub fn run_bounded<T, R, F>(items: Vec<T>, parallelism: usize, timeout: Option<Duration>, work: F) -> BoundedRun<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    let total = items.len();
    if total == 0 {
        return BoundedRun {
            results: Vec::new(),
            timed_out: false,
        };
    }

    let deadline = timeout.map(|t| Instant::now() + t);
    let queue: Queue<T> = Arc::new(Mutex::new(items.into_iter().enumerate().collect()));
    let cancelled = Arc::new(AtomicBool::new(false));
    let work = Arc::new(work);
    let (tx, rx) = mpsc::channel::<(usize, R)>();

    let workers = parallelism.clamp(1, total);
    let mut handles = Vec::with_capacity(workers);
    for n in 0..workers {
        let queue = Arc::clone(&queue);
        let cancelled = Arc::clone(&cancelled);
        let work = Arc::clone(&work);
        let tx = tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("replenish-worker-{n}"))
            .spawn(move || worker_loop(&queue, &cancelled, deadline, work.as_ref(), &tx));
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                warn!(worker = n, error = %e, "failed to spawn forecast worker");
                break;
            }
        }
    }

    if handles.is_empty() {
        worker_loop(&queue, &cancelled, deadline, work.as_ref(), &tx);
    }
    drop(tx);

    let mut results = Vec::with_capacity(total);
    let mut timed_out = false;
    while results.len() < total {
        match receive(&rx, deadline) {
            Received::Item(result) => results.push(result),
            Received::Disconnected => break,
            Received::TimedOut => {
                timed_out = true;
                break;
            }
        }
    }
    // Workers stop taking items at the deadline, so the channel may close first.
    if results.len() < total && deadline.is_some_and(|d| Instant::now() >= d) {
        timed_out = true;
    }

    if timed_out {
        cancelled.store(true, Ordering::SeqCst);
    } else {
        for handle in handles {
            if handle.join().is_err() {
                warn!("forecast worker panicked");
            }
        }
    }

    results.sort_by_key(|(index, _)| *index);
    BoundedRun { results, timed_out }
}

enum Received<R> {
    Item(R),
    Disconnected,
    TimedOut,
}

fn receive<R>(rx: &mpsc::Receiver<R>, deadline: Option<Instant>) -> Received<R> {
    match rx.try_recv() {
        Ok(item) => return Received::Item(item),
        Err(TryRecvError::Disconnected) => return Received::Disconnected,
        Err(TryRecvError::Empty) => {}
    }

    let Some(deadline) = deadline else {
        return rx.recv().map_or(Received::Disconnected, Received::Item);
    };
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Received::TimedOut;
    }
    match rx.recv_timeout(remaining) {
        Ok(item) => Received::Item(item),
        Err(RecvTimeoutError::Timeout) => Received::TimedOut,
        Err(RecvTimeoutError::Disconnected) => Received::Disconnected,
    }
}

fn worker_loop<T, R, F>(
    queue: &Mutex<VecDeque<(usize, T)>>,
    cancelled: &AtomicBool,
    deadline: Option<Instant>,
    work: &F,
    tx: &mpsc::Sender<(usize, R)>,
) where
    F: Fn(T) -> R,
{
    loop {
        if cancelled.load(Ordering::SeqCst) || deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        let next = match queue.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(_) => None,
        };
        let Some((index, item)) = next else {
            break;
        };

        let result = work(item);
        if tx.send((index, result)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn results_come_back_in_input_order() {
        let items: Vec<u64> = (0..50).collect();
        let run = run_bounded(items, 4, None, |n| {
            // Later items finish first.
            thread::sleep(Duration::from_micros(50 - n));
            n * 2
        });

        assert!(!run.timed_out);
        let values: Vec<u64> = run.results.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, (0..50).map(|n| n * 2).collect::<Vec<_>>());
        assert!(run.missing(50).is_empty());
    }

    #[test]
    fn never_exceeds_parallelism() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        let run = run_bounded((0..24).collect::<Vec<u32>>(), 3, None, move |n| {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            a.fetch_sub(1, Ordering::SeqCst);
            n
        });

        assert_eq!(run.results.len(), 24);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn zero_parallelism_still_runs() {
        let run = run_bounded(vec![1, 2, 3], 0, None, |n| n + 1);
        assert_eq!(run.results, vec![(0, 2), (1, 3), (2, 4)]);
    }

    #[test]
    fn empty_input_is_trivially_complete() {
        let run = run_bounded(Vec::<u8>::new(), 4, Some(Duration::ZERO), |n| n);
        assert!(run.results.is_empty());
        assert!(!run.timed_out);
    }

    #[test]
    fn deadline_reports_missing_items() {
        let run = run_bounded((0..20).collect::<Vec<u32>>(), 1, Some(Duration::from_millis(30)), |n| {
            thread::sleep(Duration::from_millis(10));
            n
        });

        assert!(run.timed_out);
        let missing = run.missing(20);
        assert!(!missing.is_empty());
        assert_eq!(run.results.len() + missing.len(), 20);
        // A single worker processes in order, so completed items form a prefix.
        for (position, (index, _)) in run.results.iter().enumerate() {
            assert_eq!(position, *index);
        }
    }
}
