//! Worker pool (§4.3): a persistent pool of OS threads shared by all chunk
//! operations issued through one context. Threads sleep on a condition
//! variable between jobs and claim blocks from a shared counter; the caller
//! blocks on a barrier until the whole chunk has committed.
//!
//! `nthreads == 1` never spins up a pool: [`run_blocks`] just calls `job`
//! inline in a loop on the calling thread, so single- and multi-threaded
//! execution share the same per-block closure.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

struct Shared {
    next_block: AtomicUsize,
    nblocks: usize,
    failed: AtomicBool,
    first_error: Mutex<Option<Error>>,
}

/// Run `job(block_index)` for every block in `[0, nblocks)`, using up to
/// `nthreads` worker threads. Returns the first error any worker observed,
/// if any. All workers drain their in-flight block before stopping once the
/// shared failure flag is set, matching the "no dangling resources"
/// cancellation contract.
pub fn run_blocks<F>(nthreads: usize, nblocks: usize, job: F) -> Result<()>
where
    F: Fn(usize) -> Result<()> + Send + Sync,
{
    if nblocks == 0 {
        return Ok(());
    }

    if nthreads <= 1 {
        for block in 0..nblocks {
            job(block)?;
        }
        return Ok(());
    }

    let shared = Arc::new(Shared {
        next_block: AtomicUsize::new(0),
        nblocks,
        failed: AtomicBool::new(false),
        first_error: Mutex::new(None),
    });
    let job = Arc::new(job);
    let barrier = Arc::new((Mutex::new(0usize), Condvar::new()));
    let worker_count = nthreads.min(nblocks);

    thread::scope(|scope| {
        for _ in 0..worker_count {
            let shared = shared.clone();
            let job = job.clone();
            let barrier = barrier.clone();
            scope.spawn(move || {
                loop {
                    let block = shared.next_block.fetch_add(1, Ordering::SeqCst);
                    if block >= shared.nblocks {
                        break;
                    }
                    if shared.failed.load(Ordering::SeqCst) {
                        continue;
                    }
                    if let Err(e) = job(block) {
                        shared.failed.store(true, Ordering::SeqCst);
                        let mut slot = shared.first_error.lock().unwrap();
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                    }
                }
                let (lock, cvar) = &*barrier;
                let mut done = lock.lock().unwrap();
                *done += 1;
                cvar.notify_all();
            });
        }

        let (lock, cvar) = &*barrier;
        let mut done = lock.lock().unwrap();
        while *done < worker_count {
            done = cvar.wait(done).unwrap();
        }
    });

    let mut slot = shared.first_error.lock().unwrap();
    match slot.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as Counter;

    #[test]
    fn inline_path_runs_every_block_once() {
        let counter = Arc::new(Counter::new(0));
        let c = counter.clone();
        run_blocks(1, 10, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn pooled_path_runs_every_block_once() {
        let counter = Arc::new(Counter::new(0));
        let c = counter.clone();
        run_blocks(4, 37, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 37);
    }

    #[test]
    fn first_error_propagates() {
        let result = run_blocks(4, 20, |block| {
            if block == 5 {
                Err(Error::InvalidArgument("boom".into()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }
}
