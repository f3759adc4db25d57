//! Per-job scratch arena.
//!
//! Grounded on `examples/original_source/include/ren/core/Arena.hpp`'s
//! thread-scratch leases, generalized to a per-job lifetime: a job body
//! that allocates scratch memory off the thread-local arena would corrupt
//! it if the job moves to a standby thread mid-wait (see
//! [`crate::server::standby_worker_for_blocking_wait`]), since the
//! allocation and its watermark reset would then happen on different
//! arenas. Each job gets its own arena instead, installed before its body
//! runs and torn down once it returns.

use ren_core::{Arena, ArenaKind};
use std::cell::RefCell;
use std::ptr::NonNull;

const JOB_SCRATCH_MAX_SIZE: usize = 64 * 1024 * 1024;

thread_local! {
    static JOB_SCRATCH: RefCell<Option<Arena>> = const { RefCell::new(None) };
}

/// Installs a fresh job-scratch arena for the job about to run on this
/// thread, returning whatever arena (if any) was previously installed so
/// the caller can restore it afterward.
pub(crate) fn install() -> Option<Arena> {
    JOB_SCRATCH.with(|cell| {
        cell.replace(Some(Arena::with_max_size(
            ArenaKind::JobScratch,
            JOB_SCRATCH_MAX_SIZE,
        )))
    })
}

/// Restores the arena a prior [`install`] call displaced, dropping (and so
/// freeing) the job-scratch arena that was in place while the job ran.
pub(crate) fn restore(previous: Option<Arena>) {
    JOB_SCRATCH.with(|cell| *cell.borrow_mut() = previous);
}

/// Allocates `size` bytes aligned to `alignment` from the arena of the job
/// currently running on this thread.
///
/// Panics if called off a job thread, i.e. from outside a closure passed
/// to [`crate::dispatch`].
pub fn job_scratch_allocate(size: usize, alignment: usize) -> NonNull<u8> {
    JOB_SCRATCH.with(|cell| {
        let mut borrow = cell.borrow_mut();
        let arena = borrow
            .as_mut()
            .expect("ren-job: job_scratch_allocate called outside a running job");
        arena.allocate(size, alignment)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "outside a running job")]
    fn allocating_outside_a_job_panics() {
        let _ = job_scratch_allocate(16, 8);
    }

    #[test]
    fn install_and_restore_round_trips() {
        assert!(install().is_none());
        let ptr = job_scratch_allocate(64, 8);
        assert_eq!(ptr.as_ptr() as usize % 8, 0);
        restore(None);
    }
}
