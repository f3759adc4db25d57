//! Priority job scheduler.
//!
//! Grounded on `examples/original_source/lib/core/Job.cpp`'s priority
//! queues and parent/child counter model, reworked from fiber-switching
//! coroutines onto a plain OS-thread pool (`examples/other_examples/
//! ...-rshogi.../thread_pool.rs` is the closest idiomatic Rust analogue):
//! [`dispatch`] enqueues a batch of closures and returns a [`JobToken`];
//! [`wait`] blocks the calling thread on a condition variable until the
//! batch's counter reaches zero. There is no cooperative yielding back into
//! a scheduler fiber — a waiting thread simply parks and the OS scheduler
//! runs other workers in the meantime.

mod counter;
mod scratch;
mod server;

pub use counter::JobToken;
pub use scratch::job_scratch_allocate;
pub use server::{
    dispatch, job_is_done, launch_job_server, launch_job_server_with_workers,
    pump_main_thread_jobs, stop_job_server, wait, JobDesc, JobPriority,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, Once};

    static SERVER: Once = Once::new();
    static SERVER_LOCK: Mutex<()> = Mutex::new(());

    fn with_server<R>(f: impl FnOnce() -> R) -> R {
        let _guard = SERVER_LOCK.lock().unwrap();
        SERVER.call_once(|| {
            launch_job_server_with_workers(4);
        });
        f()
    }

    #[test]
    fn dispatch_runs_all_jobs() {
        with_server(|| {
            let counter = Arc::new(AtomicUsize::new(0));
            let jobs = (0..16)
                .map(|_| {
                    let counter = Arc::clone(&counter);
                    JobDesc::new(JobPriority::Normal, move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                })
                .collect();
            let token = dispatch(jobs);
            token.wait();
            assert_eq!(counter.load(Ordering::SeqCst), 16);
            assert!(token.is_done());
        });
    }

    #[test]
    fn wait_blocks_until_children_complete() {
        with_server(|| {
            let ran = Arc::new(AtomicUsize::new(0));
            let child_ran = Arc::clone(&ran);
            let parent_job = JobDesc::new(JobPriority::Normal, move || {
                let grandchild_ran = Arc::clone(&child_ran);
                let child_token = dispatch(vec![JobDesc::new(JobPriority::Normal, move || {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                    grandchild_ran.fetch_add(1, Ordering::SeqCst);
                })]);
                child_token.wait();
                // The child is guaranteed to have run by the time wait() returns.
                assert_eq!(child_ran.load(Ordering::SeqCst), 1);
            });
            let token = dispatch(vec![parent_job]);
            token.wait();
            assert_eq!(ran.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn high_priority_jobs_are_not_starved_by_normal_jobs() {
        with_server(|| {
            let order = Arc::new(Mutex::new(Vec::new()));
            let mut jobs = Vec::new();
            for i in 0..8 {
                let order = Arc::clone(&order);
                jobs.push(JobDesc::new(JobPriority::Normal, move || {
                    std::thread::sleep(std::time::Duration::from_millis(2));
                    order.lock().unwrap().push(("normal", i));
                }));
            }
            let high_order = Arc::clone(&order);
            jobs.push(JobDesc::new(JobPriority::High, move || {
                high_order.lock().unwrap().push(("high", 0));
            }));
            let token = dispatch(jobs);
            token.wait();
            let order = order.lock().unwrap();
            assert_eq!(order.len(), 9);
            assert!(order.iter().any(|(kind, _)| *kind == "high"));
        });
    }

    #[test]
    fn main_thread_only_jobs_wait_for_pump() {
        with_server(|| {
            let ran = Arc::new(AtomicUsize::new(0));
            let ran_clone = Arc::clone(&ran);
            let token = dispatch(vec![JobDesc::new(JobPriority::MainThreadOnly, move || {
                ran_clone.fetch_add(1, Ordering::SeqCst);
            })]);
            // Give the workers a chance to (wrongly) pick this up; they must not.
            std::thread::sleep(std::time::Duration::from_millis(20));
            assert_eq!(ran.load(Ordering::SeqCst), 0);
            assert!(!token.is_done());
            pump_main_thread_jobs();
            token.wait();
            assert_eq!(ran.load(Ordering::SeqCst), 1);
        });
    }
}
