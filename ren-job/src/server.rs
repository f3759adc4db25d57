use crate::counter::{Counter, JobToken};
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use log::{debug, warn};
use std::cell::Cell;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::JoinHandle;

/// Where a job is queued. `High` is polled ahead of `Normal` on every
/// worker; `MainThreadOnly` is never touched by a worker and only runs when
/// the host calls [`pump_main_thread_jobs`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JobPriority {
    High,
    Normal,
    MainThreadOnly,
}

/// One unit of work: a priority and a closure to run on whichever thread
/// picks it up.
pub struct JobDesc {
    priority: JobPriority,
    func: Box<dyn FnOnce() + Send + 'static>,
}

impl JobDesc {
    pub fn new(priority: JobPriority, func: impl FnOnce() + Send + 'static) -> JobDesc {
        JobDesc {
            priority,
            func: Box::new(func),
        }
    }
}

struct Task {
    func: Box<dyn FnOnce() + Send + 'static>,
    counter: Arc<Counter>,
    priority: JobPriority,
}

thread_local! {
    // `None` off a worker thread (the host's own main thread, a test
    // thread, ...). Set for the duration of `run_task` so a nested
    // `dispatch` can see the priority of the job it's running inside of.
    static CURRENT_JOB_PRIORITY: Cell<Option<JobPriority>> = const { Cell::new(None) };
    static IS_WORKER_THREAD: Cell<bool> = const { Cell::new(false) };
}

fn run_task(task: Task) {
    let previous_priority = CURRENT_JOB_PRIORITY.with(|c| c.replace(Some(task.priority)));
    let previous_scratch = crate::scratch::install();
    (task.func)();
    crate::scratch::restore(previous_scratch);
    CURRENT_JOB_PRIORITY.with(|c| c.set(previous_priority));
    task.counter.decrement();
}

struct Worker {
    shutdown_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

struct JobServer {
    workers: Vec<Worker>,
    high_tx: Sender<Task>,
    high_rx: Receiver<Task>,
    normal_tx: Sender<Task>,
    normal_rx: Receiver<Task>,
    main_tx: Sender<Task>,
    main_rx: Receiver<Task>,
}

static JOB_SERVER: OnceLock<Mutex<Option<JobServer>>> = OnceLock::new();

fn job_server_cell() -> &'static Mutex<Option<JobServer>> {
    JOB_SERVER.get_or_init(|| Mutex::new(None))
}

fn worker_loop(id: usize, high_rx: Receiver<Task>, normal_rx: Receiver<Task>, shutdown_rx: Receiver<()>) {
    IS_WORKER_THREAD.with(|c| c.set(true));
    debug!("ren-job: worker {id} started");
    loop {
        // High priority is polled non-blockingly ahead of the fair select
        // below so it always wins a race against normal-priority work.
        if let Ok(task) = high_rx.try_recv() {
            run_task(task);
            continue;
        }
        select! {
            recv(shutdown_rx) -> _ => break,
            recv(high_rx) -> msg => match msg {
                Ok(task) => run_task(task),
                Err(_) => break,
            },
            recv(normal_rx) -> msg => match msg {
                Ok(task) => run_task(task),
                Err(_) => break,
            },
        }
    }
    debug!("ren-job: worker {id} stopped");
}

/// Starts the job server with `num_cpus::get().saturating_sub(1).max(1)`
/// worker threads, leaving the calling thread free to act as the main
/// thread that drains [`pump_main_thread_jobs`].
pub fn launch_job_server() {
    launch_job_server_with_workers(num_cpus::get().saturating_sub(1).max(1));
}

/// Starts the job server with an explicit worker count; exposed for tests
/// and for hosts that want to reserve more cores for themselves. Even a
/// single-worker pool stays live: a worker blocked in [`JobToken::wait`]
/// hands off to a standby thread for as long as it's blocked, so a batch
/// can never be stuck behind its own parent.
pub fn launch_job_server_with_workers(num_workers: usize) {
    let (high_tx, high_rx) = unbounded::<Task>();
    let (normal_tx, normal_rx) = unbounded::<Task>();
    let (main_tx, main_rx) = unbounded::<Task>();

    let mut workers = Vec::with_capacity(num_workers);
    for id in 0..num_workers {
        let worker_high_rx = high_rx.clone();
        let worker_normal_rx = normal_rx.clone();
        let (shutdown_tx, shutdown_rx) = unbounded::<()>();
        let handle = std::thread::Builder::new()
            .name(format!("ren-job-{id}"))
            .spawn(move || worker_loop(id, worker_high_rx, worker_normal_rx, shutdown_rx))
            .expect("ren-job: failed to spawn worker thread");
        workers.push(Worker {
            shutdown_tx,
            handle: Some(handle),
        });
    }

    let mut guard = job_server_cell().lock().unwrap();
    assert!(guard.is_none(), "ren-job: job server already launched");
    *guard = Some(JobServer {
        workers,
        high_tx,
        high_rx,
        normal_tx,
        normal_rx,
        main_tx,
        main_rx,
    });
}

/// Signals every worker to exit and joins them. Jobs still queued in the
/// main-thread-only channel are dropped without running.
pub fn stop_job_server() {
    let mut guard = job_server_cell().lock().unwrap();
    let Some(mut server) = guard.take() else {
        return;
    };
    for worker in &server.workers {
        let _ = worker.shutdown_tx.send(());
    }
    for worker in server.workers.iter_mut() {
        if let Some(handle) = worker.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Enqueues `jobs` and returns a token that completes once all of them have
/// run. Safe to call from a worker thread (to fan out nested work) or from
/// the main thread. A job dispatched from inside a currently-running
/// `High`-priority job is itself promoted to `High`, so a high-priority
/// job's children can't be starved behind unrelated normal-priority work
/// queued by someone else; `MainThreadOnly` jobs are never promoted, since
/// that queue is a thread-affinity requirement, not a priority level.
pub fn dispatch(jobs: Vec<JobDesc>) -> JobToken {
    let guard = job_server_cell().lock().unwrap();
    let server = guard.as_ref().expect("ren-job: job server not launched");
    let counter = Counter::new(jobs.len());
    let inherit_high = CURRENT_JOB_PRIORITY.with(|c| c.get()) == Some(JobPriority::High);
    for job in jobs {
        let priority = if inherit_high && job.priority != JobPriority::MainThreadOnly {
            JobPriority::High
        } else {
            job.priority
        };
        let task = Task {
            func: job.func,
            counter: Arc::clone(&counter),
            priority,
        };
        let result = match priority {
            JobPriority::High => server.high_tx.send(task),
            JobPriority::Normal => server.normal_tx.send(task),
            JobPriority::MainThreadOnly => server.main_tx.send(task),
        };
        if result.is_err() {
            warn!("ren-job: dropped a job, server channel is closed");
        }
    }
    JobToken(counter)
}

/// Blocks the calling thread until every job in `token`'s batch has run.
pub fn wait(token: &JobToken) {
    token.wait();
}

pub fn job_is_done(token: &JobToken) -> bool {
    token.is_done()
}

/// Runs every `MainThreadOnly` job queued so far, without blocking for more
/// to arrive. Intended to be called once per frame from the host's main
/// loop.
pub fn pump_main_thread_jobs() {
    let guard = job_server_cell().lock().unwrap();
    let Some(server) = guard.as_ref() else {
        return;
    };
    while let Ok(task) = server.main_rx.try_recv() {
        run_task(task);
    }
}

/// An extra worker thread kept alive only for the duration of one blocking
/// [`JobToken::wait`] call; shut down as soon as the wait it was spawned
/// for returns. See [`standby_worker_for_blocking_wait`].
pub(crate) struct StandbyWorker {
    shutdown_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for StandbyWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// If the calling thread is one of the job server's own workers, spawns a
/// temporary standby worker that shares its queues and lives as long as the
/// returned guard, then returns the guard; otherwise returns `None`.
///
/// A worker that blocks in [`Counter::wait`](crate::counter::Counter::wait)
/// without this would permanently remove itself from the pool's capacity
/// for as long as the wait lasts — on a single-worker pool, a job that
/// dispatches children and waits for them would deadlock, since nothing
/// would ever be left to run those children. The standby thread takes over
/// the blocked worker's share of the pool's capacity until the wait
/// resolves, then exits.
pub(crate) fn standby_worker_for_blocking_wait() -> Option<StandbyWorker> {
    if !IS_WORKER_THREAD.with(|c| c.get()) {
        return None;
    }
    let guard = job_server_cell().lock().unwrap();
    let server = guard.as_ref()?;
    let high_rx = server.high_rx.clone();
    let normal_rx = server.normal_rx.clone();
    drop(guard);

    let (shutdown_tx, shutdown_rx) = unbounded::<()>();
    let handle = std::thread::Builder::new()
        .name("ren-job-standby".to_string())
        .spawn(move || worker_loop(usize::MAX, high_rx, normal_rx, shutdown_rx))
        .expect("ren-job: failed to spawn standby worker thread");
    Some(StandbyWorker {
        shutdown_tx,
        handle: Some(handle),
    })
}
