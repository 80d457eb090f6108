//! Background job queue with a fixed pool of worker threads.
//!
//! Jobs are submitted from the main thread, run on workers, and their
//! outputs are collected once per tick with [`AsyncJobQueue::drain_completed`].
//! Each submission gets a [`JobHandle`]; cancelling a handle drops the job
//! if it has not started and discards its output if it has.
//!
//! A job that panics does not take its worker down with it. The panic is
//! carried back and resumed on the main thread by `drain_completed`, so a
//! broken invariant inside a job is as fatal as one on the main thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;

/// Work that can run on a worker thread.
pub trait Job: Send + 'static {
    /// What the job produces.
    type Output: Send + 'static;

    /// Do the work. Runs on a worker thread.
    fn run(self) -> Self::Output;
}

/// Identifies one submitted job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobHandle(u64);

impl JobHandle {
    /// Rebuild a handle from its raw value, e.g. one logged earlier.
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle value. Handles are never reused within a queue.
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Output of a finished job.
#[derive(Debug)]
pub struct CompletedJob<O> {
    /// Handle returned by [`AsyncJobQueue::submit`].
    pub handle: JobHandle,
    /// What the job produced.
    pub output: O,
    /// Run time in microseconds (for profiling).
    pub run_time_us: u64,
}

/// What a worker sends back for one job.
enum WorkerReport<O> {
    Finished(CompletedJob<O>),
    Panicked {
        handle: JobHandle,
        payload: Box<dyn Any + Send>,
    },
}

/// Internal wrapper that carries the job and its cancellation flag.
struct QueuedJob<J> {
    handle: JobHandle,
    job: J,
    cancelled: Arc<AtomicBool>,
}

/// Runs jobs of type `J` across a thread pool.
pub struct AsyncJobQueue<J: Job> {
    /// Sender for submitting jobs.
    job_sender: Sender<QueuedJob<J>>,
    /// Held so the job channel stays connected with zero workers.
    _job_receiver: Receiver<QueuedJob<J>>,
    /// Receiver for collecting outputs on the main thread.
    result_receiver: Receiver<WorkerReport<J::Output>>,
    /// Cancellation flag per live job.
    active_jobs: Arc<DashMap<JobHandle, Arc<AtomicBool>>>,
    /// Current number of jobs queued or executing.
    in_flight: Arc<AtomicU64>,
    next_handle: AtomicU64,
    worker_count: usize,
}

impl<J: Job> AsyncJobQueue<J> {
    /// Create a queue with the specified thread count and capacities.
    ///
    /// # Arguments
    /// - `thread_count`: Number of worker threads. Typically `num_cpus - 2` to leave
    ///   headroom for the main thread and render thread. Zero spawns no workers;
    ///   jobs then stay queued, which is only useful in tests.
    /// - `max_queued`: Jobs waiting for a worker. Excess submissions are rejected.
    /// - `result_capacity`: Bounded channel capacity for finished outputs.
    ///
    /// # Panics
    ///
    /// Panics if a worker thread cannot be spawned.
    pub fn new(thread_count: usize, max_queued: usize, result_capacity: usize) -> Self {
        let (job_sender, job_receiver) = bounded::<QueuedJob<J>>(max_queued);
        let (result_sender, result_receiver) = bounded::<WorkerReport<J::Output>>(result_capacity);
        let in_flight = Arc::new(AtomicU64::new(0));

        for i in 0..thread_count {
            let receiver = job_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);

            std::thread::Builder::new()
                .name(format!("patch-worker-{i}"))
                .spawn(move || {
                    while let Ok(queued) = receiver.recv() {
                        // Check cancellation before starting work.
                        if queued.cancelled.load(Ordering::Relaxed) {
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }

                        let start = std::time::Instant::now();
                        let job = queued.job;
                        let outcome = panic::catch_unwind(AssertUnwindSafe(move || job.run()));
                        let elapsed = start.elapsed().as_micros() as u64;

                        let report = match outcome {
                            Ok(output) => WorkerReport::Finished(CompletedJob {
                                handle: queued.handle,
                                output,
                                run_time_us: elapsed,
                            }),
                            Err(payload) => WorkerReport::Panicked {
                                handle: queued.handle,
                                payload,
                            },
                        };

                        // Check cancellation after running.
                        if !queued.cancelled.load(Ordering::Relaxed) {
                            let _ = sender.send(report);
                        }

                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })
                .expect("Failed to spawn patch worker thread");
        }

        tracing::debug!(
            "Job queue started: {thread_count} workers, {max_queued} queued, {result_capacity} results"
        );

        Self {
            job_sender,
            _job_receiver: job_receiver,
            result_receiver,
            active_jobs: Arc::new(DashMap::new()),
            in_flight,
            next_handle: AtomicU64::new(1),
            worker_count: thread_count,
        }
    }

    /// Create a queue with a sensible default thread count based on CPU cores.
    pub fn with_defaults() -> Self {
        Self::new(default_worker_count(), 256, 256)
    }

    /// Submit a job for background execution.
    ///
    /// Returns the job's handle, or gives the job back if the queue is full.
    #[allow(clippy::result_large_err)]
    pub fn submit(&self, job: J) -> Result<JobHandle, J> {
        let handle = JobHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let cancelled = Arc::new(AtomicBool::new(false));
        self.active_jobs.insert(handle, Arc::clone(&cancelled));
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        self.job_sender
            .try_send(QueuedJob {
                handle,
                job,
                cancelled,
            })
            .map(|()| handle)
            .map_err(|e| {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                self.active_jobs.remove(&handle);
                e.into_inner().job
            })
    }

    /// Cancel a queued or running job.
    ///
    /// Returns `false` if the handle is unknown or its output was already
    /// drained.
    pub fn cancel(&self, handle: JobHandle) -> bool {
        match self.active_jobs.remove(&handle) {
            Some((_, cancelled)) => {
                cancelled.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Drain all finished outputs from the result channel.
    ///
    /// Outputs of jobs cancelled after they finished are dropped here.
    /// Call this once per tick on the main thread.
    ///
    /// # Panics
    ///
    /// Resumes the panic of any live job that panicked on its worker.
    pub fn drain_completed(&self) -> Vec<CompletedJob<J::Output>> {
        let mut completed = Vec::new();
        while let Ok(report) = self.result_receiver.try_recv() {
            match report {
                WorkerReport::Finished(job) => {
                    if self.active_jobs.remove(&job.handle).is_some() {
                        completed.push(job);
                    } else {
                        tracing::trace!("Dropping output of cancelled job {}", job.handle.id());
                    }
                }
                WorkerReport::Panicked { handle, payload } => {
                    if self.active_jobs.remove(&handle).is_some() {
                        tracing::error!("Job {} panicked on its worker", handle.id());
                        panic::resume_unwind(payload);
                    }
                    tracing::trace!("Dropping panic of cancelled job {}", handle.id());
                }
            }
        }
        completed
    }

    /// Number of jobs currently in flight (queued or executing).
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns `true` if the job was submitted and its output not yet drained
    /// or cancelled.
    pub fn is_pending(&self, handle: JobHandle) -> bool {
        self.active_jobs.contains_key(&handle)
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

/// Worker threads to use when none are configured: all cores but two,
/// and at least one.
#[must_use]
pub fn default_worker_count() -> usize {
    let cpus = num_cpus::get().max(2);
    (cpus - 2).max(1)
}
