//! Bounded-queue worker pool with join-barrier semantics.
//!
//! The pipeline driver fans per-body tasks out with [`WorkPool::submit`]
//! and joins each stage with [`WorkPool::wait`] before starting the next.
//! Tasks must never call `wait` themselves; doing so deadlocks the pool
//! and counts as programmer error.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::error::SimulationError;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Bounded queue capacity per worker.
const QUEUE_SLOTS_PER_WORKER: usize = 10;

/// Fixed-size pool of OS worker threads draining a bounded FIFO queue.
///
/// `submit` blocks only while the queue is full; `wait` blocks until every
/// submitted task has completed. There is no cancellation: once submitted,
/// a task runs to completion.
pub struct WorkPool {
    sender: Option<SyncSender<Task>>,
    workers: Vec<thread::JoinHandle<()>>,
    pending: Arc<Pending>,
    worker_count: usize,
}

#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn increment(&self) {
        *self.count.lock().expect("pending counter poisoned") += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock().expect("pending counter poisoned");
        *count -= 1;
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_for_zero(&self) {
        let mut count = self.count.lock().expect("pending counter poisoned");
        while *count > 0 {
            count = self.idle.wait(count).expect("pending counter poisoned");
        }
    }
}

impl WorkPool {
    /// Spawn `worker_count` workers (at least one) behind a queue of
    /// `worker_count * 10` slots.
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = sync_channel::<Task>(worker_count * QUEUE_SLOTS_PER_WORKER);
        let receiver = Arc::new(Mutex::new(receiver));
        let pending = Arc::new(Pending::default());

        let workers = (0..worker_count)
            .map(|index| {
                let receiver = Arc::clone(&receiver);
                let pending = Arc::clone(&pending);
                thread::Builder::new()
                    .name(format!("sim-worker-{index}"))
                    .spawn(move || worker_loop(receiver, pending))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
            pending,
            worker_count,
        }
    }

    /// Enqueue a task. Blocks while the queue is full; fails with
    /// `PoolClosed` after [`WorkPool::close`]. Safe to call from multiple
    /// producer threads.
    pub fn submit<F>(&self, task: F) -> Result<(), SimulationError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(SimulationError::PoolClosed)?;
        self.pending.increment();
        if sender.send(Box::new(task)).is_err() {
            self.pending.decrement();
            return Err(SimulationError::PoolClosed);
        }
        Ok(())
    }

    /// Block until the pending-task counter reaches zero.
    ///
    /// Must only be called from outside the pool's own workers.
    pub fn wait(&self) {
        self.pending.wait_for_zero();
    }

    /// Drain in-flight work and join the workers. Idempotent; also runs on
    /// drop.
    pub fn close(&mut self) {
        // Dropping the sender lets workers drain the queue, then exit on
        // the disconnected recv.
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

impl Drop for WorkPool {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_loop(receiver: Arc<Mutex<Receiver<Task>>>, pending: Arc<Pending>) {
    loop {
        let task = {
            let receiver = receiver.lock().expect("task queue poisoned");
            receiver.recv()
        };
        match task {
            Ok(task) => {
                // A panicking task must still decrement the counter, or a
                // later wait() would hang the whole pipeline.
                if catch_unwind(AssertUnwindSafe(task)).is_err() {
                    tracing::error!("pooled task panicked");
                }
                pending.decrement();
            }
            Err(_) => break,
        }
    }
}
