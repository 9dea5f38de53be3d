//! Bounded worker pool with a job queue and a completion channel.
//!
//! Workers pull `(id, job)` pairs, run the shared handler, and push
//! `(id, outcome)` back. Panics are caught and reported as `TaskFailure`.
//! Dropping the pool closes the queue; workers finish their current job and
//! are joined.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A task that returned an error or panicked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub task: u64,
    pub cause: String,
}

type Outcome<O> = (u64, Result<O, TaskFailure>);

pub(crate) struct WorkerPool<J, O> {
    jobs: Option<Sender<(u64, J)>>,
    done: Receiver<Outcome<O>>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl<J: Send + 'static, O: Send + 'static> WorkerPool<J, O> {
    /// Start `workers` threads named `{name}-{idx}`. The job queue holds at
    /// most `workers` pending jobs.
    pub(crate) fn spawn<F>(workers: usize, name: &str, handler: F) -> Result<Self, CoreError>
    where
        F: Fn(J) -> Result<O, String> + Send + Sync + 'static,
    {
        let workers = workers.max(1);
        let (job_tx, job_rx) = bounded::<(u64, J)>(workers);
        let (done_tx, done_rx) = unbounded::<Outcome<O>>();
        let handler = Arc::new(handler);
        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx = job_rx.clone();
            let tx = done_tx.clone();
            let handler = Arc::clone(&handler);
            let handle = thread::Builder::new()
                .name(format!("{name}-{idx}"))
                .spawn(move || worker_loop(rx, tx, handler))
                .map_err(|err| CoreError::pool(format!("failed to spawn worker: {err}")))?;
            handles.push(handle);
        }
        Ok(Self {
            jobs: Some(job_tx),
            done: done_rx,
            handles,
        })
    }

    pub(crate) fn submit(&self, id: u64, job: J) -> Result<(), CoreError> {
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| CoreError::pool("job queue already closed"))?;
        jobs.send((id, job))
            .map_err(|_| CoreError::pool("all workers exited"))
    }

    /// Block until the next task completes, in completion order.
    pub(crate) fn recv(&self) -> Result<Outcome<O>, CoreError> {
        self.done
            .recv()
            .map_err(|_| CoreError::pool("workers exited with tasks outstanding"))
    }
}

impl<J, O> Drop for WorkerPool<J, O> {
    fn drop(&mut self) {
        self.jobs.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop<J, O, F>(rx: Receiver<(u64, J)>, tx: Sender<Outcome<O>>, handler: Arc<F>)
where
    F: Fn(J) -> Result<O, String>,
{
    while let Ok((id, job)) = rx.recv() {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| (*handler)(job))) {
            Ok(Ok(out)) => Ok(out),
            Ok(Err(cause)) => Err(TaskFailure { task: id, cause }),
            Err(payload) => Err(TaskFailure {
                task: id,
                cause: panic_message(payload.as_ref()),
            }),
        };
        if tx.send((id, outcome)).is_err() {
            break;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_job_reports_back() {
        let pool = WorkerPool::spawn(3, "sq", |x: u64| Ok::<u64, String>(x * x)).unwrap();
        let mut expected = 0;
        for id in 0..3 {
            pool.submit(id, id + 1).unwrap();
            expected += (id + 1) * (id + 1);
        }
        let mut total = 0;
        for _ in 0..3 {
            let (_, out) = pool.recv().unwrap();
            total += out.unwrap();
        }
        assert_eq!(total, expected);
    }

    #[test]
    fn errors_and_panics_become_failures() {
        let pool = WorkerPool::spawn(2, "fail", |x: i32| {
            if x < 0 {
                panic!("negative input {x}");
            }
            if x == 0 {
                return Err("zero".to_string());
            }
            Ok(x)
        })
        .unwrap();
        pool.submit(7, -1).unwrap();
        pool.submit(8, 0).unwrap();
        let mut failures = Vec::new();
        for _ in 0..2 {
            let (id, out) = pool.recv().unwrap();
            let failure = out.unwrap_err();
            assert_eq!(failure.task, id);
            failures.push(failure);
        }
        failures.sort_by_key(|f| f.task);
        assert!(failures[0].cause.contains("negative input -1"));
        assert_eq!(failures[1].cause, "zero");

        // The pool keeps serving after a panic.
        pool.submit(9, 5).unwrap();
        assert_eq!(pool.recv().unwrap(), (9, Ok(5)));
    }

    #[test]
    fn drop_joins_idle_workers() {
        let pool = WorkerPool::<u8, u8>::spawn(4, "idle", |x| Ok(x)).unwrap();
        drop(pool);
    }
}
