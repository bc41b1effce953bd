//! Background worker threads for loading and saving.
//!
//! A [`Job`] runs one closure on a named thread and reports progress and its
//! final result over a channel. The owner polls it without blocking from its
//! own loop, so results are always applied on the owner's thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::ingest::ProgressSink;

/// Message sent from a job to its owner.
#[derive(Debug)]
pub enum JobUpdate<T> {
    /// Work in progress
    Progress {
        /// Share of the work done, 0..=100
        percent: u8,
        /// Item currently being processed
        file: String,
    },
    /// The job's result; always the last message
    Finished(T),
}

/// Handle given to the job closure.
pub struct JobContext<T> {
    updates: Sender<JobUpdate<T>>,
    cancel: Arc<AtomicBool>,
}

impl<T> JobContext<T> {
    /// Cancel flag shared with the owner.
    pub fn cancel_flag(&self) -> &AtomicBool {
        &self.cancel
    }
}

impl<T: Send> ProgressSink for JobContext<T> {
    fn report_progress(&self, percent: u8, current_file: &str) {
        let _ = self.updates.send(JobUpdate::Progress {
            percent,
            file: current_file.to_string(),
        });
    }
}

/// A closure running on its own thread.
pub struct Job<T> {
    name: String,
    updates: Receiver<JobUpdate<T>>,
    cancel: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    finished: bool,
}

impl<T: Send + 'static> Job<T> {
    /// Spawn `work` on a thread called `name`.
    ///
    /// Returns `Err` if the thread fails to spawn.
    pub fn spawn<F>(name: &str, work: F) -> std::io::Result<Self>
    where
        F: FnOnce(&JobContext<T>) -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let context = JobContext {
            updates: tx,
            cancel: Arc::clone(&cancel),
        };

        let thread_name = name.to_string();
        let thread_handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            log::debug!("Job '{}' started", thread_name);
            let result = work(&context);
            if context.updates.send(JobUpdate::Finished(result)).is_err() {
                log::debug!("Job '{}' finished after its owner went away", thread_name);
            } else {
                log::debug!("Job '{}' finished", thread_name);
            }
        })?;

        Ok(Self {
            name: name.to_string(),
            updates: rx,
            cancel,
            thread_handle: Some(thread_handle),
            finished: false,
        })
    }
}

impl<T> Job<T> {
    /// Ask the job to stop at its next cancellation point.
    pub fn cancel(&self) {
        log::debug!("Cancelling job '{}'", self.name);
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Whether the final result has been received.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Take one update from the queue without blocking.
    pub fn try_update(&mut self) -> Option<JobUpdate<T>> {
        if self.finished {
            return None;
        }
        match self.updates.try_recv() {
            Ok(update) => {
                if matches!(update, JobUpdate::Finished(_)) {
                    self.finished = true;
                }
                Some(update)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Job '{}' disconnected without a result", self.name);
                self.finished = true;
                None
            }
        }
    }
}

impl<T> Drop for Job<T> {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel.store(true, Ordering::Relaxed);
        }

        // Wait for thread to finish
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Job '{}' panicked: {:?}", self.name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_reports_progress_then_result() {
        let mut job = Job::spawn("test-job", |ctx: &JobContext<u32>| {
            ctx.report_progress(50, "a.csv");
            ctx.report_progress(100, "b.csv");
            7
        })
        .unwrap();

        let mut progress = Vec::new();
        let result = loop {
            match job.try_update() {
                Some(JobUpdate::Progress { percent, file }) => progress.push((percent, file)),
                Some(JobUpdate::Finished(result)) => break result,
                None => std::thread::yield_now(),
            }
        };

        assert_eq!(result, 7);
        assert_eq!(progress, vec![(50, "a.csv".to_string()), (100, "b.csv".to_string())]);
        assert!(job.is_finished());
        assert!(job.try_update().is_none());
    }

    #[test]
    fn test_cancel_is_visible_to_job() {
        let mut job = Job::spawn("cancel-job", |ctx: &JobContext<bool>| {
            while !ctx.cancel_flag().load(Ordering::Relaxed) {
                std::thread::yield_now();
            }
            true
        })
        .unwrap();

        job.cancel();
        let result = loop {
            match job.try_update() {
                Some(JobUpdate::Finished(result)) => break result,
                Some(JobUpdate::Progress { .. }) => {}
                None => std::thread::yield_now(),
            }
        };
        assert!(result);
    }

    #[test]
    fn test_drop_cancels_and_joins() {
        let flag = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&flag);
        let job = Job::spawn("drop-job", move |ctx: &JobContext<()>| {
            while !ctx.cancel_flag().load(Ordering::Relaxed) {
                std::thread::yield_now();
            }
            seen.store(true, Ordering::Relaxed);
        })
        .unwrap();

        drop(job);
        assert!(flag.load(Ordering::Relaxed));
    }
}
