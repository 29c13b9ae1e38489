//! Background task runner with cooperative cancellation
//!
//! Runs one unit of work on its own thread so an interactive caller stays
//! responsive. Cancellation only sets a flag: the work polls it between
//! steps, and a subprocess already running is left to finish (bounded by
//! the shell timeout). Once a task is cancelled, neither callback fires.

use crate::error::Cancelled;
use anyhow::{anyhow, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Shared cancel flag. Clones observe the same flag; it never resets.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Checkpoint for cooperative tasks
    pub fn check_cancelled(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

pub type DoneCallback<T> = Box<dyn FnOnce(T) + Send + 'static>;
pub type ErrorCallback = Box<dyn FnOnce(anyhow::Error) + Send + 'static>;

type Work<T> = Box<dyn FnOnce(&CancellationToken) -> Result<T> + Send + 'static>;

/// A unit of work plus its completion callbacks, not yet started
pub struct BackgroundTask<T> {
    work: Work<T>,
    on_done: Option<DoneCallback<T>>,
    on_error: Option<ErrorCallback>,
    token: CancellationToken,
}

impl<T: Send + 'static> BackgroundTask<T> {
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
    {
        Self {
            work: Box::new(work),
            on_done: None,
            on_error: None,
            token: CancellationToken::new(),
        }
    }

    pub fn on_done<F>(mut self, f: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.on_done = Some(Box::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnOnce(anyhow::Error) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Token the work will observe; cancel it to suppress the callbacks
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Launch the work on a dedicated thread
    pub fn start(self) -> TaskHandle {
        let BackgroundTask {
            work,
            on_done,
            on_error,
            token,
        } = self;
        let task_token = token.clone();

        let handle = thread::spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(&task_token)))
                .unwrap_or_else(|_| Err(anyhow!("Background task panicked")));

            if task_token.is_cancelled() {
                debug!("Background task finished after cancellation; callbacks suppressed");
                return;
            }

            match outcome {
                Ok(value) => {
                    if let Some(done) = on_done {
                        done(value);
                    }
                }
                Err(e) if e.downcast_ref::<Cancelled>().is_some() => {
                    debug!("Background task stopped at a cancellation checkpoint");
                }
                Err(e) => {
                    if let Some(on_error) = on_error {
                        on_error(e);
                    }
                }
            }
        });

        TaskHandle {
            token,
            handle: Some(handle),
        }
    }
}

/// Handle to a started task
pub struct TaskHandle {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Request cancellation. The running work stops at its next checkpoint.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Non-blocking completion check
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Block until the task thread (including callbacks) has finished
    pub fn join(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("Background task thread panicked")),
            None => Ok(()),
        }
    }
}

/// Run `work` in the background with optional completion callbacks
pub fn run_background<T, F>(
    work: F,
    on_done: Option<DoneCallback<T>>,
    on_error: Option<ErrorCallback>,
) -> TaskHandle
where
    T: Send + 'static,
    F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
{
    let mut task = BackgroundTask::new(work);
    task.on_done = on_done;
    task.on_error = on_error;
    task.start()
}
