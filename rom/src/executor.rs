// Licensed under the Apache-2.0 license

//! Execution contexts for the install copy.
//!
//! The caller always blocks until the job has finished; an executor only
//! decides which stack the copy runs on.

use crate::error::UcErrorCode;

pub trait CopyExecutor {
    /// Runs `job` to completion and returns its result. Failing to start
    /// the execution context yields `CannotStartThread`.
    fn execute<F>(&self, job: F) -> Result<(), UcErrorCode>
    where
        F: FnOnce() -> Result<(), UcErrorCode> + Send;
}

/// Runs the copy on the caller's stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl CopyExecutor for InlineExecutor {
    fn execute<F>(&self, job: F) -> Result<(), UcErrorCode>
    where
        F: FnOnce() -> Result<(), UcErrorCode> + Send,
    {
        job()
    }
}

#[cfg(any(test, feature = "std"))]
pub use thread::ThreadExecutor;

#[cfg(any(test, feature = "std"))]
mod thread {
    use super::CopyExecutor;
    use crate::error::UcErrorCode;
    use log::error;
    use std::thread;

    pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

    /// Runs the copy on a dedicated scoped worker thread and joins it.
    #[derive(Debug, Clone)]
    pub struct ThreadExecutor {
        name: &'static str,
        stack_size: usize,
    }

    impl Default for ThreadExecutor {
        fn default() -> Self {
            Self::new("fw-install", DEFAULT_STACK_SIZE)
        }
    }

    impl ThreadExecutor {
        pub fn new(name: &'static str, stack_size: usize) -> Self {
            ThreadExecutor { name, stack_size }
        }
    }

    impl CopyExecutor for ThreadExecutor {
        fn execute<F>(&self, job: F) -> Result<(), UcErrorCode>
        where
            F: FnOnce() -> Result<(), UcErrorCode> + Send,
        {
            thread::scope(|scope| {
                let worker = thread::Builder::new()
                    .name(self.name.into())
                    .stack_size(self.stack_size)
                    .spawn_scoped(scope, job)
                    .map_err(|err| {
                        error!("[executor] cannot start {}: {}", self.name, err);
                        UcErrorCode::CannotStartThread
                    })?;
                worker.join().unwrap_or_else(|_| {
                    error!("[executor] {} panicked", self.name);
                    Err(UcErrorCode::Unknown)
                })
            })
        }
    }
}
