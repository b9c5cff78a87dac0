//! Periodic tasks and the shared shutdown latch

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::Result;

/// Set once on shutdown; every periodic task checks it before re-arming
#[derive(Debug, Clone, Default)]
pub struct ShutdownLatch(Arc<AtomicBool>);

impl ShutdownLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        if !self.0.swap(true, Ordering::SeqCst) {
            log::debug!("Shutdown latch set");
        }
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A tick run on its own named thread.
///
/// The next tick is scheduled only after the current one returns, so ticks of
/// one task never overlap. An in-flight tick is never interrupted.
pub struct PeriodicTask {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn spawn<F>(
        name: &str,
        interval: Duration,
        latch: ShutdownLatch,
        mut tick: F,
    ) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let thread_name = name.to_string();
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                log::debug!("{} started, interval {:?}", thread_name, interval);
                while !latch.is_set() {
                    tick();
                    if latch.is_set() {
                        break;
                    }
                    thread::sleep(interval);
                }
                log::debug!("{} stopped", thread_name);
            })?;

        Ok(Self {
            name: name.to_string(),
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the thread to exit. Set the latch first or this blocks forever.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Periodic task '{}' panicked", self.name);
            }
        }
    }
}
