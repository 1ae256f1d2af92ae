//! Delayed group writes
//!
//! With a write delay active, mutations do not touch the disk. They stamp
//! their group's name into a dirty map with a deadline of now + delay, so a
//! burst of writes against one group costs exactly one file rewrite, delay
//! seconds after the burst ends. A single background thread wakes every
//! delay interval, rewrites the groups whose deadline has passed, and goes
//! back to sleep.
//!
//! Failed flushes stay dirty (they are retried on the next tick) and park
//! their error for the next mutation on the table to return. Stopping the
//! writer signals the thread, waits for it to acknowledge by exiting, and
//! then flushes everything still dirty regardless of deadlines.

use parking_lot::Mutex;
use sheaf_core::{Result, SheafError};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Rewrites one named group from the table's current contents. Re-acquires
/// the table lock, so it must never be called while the lock is held.
pub(crate) type WriteGroupFn = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

struct DirtyState {
    delay: Duration,
    /// Group name -> flush deadline.
    dirty: Mutex<HashMap<String, Instant>>,
    /// Latest deferred flush error; taken by the next mutation.
    last_error: Mutex<Option<SheafError>>,
}

/// Handle to the background flush thread, owned by the table core.
pub(crate) struct DelayedWriter {
    state: Arc<DirtyState>,
    stop_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
    write_group: WriteGroupFn,
}

impl DelayedWriter {
    /// Start the flush thread with the given quiescence interval.
    pub(crate) fn spawn(delay: Duration, write_group: WriteGroupFn) -> Self {
        let state = Arc::new(DirtyState {
            delay,
            dirty: Mutex::new(HashMap::new()),
            last_error: Mutex::new(None),
        });
        let (stop_tx, stop_rx) = mpsc::channel();

        let thread_state = Arc::clone(&state);
        let thread_write = Arc::clone(&write_group);
        let handle = std::thread::Builder::new()
            .name("sheaf-flush".into())
            .spawn(move || flush_loop(&thread_state, thread_write.as_ref(), &stop_rx))
            .expect("failed to spawn flush thread");

        debug!(delay_ms = delay.as_millis() as u64, "delayed writer started");
        DelayedWriter {
            state,
            stop_tx,
            handle: Some(handle),
            write_group,
        }
    }

    /// Record that `name`'s group changed, pushing its deadline out to
    /// now + delay. Returns the parked error of an earlier failed flush,
    /// if any — this is how deferred write failures reach the caller.
    pub(crate) fn mark(&self, name: String) -> Result<()> {
        self.state
            .dirty
            .lock()
            .insert(name, Instant::now() + self.state.delay);
        match self.state.last_error.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Stop the thread, wait for it to exit, then synchronously flush
    /// every group still dirty — deadlines no longer matter. Flush
    /// failures are logged, not propagated: there is no later write to
    /// attach them to.
    pub(crate) fn stop(mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        let names: Vec<String> = self.state.dirty.lock().keys().cloned().collect();
        for name in names {
            match (self.write_group.as_ref())(&name) {
                Ok(()) => {
                    self.state.dirty.lock().remove(&name);
                }
                Err(err) => warn!(group = %name, error = %err, "flush on stop failed"),
            }
        }
        debug!("delayed writer stopped");
    }
}

impl Drop for DelayedWriter {
    // Backstop for a table dropped without shutdown: stop the thread, but
    // no drain — the table behind the flush closure is already gone.
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.stop_tx.send(());
            let _ = handle.join();
        }
    }
}

fn flush_loop(
    state: &DirtyState,
    write_group: &(dyn Fn(&str) -> Result<()> + Send + Sync),
    stop_rx: &Receiver<()>,
) {
    loop {
        match stop_rx.recv_timeout(state.delay) {
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                let due: Vec<String> = state
                    .dirty
                    .lock()
                    .iter()
                    .filter(|&(_, deadline)| now >= *deadline)
                    .map(|(name, _)| name.clone())
                    .collect();

                for name in due {
                    match write_group(&name) {
                        Ok(()) => {
                            state.dirty.lock().remove(&name);
                        }
                        Err(err) => {
                            // Keep the group dirty for the next tick and
                            // park the error for the next mutation.
                            warn!(group = %name, error = %err, "delayed flush failed");
                            *state.last_error.lock() = Some(err);
                        }
                    }
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
