//! Main-thread dispatcher: serializes work onto the FreeCAD UI thread.
//!
//! FreeCAD's document model may only be mutated from the thread running
//! the Qt event loop. The dispatcher is the single funnel: transports on
//! any thread submit jobs into a bounded queue; the queue is drained by
//! [`DispatcherPump::tick`], which the embedding calls from a GUI timer
//! (every 50 ms by default), or by [`DispatcherPump::run`] on a dedicated
//! worker thread in headless sessions.
//!
//! There is no true cancellation. A job whose caller timed out keeps
//! running on the pump until it finishes; its reply lands in a closed
//! oneshot and is discarded. Interrupting the interpreter mid-operation
//! would corrupt the document model, so abandonment is the contract.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default bound for the request queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Default GUI pump tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Sending half: submit jobs from any thread or task.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Job>,
    capacity: usize,
}

/// Receiving half: drains the queue on the UI thread.
pub struct DispatcherPump {
    rx: mpsc::Receiver<Job>,
}

/// Create a connected dispatcher/pump pair with a bounded queue.
pub fn channel(capacity: usize) -> (Dispatcher, DispatcherPump) {
    let (tx, rx) = mpsc::channel::<Job>(capacity);
    (Dispatcher { tx, capacity }, DispatcherPump { rx })
}

impl Dispatcher {
    /// Run `f` on the UI thread, waiting up to `timeout` for its result.
    ///
    /// Fails with [`Error::Overloaded`] when the queue is full and with
    /// [`Error::Timeout`] when the deadline passes first. On timeout the
    /// job is abandoned: it still runs to completion on the pump, but its
    /// result is dropped.
    pub async fn submit<T, F>(&self, f: F, timeout: Duration) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel::<T>();

        let job: Job = Box::new(move || {
            // Receiver may be gone if the caller timed out; that is the
            // documented abandonment path.
            let _ = reply_tx.send(f());
        });

        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::Overloaded {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => {
                Error::Internal("dispatcher pump has shut down".to_string())
            }
        })?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(Error::Internal(
                "dispatcher dropped job without reply".to_string(),
            )),
            Err(_) => {
                warn!(
                    "Job abandoned after {}ms; it continues in the background",
                    timeout.as_millis()
                );
                Err(Error::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Queue capacity the dispatcher was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl DispatcherPump {
    /// Drain all pending jobs, running each to completion.
    ///
    /// Call from the GUI timer. Returns the number of jobs executed.
    pub fn tick(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Pump loop for headless sessions: park until work arrives, run it,
    /// repeat. Returns once every `Dispatcher` clone is dropped.
    ///
    /// Must run on a plain OS thread, never inside the async runtime.
    pub fn run(mut self) {
        while let Some(job) = self.rx.blocking_recv() {
            job();
            // Drain whatever queued while the job ran.
            self.tick();
        }
        debug!("Dispatcher closed, pump exiting");
    }

    /// Spawn the headless pump on its own OS thread.
    pub fn spawn(self) -> std::thread::JoinHandle<()> {
        std::thread::Builder::new()
            .name("freecad-bridge-pump".to_string())
            .spawn(move || self.run())
            .expect("failed to spawn dispatcher pump thread")
    }
}
