use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use flowquery_events::{Event, EventBus, EventEnvelope, RuntimeEvent, Subscription};

use crate::dispatcher::QueryEventDispatcher;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Drains a bus subscription into a [`QueryEventDispatcher`] on its own thread.
///
/// - Handler failures are logged and the loop moves on (no retries)
/// - Stops on shutdown request or when the bus goes away
#[derive(Debug)]
pub struct ProjectionWorker;

impl ProjectionWorker {
    /// Subscribe to `bus` and spawn the worker thread.
    ///
    /// The subscription is taken before this returns, so every message
    /// published afterwards reaches the worker.
    pub fn spawn<B>(
        name: &'static str,
        bus: B,
        dispatcher: Arc<QueryEventDispatcher>,
    ) -> io::Result<WorkerHandle>
    where
        B: EventBus<EventEnvelope<RuntimeEvent>> + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &dispatcher))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop(
    name: &'static str,
    sub: Subscription<EventEnvelope<RuntimeEvent>>,
    shutdown_rx: mpsc::Receiver<()>,
    dispatcher: &QueryEventDispatcher,
) {
    let tick = Duration::from_millis(250);

    loop {
        // Shutdown check (non-blocking)
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(envelope) => {
                if let Err(err) = dispatcher.dispatch(&envelope) {
                    warn!(
                        worker = name,
                        event_type = envelope.payload().event_type(),
                        event_id = %envelope.event_id(),
                        error = %err,
                        "projection worker handler failed"
                    );
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker = name, "projection worker stopped");
}
