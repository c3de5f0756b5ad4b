use std::fmt;
use std::io;
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info};

/// Background thread invoking a poll cycle once per interval until stopped.
pub struct TransmissionScheduler {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<usize>>,
}

impl TransmissionScheduler {
    /// Starts the ticking thread. `init` runs on that thread and builds the
    /// tick closure, so blocking clients are created off any async runtime.
    pub fn spawn<G, F, E>(interval: Duration, init: G) -> io::Result<Self>
    where
        G: FnOnce() -> Result<F, E> + Send + 'static,
        F: FnMut(),
        E: fmt::Display,
    {
        let (stop_tx, stop_rx) = channel::<()>();

        let handle = thread::Builder::new()
            .name("outbox-transmitter".to_string())
            .spawn(move || {
                let mut tick = match init() {
                    Ok(tick) => tick,
                    Err(e) => {
                        error!("Outbox transmitter failed to start: {}", e);
                        return 0;
                    }
                };
                info!("Outbox transmitter polling every {:?}", interval);

                let mut ticks = 0;
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {
                            tick();
                            ticks += 1;
                        }
                    }
                }
                ticks
            })?;

        Ok(Self {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Signals the thread and waits for it, returning how many ticks ran.
    pub fn stop(mut self) -> usize {
        let _ = self.stop_tx.send(());
        self.handle
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }
}

impl Drop for TransmissionScheduler {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
