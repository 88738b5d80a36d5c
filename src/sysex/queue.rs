//! Serialised delivery of parameter updates.
//!
//! Every update is handed to one worker thread over a FIFO channel. The worker
//! completes an update (all of its messages and pauses) before taking the
//! next, so multi-message updates from different callers never interleave on
//! the wire.

use super::connection::SysexConnection;
use super::parameters::{lookup_parameter, validate_value};
use crate::error::{Error, Result};
use crate::midi::output::SysexOutput;
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

struct SendRequest {
    parameter: String,
    value: i32,
    reply: Sender<Result<()>>,
}

/// Completion handle for one queued update
#[derive(Debug)]
pub struct SendTicket {
    rx: Receiver<Result<()>>,
}

impl SendTicket {
    /// Blocks until the worker has finished (or abandoned) this update
    pub fn wait(self) -> Result<()> {
        self.rx.recv().unwrap_or(Err(Error::QueueClosed))
    }

    pub fn try_result(&self) -> Option<Result<()>> {
        self.rx.try_recv().ok()
    }
}

pub struct SendQueue<O: SysexOutput + 'static = Box<dyn SysexOutput>> {
    connection: Arc<Mutex<SysexConnection<O>>>,
    tx: Option<Sender<SendRequest>>,
    worker: Option<JoinHandle<()>>,
    pending: Arc<AtomicUsize>,
    closing: Arc<AtomicBool>,
    connected: AtomicBool,
}

impl<O: SysexOutput + 'static> SendQueue<O> {
    /// Takes ownership of `connection` and starts the worker thread
    pub fn new(connection: SysexConnection<O>) -> Self {
        let connected = AtomicBool::new(connection.is_connected());
        let connection = Arc::new(Mutex::new(connection));
        let pending = Arc::new(AtomicUsize::new(0));
        let closing = Arc::new(AtomicBool::new(false));
        let (tx, rx) = unbounded();

        let worker = {
            let connection = Arc::clone(&connection);
            let pending = Arc::clone(&pending);
            let closing = Arc::clone(&closing);
            thread::spawn(move || drain(rx, connection, pending, closing))
        };

        Self {
            connection,
            tx: Some(tx),
            worker: Some(worker),
            pending,
            closing,
            connected,
        }
    }

    /// Runs `f` with exclusive access to the connection. Waits for an
    /// in-flight update to finish first.
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut SysexConnection<O>) -> R) -> R {
        let mut connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut connection);
        self.connected.store(connection.is_connected(), Ordering::SeqCst);
        result
    }

    pub fn connect(&self, output: Option<O>) -> Result<()> {
        self.with_connection(|c| c.connect(output))
    }

    pub fn disconnect(&self) {
        self.with_connection(|c| c.disconnect())
    }

    /// Does not wait for an in-flight update
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Validates the update and appends it to the queue. A missing output,
    /// unknown parameters and bad values are rejected here, in that order,
    /// before anything is queued.
    pub fn enqueue(&self, parameter: &str, value: i32) -> Result<SendTicket> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let descriptor = lookup_parameter(parameter)?;
        validate_value(descriptor, value)?;

        let tx = self.tx.as_ref().ok_or(Error::QueueClosed)?;
        let (reply, rx) = bounded(1);
        self.pending.fetch_add(1, Ordering::SeqCst);
        let request = SendRequest {
            parameter: parameter.to_string(),
            value,
            reply,
        };
        if tx.send(request).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::QueueClosed);
        }
        debug!("Queued {}={}", parameter, value);
        Ok(SendTicket { rx })
    }

    /// Queues the update and waits for its outcome
    pub fn send(&self, parameter: &str, value: i32) -> Result<()> {
        self.enqueue(parameter, value)?.wait()
    }

    /// Updates queued or in flight
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Stops accepting updates, abandons queued ones with `QueueClosed` and
    /// joins the worker once the in-flight update is done
    pub fn shutdown(&mut self) {
        self.closing.store(true, Ordering::SeqCst);
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("SysEx queue worker panicked");
            }
            info!("SysEx send queue stopped");
        }
    }
}

impl<O: SysexOutput + 'static> Drop for SendQueue<O> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn drain<O: SysexOutput>(
    rx: Receiver<SendRequest>,
    connection: Arc<Mutex<SysexConnection<O>>>,
    pending: Arc<AtomicUsize>,
    closing: Arc<AtomicBool>,
) {
    for request in rx.iter() {
        let result = if closing.load(Ordering::SeqCst) {
            Err(Error::QueueClosed)
        } else {
            let mut connection = connection.lock().unwrap_or_else(PoisonError::into_inner);
            connection.send(&request.parameter, request.value)
        };
        pending.fetch_sub(1, Ordering::SeqCst);
        // The caller may have dropped its ticket
        let _ = request.reply.send(result);
    }
}
