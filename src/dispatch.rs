// SPDX-License-Identifier: MPL-2.0

//! Worker / UI hand-off
//!
//! Work is submitted to the tokio runtime; its outcome is mapped to a UI
//! event and queued on a channel that only the UI loop drains. The GUI gets
//! the same pairing from `Task::perform`; this is for loops that are not
//! driven by libcosmic.

use std::future::Future;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::warn;

/// Submits work to the worker context and marshals results back
pub struct Dispatcher<E> {
    handle: Handle,
    tx: mpsc::UnboundedSender<E>,
}

impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<E: Send + 'static> Dispatcher<E> {
    /// Create a dispatcher and the receiver the UI loop drains
    pub fn new(handle: Handle) -> (Self, mpsc::UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { handle, tx }, rx)
    }

    /// Run `work` on the runtime and deliver `to_event(output)` to the UI loop
    pub fn submit<F, M>(&self, work: F, to_event: M)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
        M: FnOnce(F::Output) -> E + Send + 'static,
    {
        let tx = self.tx.clone();
        self.handle.spawn(async move {
            let output = work.await;
            if tx.send(to_event(output)).is_err() {
                warn!("UI loop gone, dropping event");
            }
        });
    }

    /// Queue an event for the UI loop without doing any work
    pub fn post(&self, event: E) {
        if self.tx.send(event).is_err() {
            warn!("UI loop gone, dropping event");
        }
    }
}
