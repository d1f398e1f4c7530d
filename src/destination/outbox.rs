//! Bounded delivery queue with a single cancellable worker.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::provider::MessageSender;

use super::{LifecycleError, SubmitError};

type SharedReceiver<M> = Arc<tokio::sync::Mutex<mpsc::Receiver<M>>>;

/// A bounded FIFO queue drained by at most one worker task.
///
/// Any number of producers may [`push`](Self::push) concurrently; pushing
/// never waits and fails with [`SubmitError::QueueFull`] when the queue is
/// saturated. The worker hands each message to the [`MessageSender`] in
/// arrival order, logs the outcome and moves on.
///
/// # Lifecycle
///
/// `start` and `stop` are serialized by a lock around the worker slot.
/// Restarting cancels the previous worker without waiting for it; the new
/// worker only begins receiving once the previous one has released the
/// queue, so a message is never handed to two workers.
///
/// Stopping is lossy: messages still queued when the worker observes
/// cancellation stay in the queue untouched. They are delivered if the
/// outbox is started again and lost if it is dropped.
pub struct Outbox<S: MessageSender> {
    label: String,
    sender: Arc<S>,
    tx: mpsc::Sender<S::Message>,
    rx: SharedReceiver<S::Message>,
    worker: Mutex<Option<WorkerHandle>>,
}

/// Handle to a running or cancelled worker task.
///
/// Returned by [`Outbox::shutdown`] for callers that need to know the
/// worker has actually exited.
#[derive(Debug)]
pub struct WorkerHandle {
    label: String,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signals the worker to stop after its current delivery.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the worker task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the worker task to exit.
    ///
    /// Does not cancel by itself; call [`cancel`](Self::cancel) first or
    /// obtain the handle from [`Outbox::shutdown`].
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::WorkerPanicked`] if the task panicked.
    pub async fn wait(self) -> Result<(), LifecycleError> {
        self.task
            .await
            .map_err(|e| LifecycleError::WorkerPanicked {
                destination: self.label,
                reason: e.to_string(),
            })
    }
}

impl<S: MessageSender> Outbox<S> {
    /// Creates a stopped outbox with the given capacity.
    ///
    /// `label` names the owning destination in logs and errors.
    pub fn new(label: impl Into<String>, sender: S, capacity: NonZeroUsize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.get());

        Self {
            label: label.into(),
            sender: Arc::new(sender),
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            worker: Mutex::new(None),
        }
    }

    /// Returns the sender messages are delivered through.
    #[must_use]
    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Maximum number of queued messages.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Number of messages waiting in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Returns true if no message is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a message without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::QueueFull`] if there is no free slot.
    pub fn push(&self, message: S::Message) -> Result<(), SubmitError> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SubmitError::QueueFull {
                destination: self.label.clone(),
                capacity: self.capacity(),
            },
            TrySendError::Closed(_) => SubmitError::QueueClosed {
                destination: self.label.clone(),
            },
        })
    }

    /// Spawns a worker, replacing (and cancelling) any running one.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NoRuntime`] outside a Tokio runtime.
    pub fn start(&self) -> Result<(), LifecycleError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| LifecycleError::NoRuntime)?;
        let mut slot = self.lock_slot();

        if let Some(previous) = slot.take() {
            tracing::debug!("Restarting worker of destination '{}'", self.label);
            previous.cancel();
        }

        let token = CancellationToken::new();
        let task = runtime.spawn(run_worker(
            self.label.clone(),
            Arc::clone(&self.sender),
            Arc::clone(&self.rx),
            token.clone(),
        ));

        *slot = Some(WorkerHandle {
            label: self.label.clone(),
            token,
            task,
        });

        Ok(())
    }

    /// Cancels the running worker, if any, without waiting for it.
    pub fn stop(&self) {
        self.shutdown();
    }

    /// Cancels the running worker and returns its handle.
    ///
    /// Returns `None` if no worker was running.
    pub fn shutdown(&self) -> Option<WorkerHandle> {
        let handle = self.lock_slot().take()?;
        handle.cancel();
        tracing::debug!("Stop requested for destination '{}'", self.label);
        Some(handle)
    }

    /// Returns true if a worker is assigned and has not exited.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // A panic while holding the slot cannot leave it inconsistent.
    fn lock_slot(&self) -> MutexGuard<'_, Option<WorkerHandle>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: MessageSender> Drop for Outbox<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_slot().take() {
            handle.cancel();
        }
    }
}

impl<S: MessageSender> std::fmt::Debug for Outbox<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("label", &self.label)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn run_worker<S: MessageSender>(
    label: String,
    sender: Arc<S>,
    queue: SharedReceiver<S::Message>,
    token: CancellationToken,
) {
    let mut receiver = tokio::select! {
        biased;
        () = token.cancelled() => return,
        guard = queue.lock() => guard,
    };

    tracing::info!("Worker of destination '{label}' started");

    loop {
        let message = tokio::select! {
            biased;
            () = token.cancelled() => break,
            received = receiver.recv() => match received {
                Some(message) => message,
                None => break,
            },
        };

        match sender.send(&message).await {
            Ok(()) => {
                tracing::info!("Delivered message to destination '{label}'");
                tracing::debug!("Delivered message: {message:?}");
            }
            Err(e) => tracing::error!("Failed to deliver message to destination '{label}': {e}"),
        }
    }

    tracing::info!(
        "Worker of destination '{label}' stopped with {} message(s) left in queue",
        receiver.len()
    );
}
