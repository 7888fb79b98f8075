//! Operation - one unit of work submitted to a `DispatchActor`

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::oneshot;
use tracing::error;

use crate::error::DispatchError;
use crate::metrics::ActorMetrics;

/// Boxed callback future
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Work carried by an operation
pub enum Callback {
    /// Async driver call
    Future(BoxFuture),
    /// Blocking driver call, run on the blocking pool
    Blocking(Box<dyn FnOnce() + Send + 'static>),
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Future(_) => f.write_str("Callback::Future"),
            Self::Blocking(_) => f.write_str("Callback::Blocking"),
        }
    }
}

/// How the actor runs an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Exclusive: the actor services nothing else until the callback returns
    #[default]
    Sync,
    /// Fire-and-forget: started on its own task, completion still signalled
    Async,
}

/// One unit of work
///
/// Created together with its `Completion`; the completion fires exactly once,
/// after the callback has returned, whatever the mode.
#[derive(Debug)]
pub struct Operation {
    mode: ExecutionMode,
    callback: Callback,
    completion: oneshot::Sender<()>,
}

impl Operation {
    pub fn new(mode: ExecutionMode, callback: Callback) -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        let op = Self {
            mode,
            callback,
            completion: tx,
        };
        (op, Completion { rx })
    }

    /// Operation running an async callback
    pub fn future<F>(mode: ExecutionMode, fut: F) -> (Self, Completion)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self::new(mode, Callback::Future(Box::pin(fut)))
    }

    /// Operation running a blocking callback
    pub fn blocking<F>(mode: ExecutionMode, f: F) -> (Self, Completion)
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(mode, Callback::Blocking(Box::new(f)))
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn is_asynchronous(&self) -> bool {
        self.mode == ExecutionMode::Async
    }

    /// Run the callback to completion, then signal
    ///
    /// The callback runs on its own task so a panic is contained; completion
    /// is signalled either way.
    pub(crate) async fn execute(self, actor: &str, metrics: &ActorMetrics) {
        let outcome = match self.callback {
            Callback::Future(fut) => tokio::spawn(fut).await,
            Callback::Blocking(f) => tokio::task::spawn_blocking(f).await,
        };

        if let Err(e) = outcome {
            metrics.inc_panicked();
            error!(actor = %actor, error = %e, "Operation callback panicked");
        }
        metrics.inc_completed();

        // Receiver may be gone: the submitter did not wait for completion
        let _ = self.completion.send(());
    }
}

/// Completion signal of one operation
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<()>,
}

impl Completion {
    /// Wait until the callback has returned
    ///
    /// # Errors
    /// `Discarded` when the operation was dropped without running
    /// (e.g. still queued when the actor stopped).
    pub async fn wait(self) -> Result<(), DispatchError> {
        self.rx.await.map_err(|_| DispatchError::Discarded)
    }
}
