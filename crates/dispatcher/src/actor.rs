//! DispatchActor - single-consumer loop serializing operations

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument};

use crate::error::DispatchError;
use crate::metrics::ActorMetrics;
use crate::operation::{ExecutionMode, Operation};

/// Operation plus the acceptance handshake of its submitter
struct Envelope {
    operation: Operation,
    accepted: oneshot::Sender<()>,
}

enum Control {
    /// Exit without running queued operations
    Stop(oneshot::Sender<()>),
    /// Close intake, run queued operations, wait for async ones, exit
    Drain(oneshot::Sender<()>),
}

type Receivers = (mpsc::Receiver<Envelope>, mpsc::Receiver<Control>);

/// Actor owning one logical thread of control
///
/// At most one synchronous operation runs at a time. Submission is a
/// rendezvous: `submit` returns once the loop has received the operation.
pub struct DispatchActor {
    name: String,
    op_tx: mpsc::Sender<Envelope>,
    control_tx: mpsc::Sender<Control>,
    /// Receivers waiting for `launch`
    pending: Mutex<Option<Receivers>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<ActorMetrics>,
}

impl DispatchActor {
    /// Create an actor; nothing runs until `launch`
    pub fn new(name: impl Into<String>) -> Self {
        let (op_tx, op_rx) = mpsc::channel(1);
        let (control_tx, control_rx) = mpsc::channel(1);

        Self {
            name: name.into(),
            op_tx,
            control_tx,
            pending: Mutex::new(Some((op_rx, control_rx))),
            worker: Mutex::new(None),
            metrics: Arc::new(ActorMetrics::new()),
        }
    }

    /// Create and launch an actor
    pub fn spawn(name: impl Into<String>) -> Result<Self, DispatchError> {
        let actor = Self::new(name);
        actor.launch()?;
        Ok(actor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<ActorMetrics> {
        &self.metrics
    }

    pub fn is_launched(&self) -> bool {
        lock(&self.worker).is_some()
    }

    /// Start the processing loop
    ///
    /// # Errors
    /// `AlreadyLaunched` on a second call; the loop is the only consumer.
    pub fn launch(&self) -> Result<(), DispatchError> {
        let (op_rx, control_rx) =
            lock(&self.pending)
                .take()
                .ok_or_else(|| DispatchError::AlreadyLaunched {
                    actor: self.name.clone(),
                })?;

        let name = self.name.clone();
        let metrics = Arc::clone(&self.metrics);
        let handle = tokio::spawn(async move {
            actor_loop(name, op_rx, control_rx, metrics).await;
        });
        *lock(&self.worker) = Some(handle);

        info!(actor = %self.name, "Dispatch actor launched");
        Ok(())
    }

    /// Hand an operation to the actor
    ///
    /// Returns once the loop has accepted it, not when it completes.
    ///
    /// # Errors
    /// `Stopped` if the actor stopped before accepting the operation; the
    /// operation is then never executed.
    pub async fn submit(&self, operation: Operation) -> Result<(), DispatchError> {
        let (accepted_tx, accepted_rx) = oneshot::channel();
        let envelope = Envelope {
            operation,
            accepted: accepted_tx,
        };

        self.op_tx
            .send(envelope)
            .await
            .map_err(|_| DispatchError::stopped(&self.name))?;

        accepted_rx
            .await
            .map_err(|_| DispatchError::stopped(&self.name))
    }

    /// Submit an async callback and wait for its output
    pub async fn run<F, T>(&self, mode: ExecutionMode, fut: F) -> Result<T, DispatchError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let (operation, completion) = Operation::future(mode, async move {
            let _ = result_tx.send(fut.await);
        });

        self.submit(operation).await?;
        completion.wait().await?;
        result_rx.await.map_err(|_| DispatchError::CallbackPanicked {
            actor: self.name.clone(),
        })
    }

    /// Submit a blocking callback and wait for its output
    pub async fn run_blocking<F, T>(&self, mode: ExecutionMode, f: F) -> Result<T, DispatchError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let (operation, completion) = Operation::blocking(mode, move || {
            let _ = result_tx.send(f());
        });

        self.submit(operation).await?;
        completion.wait().await?;
        result_rx.await.map_err(|_| DispatchError::CallbackPanicked {
            actor: self.name.clone(),
        })
    }

    /// Request termination without draining
    ///
    /// Waits for the loop's acknowledgement; no operation starts afterwards.
    /// Operations still queued are discarded and their submitters get `Stopped`.
    /// Async operations already started keep running and still complete.
    #[instrument(name = "dispatch_actor_stop", skip(self), fields(actor = %self.name))]
    pub async fn stop(&self) {
        self.terminate(Control::Stop).await;
    }

    /// Close intake, run every queued operation, wait for async ones, exit
    #[instrument(name = "dispatch_actor_shutdown", skip(self), fields(actor = %self.name))]
    pub async fn shutdown(&self) {
        if lock(&self.pending).is_some() {
            // Never launched: queued submitters are still owed an execution
            if let Err(e) = self.launch() {
                debug!(actor = %self.name, error = %e, "Launch during shutdown skipped");
            }
        }
        self.terminate(Control::Drain).await;
    }

    async fn terminate(&self, control: fn(oneshot::Sender<()>) -> Control) {
        if lock(&self.pending).take().is_some() {
            debug!(actor = %self.name, "Actor stopped before launch");
            return;
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        if self.control_tx.send(control(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }

        let worker = lock(&self.worker).take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                error!(actor = %self.name, error = ?e, "Actor loop panicked");
            }
        }
        debug!(actor = %self.name, "Dispatch actor stopped");
    }
}

/// Processing loop: the single consumer of the submission channel
#[instrument(name = "dispatch_actor_loop", skip(op_rx, control_rx, metrics), fields(actor = %name))]
async fn actor_loop(
    name: String,
    mut op_rx: mpsc::Receiver<Envelope>,
    mut control_rx: mpsc::Receiver<Control>,
    metrics: Arc<ActorMetrics>,
) {
    debug!(actor = %name, "Actor loop started");
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            // Control first: a stop requested while an operation ran beats the queue
            biased;

            control = control_rx.recv() => {
                match control {
                    Some(Control::Stop(ack)) => {
                        tasks.detach_all();
                        let _ = ack.send(());
                        break;
                    }
                    Some(Control::Drain(ack)) => {
                        op_rx.close();
                        while let Some(envelope) = op_rx.recv().await {
                            dispatch(&name, envelope, &metrics, &mut tasks).await;
                        }
                        while tasks.join_next().await.is_some() {}
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        tasks.detach_all();
                        break;
                    }
                }
            }
            envelope = op_rx.recv() => {
                match envelope {
                    Some(envelope) => dispatch(&name, envelope, &metrics, &mut tasks).await,
                    None => {
                        tasks.detach_all();
                        break;
                    }
                }
            }
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    debug!(
        actor = %name,
        accepted = metrics.accepted(),
        completed = metrics.completed(),
        "Actor loop stopped"
    );
}

async fn dispatch(
    name: &str,
    envelope: Envelope,
    metrics: &Arc<ActorMetrics>,
    tasks: &mut JoinSet<()>,
) {
    let Envelope {
        operation,
        accepted,
    } = envelope;

    let asynchronous = operation.is_asynchronous();
    metrics.inc_accepted(asynchronous);
    let _ = accepted.send(());

    if asynchronous {
        let name = name.to_string();
        let metrics = Arc::clone(metrics);
        tasks.spawn(async move {
            operation.execute(&name, &metrics).await;
        });
    } else {
        operation.execute(name, metrics).await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
