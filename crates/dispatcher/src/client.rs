//! ActorClient - a stateful driver client behind its own dispatch actor

use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

use crate::actor::DispatchActor;
use crate::error::DispatchError;
use crate::metrics::ActorMetrics;
use crate::operation::ExecutionMode;

/// Shared driver client plus the actor serializing calls against it
///
/// `Sync` calls run one at a time in submission order; `Async` calls are
/// started in order and may overlap. The driver client itself is shared, so
/// async calls must only use operations the driver allows concurrently.
pub struct ActorClient<C> {
    client: Arc<C>,
    actor: DispatchActor,
}

impl<C> ActorClient<C>
where
    C: Send + Sync + 'static,
{
    /// Wrap `client` and launch its actor
    pub fn new(name: impl Into<String>, client: C) -> Result<Self, DispatchError> {
        Self::from_arc(name, Arc::new(client))
    }

    /// Wrap an already shared client and launch its actor
    pub fn from_arc(name: impl Into<String>, client: Arc<C>) -> Result<Self, DispatchError> {
        let actor = DispatchActor::spawn(name)?;
        Ok(Self { client, actor })
    }

    /// Direct access to the wrapped client (bypasses serialization)
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn actor(&self) -> &DispatchActor {
        &self.actor
    }

    pub fn metrics(&self) -> &Arc<ActorMetrics> {
        self.actor.metrics()
    }

    /// Run an async call against the client through the actor
    ///
    /// The closure's output is returned once the call has completed; errors
    /// produced by the call travel inside `T`.
    pub async fn execute<F, Fut, T>(&self, mode: ExecutionMode, f: F) -> Result<T, DispatchError>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let fut = f(Arc::clone(&self.client));
        self.actor.run(mode, fut).await
    }

    /// Run a blocking call against the client through the actor
    pub async fn execute_blocking<F, T>(
        &self,
        mode: ExecutionMode,
        f: F,
    ) -> Result<T, DispatchError>
    where
        F: FnOnce(&C) -> T + Send + 'static,
        T: Send + 'static,
    {
        let client = Arc::clone(&self.client);
        self.actor
            .run_blocking(mode, move || f(client.as_ref()))
            .await
    }

    /// Drain queued calls and stop the actor
    #[instrument(name = "actor_client_shutdown", skip(self), fields(actor = %self.actor.name()))]
    pub async fn shutdown(&self) {
        self.actor.shutdown().await;
    }
}
