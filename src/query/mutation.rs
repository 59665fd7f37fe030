//! Write bindings.
//!
//! A mutation runs once. On success, every declared key filter is
//! invalidated before the caller sees the result; on failure nothing is
//! invalidated and nothing is retried.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tracing::{info, warn};

use super::client::QueryClient;
use super::key::KeyFilter;
use crate::telemetry;
use crate::Result;

/// A single write plus the cache keys it makes stale.
pub struct MutationRequest<O> {
    name: &'static str,
    future: BoxFuture<'static, Result<O>>,
    invalidates: Vec<KeyFilter>,
}

impl<O> MutationRequest<O> {
    pub fn new<Fut>(name: &'static str, future: Fut) -> Self
    where
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Self {
            name,
            future: Box::pin(future),
            invalidates: Vec::new(),
        }
    }

    /// Invalidate `filter` once the write succeeds.
    pub fn invalidates(mut self, filter: impl Into<KeyFilter>) -> Self {
        self.invalidates.push(filter.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn invalidations(&self) -> &[KeyFilter] {
        &self.invalidates
    }
}

impl QueryClient {
    /// Run a write, invalidating its declared keys on success.
    pub async fn execute<O>(&self, request: MutationRequest<O>) -> Result<O> {
        let MutationRequest {
            name,
            future,
            invalidates,
        } = request;

        match future.await {
            Ok(output) => {
                let marked: usize = invalidates.into_iter().map(|f| self.invalidate(f)).sum();
                metrics::counter!(telemetry::MUTATIONS_TOTAL,
                    "mutation" => name,
                    "status" => "ok",
                )
                .increment(1);
                info!(mutation = name, invalidated = marked, "mutation succeeded");
                Ok(output)
            }
            Err(e) => {
                metrics::counter!(telemetry::MUTATIONS_TOTAL,
                    "mutation" => name,
                    "status" => "error",
                )
                .increment(1);
                warn!(mutation = name, error = %e, "mutation failed");
                Err(e)
            }
        }
    }
}

/// Progress of a [`Mutation`].
#[derive(Debug, Clone)]
pub enum MutationStatus {
    Idle,
    Pending,
    Succeeded,
    /// Failed with the normalized error message.
    Failed(String),
}

impl MutationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }
}

type Run<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O>> + Send + Sync>;
type Invalidates<I> = Arc<dyn Fn(&I) -> Vec<KeyFilter> + Send + Sync>;

/// A reusable write binding.
///
/// Each [`execute`](Self::execute) builds a [`MutationRequest`] from the input
/// and runs it through the [`QueryClient`]. The latest outcome is observable
/// through [`status`](Self::status) and [`watch`](Self::watch).
pub struct Mutation<I, O> {
    client: QueryClient,
    name: &'static str,
    run: Run<I, O>,
    invalidates: Invalidates<I>,
    status: watch::Sender<MutationStatus>,
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F, Fut>(client: &QueryClient, name: &'static str, run: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        let (status, _) = watch::channel(MutationStatus::Idle);
        Self {
            client: client.clone(),
            name,
            run: Arc::new(move |input| -> BoxFuture<'static, Result<O>> { Box::pin(run(input)) }),
            invalidates: Arc::new(|_: &I| Vec::new()),
            status,
        }
    }

    /// Declare the keys to invalidate, computed from the input.
    pub fn invalidates<F>(mut self, f: F) -> Self
    where
        F: Fn(&I) -> Vec<KeyFilter> + Send + Sync + 'static,
    {
        self.invalidates = Arc::new(f);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Keys a run with `input` would invalidate.
    pub fn invalidations_for(&self, input: &I) -> Vec<KeyFilter> {
        (self.invalidates)(input)
    }

    pub async fn execute(&self, input: I) -> Result<O> {
        self.status.send_replace(MutationStatus::Pending);

        let filters = (self.invalidates)(&input);
        let mut request = MutationRequest::new(self.name, (self.run)(input));
        for filter in filters {
            request = request.invalidates(filter);
        }

        let result = self.client.execute(request).await;
        self.status.send_replace(match &result {
            Ok(_) => MutationStatus::Succeeded,
            Err(e) => MutationStatus::Failed(e.message()),
        });
        result
    }

    pub fn status(&self) -> MutationStatus {
        self.status.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.status.borrow().is_pending()
    }

    pub fn watch(&self) -> watch::Receiver<MutationStatus> {
        self.status.subscribe()
    }

    /// Return to [`MutationStatus::Idle`].
    pub fn reset(&self) {
        self.status.send_replace(MutationStatus::Idle);
    }
}
