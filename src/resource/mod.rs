//! Cached reads of remote endpoints exposing `{data, loading, error}`.
//!
//! Refetching is stale-while-revalidate: while a refetch is in flight the
//! previous `data` (or `error`) stays readable and only `loading` flips. Once a
//! fetch settles exactly one of `data` and `error` is set; they are never both
//! present.

pub mod catalog;

use crate::error::TransportError;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct ResourceState<T> {
    data: Option<Arc<T>>,
    loading: bool,
    error: Option<String>,
}

impl<T> ResourceState<T> {
    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    pub fn shared_data(&self) -> Option<Arc<T>> {
        self.data.clone()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl<T> Clone for ResourceState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ResourceState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceState")
            .field("data", &self.data)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, TransportError>> + Send + Sync>;

/// One endpoint's cached state. Each instance owns its state outright, so two
/// resources never share data even when they point at the same endpoint.
/// Dropping the resource aborts any fetch still in flight.
pub struct RemoteResource<T> {
    fetcher: Fetcher<T>,
    state: Arc<watch::Sender<ResourceState<T>>>,
    generation: Arc<AtomicU64>,
    runtime: Handle,
    inflight: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + Sync + 'static> RemoteResource<T> {
    /// Creates the resource and immediately starts the first fetch.
    pub fn activate<F, Fut>(runtime: Handle, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || -> BoxFuture<'static, Result<T, TransportError>> {
            Box::pin(fetch())
        });
        let (sender, _) = watch::channel(ResourceState {
            data: None,
            loading: true,
            error: None,
        });

        let resource = Self {
            fetcher,
            state: Arc::new(sender),
            generation: Arc::new(AtomicU64::new(0)),
            runtime,
            inflight: Mutex::new(None),
        };
        resource.start();
        resource
    }

    /// Fetches again. Supersedes a fetch that is still in flight.
    pub fn refetch(&self) {
        self.start();
    }

    fn start(&self) {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.loading = true;
        });

        let fetch = (self.fetcher)();
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);

        let handle = self.runtime.spawn(async move {
            let result = fetch.await;
            state.send_if_modified(|state| {
                if current.load(Ordering::SeqCst) != generation {
                    debug!(generation, "Discarding superseded fetch result");
                    return false;
                }
                match result {
                    Ok(data) => {
                        state.data = Some(Arc::new(data));
                        state.error = None;
                    }
                    Err(e) => {
                        warn!(error = %e, "Resource fetch failed");
                        state.data = None;
                        state.error = Some(e.to_string());
                    }
                }
                state.loading = false;
                true
            });
        });

        if let Some(previous) = self.inflight.lock().replace(handle) {
            previous.abort();
        }
    }

    pub fn state(&self) -> ResourceState<T> {
        self.state.borrow().clone()
    }

    /// Receives every state change of this resource.
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.state.subscribe()
    }

    /// Waits until no fetch is in flight and returns that state.
    pub async fn settled(&self) -> ResourceState<T> {
        let mut receiver = self.state.subscribe();
        loop {
            {
                let state = receiver.borrow_and_update();
                if !state.loading {
                    return state.clone();
                }
            }
            if receiver.changed().await.is_err() {
                return self.state();
            }
        }
    }
}

impl<T> Drop for RemoteResource<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.inflight.lock().take() {
            handle.abort();
        }
    }
}
