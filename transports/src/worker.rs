//! Blocking transport run on the runtime's blocking pool

use std::sync::Arc;

use inferbench_core::{AsyncTransport, CompletionCallback, Transport};
use tokio::runtime::Handle;

/// Adapts a blocking [`Transport`] to the callback shape
///
/// Each send occupies one blocking-pool thread for the duration of the call
/// and invokes the completion callback from that thread. The driver's
/// concurrency limit bounds how many threads are busy at once.
pub struct OnWorker<T> {
    inner: Arc<T>,
    runtime: Handle,
}

impl<T: Transport + 'static> OnWorker<T> {
    /// Wrap `inner`, scheduling calls on `runtime`
    pub fn new(inner: T, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(inner),
            runtime,
        }
    }

    /// The wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport + 'static> AsyncTransport for OnWorker<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn send_async(&self, body: Vec<u8>, on_done: CompletionCallback) {
        let inner = Arc::clone(&self.inner);
        self.runtime.spawn_blocking(move || {
            let result = inner.send(body);
            on_done(result);
        });
    }
}

impl<T: Transport> std::fmt::Debug for OnWorker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnWorker")
            .field("transport", &self.inner.name())
            .finish()
    }
}
