//! Stop coordination between the signal listener and the server.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Latching stop flag.
///
/// Once triggered it stays triggered, so a task that starts waiting after the
/// signal still stops. Clones share the same flag.
#[derive(Debug, Clone)]
pub struct Shutdown {
    stopped: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (stopped, _) = watch::channel(false);
        Self {
            stopped: Arc::new(stopped),
        }
    }

    /// Ask every waiter to stop.
    pub fn trigger(&self) {
        self.stopped.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called, or when
    /// every handle is gone.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut stopped = self.stopped.subscribe();
        async move {
            let _ = stopped.wait_for(|stopped| *stopped).await;
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
