//! Programmatic shutdown trigger.
//!
//! Triggering stops `HttpServer::run` from accepting connections. Requests
//! already in flight still complete and are written to the access log;
//! connections open past `listener.shutdown_timeout_secs` are dropped, which
//! logs their requests as cancelled (499). The tracer provider is flushed
//! once `run` returns.

use tokio::sync::broadcast;

/// Stop handle shared by the server and whoever embeds it.
///
/// Tests and embedding code use this in place of SIGINT/SIGTERM.
pub struct Shutdown {
    stop: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (stop, _) = broadcast::channel(1);
        Self { stop }
    }

    /// Receiver for `HttpServer::run`. Only subscribers taken before
    /// [`trigger`](Self::trigger) see the stop.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.stop.subscribe()
    }

    /// Ask every running server to drain. Returns how many were told.
    pub fn trigger(&self) -> usize {
        let notified = self.stop.send(()).unwrap_or(0);
        tracing::info!(servers = notified, "Shutdown requested");
        notified
    }

    pub fn receiver_count(&self) -> usize {
        self.stop.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_all_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        assert_eq!(shutdown.trigger(), 2);
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());

        drop(a);
        assert_eq!(shutdown.receiver_count(), 1);
    }

    #[test]
    fn test_trigger_without_subscribers() {
        assert_eq!(Shutdown::default().trigger(), 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut late = shutdown.subscribe();
        assert!(late.try_recv().is_err());
    }
}
