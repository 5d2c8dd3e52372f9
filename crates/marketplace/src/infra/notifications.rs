//! The seam through which lifecycle events leave the core.
//!
//! Delivery (in-app rows, emails, push) is the surrounding application's
//! concern. Dispatch is fire-and-forget: a failed notification is logged and
//! counted, never propagated, so it cannot roll back the state transition
//! that triggered it.

use {
    anyhow::Result,
    model::{Event, Recipient},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait NotificationDispatcher: Send + Sync + 'static {
    async fn notify(&self, recipient: Recipient, event: Event) -> Result<()>;
}

/// Dispatcher that only logs, for wiring defaults and tests.
pub struct LoggingDispatcher;

#[async_trait::async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn notify(&self, recipient: Recipient, event: Event) -> Result<()> {
        tracing::info!(?recipient, ?event, "notification");
        Ok(())
    }
}

/// Sends the event and swallows failures.
pub(crate) async fn dispatch(
    dispatcher: &dyn NotificationDispatcher,
    recipient: Recipient,
    event: Event,
) {
    if let Err(err) = dispatcher.notify(recipient, event.clone()).await {
        Metrics::get().failed_notifications.inc();
        tracing::warn!(?err, ?recipient, ?event, "failed to dispatch notification");
    }
}

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "notifications")]
struct Metrics {
    /// Notifications that could not be dispatched.
    failed_notifications: prometheus::IntCounter,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }
}
