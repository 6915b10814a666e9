/// Fire-and-forget sink for user-visible notices. Called from the observer thread.
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);

    fn notify_info(&self, _message: &str) {}
}

/// Routes notices into the tracing pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_error(&self, message: &str) {
        tracing::error!(notice = %message, "session error");
    }

    fn notify_info(&self, message: &str) {
        tracing::info!(notice = %message, "session notice");
    }
}
