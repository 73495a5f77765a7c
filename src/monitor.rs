use std::fmt;

use async_trait::async_trait;

/// Context attached to a handler failure reported to the monitor.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub queue_name: String,
    pub exchange: String,
    pub redelivered: bool,
}

/// The monitoring sink a host application wires in: "a monitoring sink
/// (`reportError`)". Programmatic callers implement this trait; the
/// default `LoggingMonitor` just logs, for callers that only want the
/// `error` event path and don't need a separate sink.
#[async_trait]
pub trait Monitor: Send + Sync {
    async fn report_error(&self, error: &(dyn std::error::Error + Send + Sync), ctx: ErrorContext);
}

/// A `Monitor` that forwards everything to `log::error!`, in the style of
/// `overwatch`'s liberal use of the `log` facade for anything that doesn't
/// have a dedicated sink.
#[derive(Debug, Default)]
pub struct LoggingMonitor;

#[async_trait]
impl Monitor for LoggingMonitor {
    async fn report_error(&self, error: &(dyn std::error::Error + Send + Sync), ctx: ErrorContext) {
        log::error!(
            "handler error on queue {} (exchange {}, redelivered {}): {}",
            ctx.queue_name,
            ctx.exchange,
            ctx.redelivered,
            error
        );
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "queue={} exchange={} redelivered={}",
            self.queue_name, self.exchange, self.redelivered
        )
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingMonitor;
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    #[tokio::test]
    async fn recording_monitor_captures_context_and_error() {
        let monitor = RecordingMonitor::default();
        monitor
            .report_error(
                &Boom,
                ErrorContext {
                    queue_name: "queue/ns/orders".to_string(),
                    exchange: "orders".to_string(),
                    redelivered: true,
                },
            )
            .await;

        let reports = monitor.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("queue/ns/orders"));
        assert!(reports[0].contains("redelivered=true"));
        assert!(reports[0].contains("boom"));
    }
}
