use super::{ErrorReport, ErrorReporter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

/// Configuration for the error report queue
#[derive(Debug, Clone)]
pub struct ErrorReportQueueConfig {
    /// Delivery attempts per report, including the first.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
    pub max_concurrent: usize,
    pub capacity: usize,
}

impl Default for ErrorReportQueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(10),
            max_concurrent: 4,
            capacity: 1000,
        }
    }
}

/// Fire-and-forget delivery of [`ErrorReport`]s with bounded retries.
///
/// Enqueueing never blocks and never fails the caller: a full queue drops the report with a
/// warning, and a report whose attempts are exhausted is logged as a terminal failure.
#[derive(Clone)]
pub struct ErrorReportQueue {
    sender: mpsc::Sender<ErrorReport>,
    shutdown_tx: mpsc::Sender<()>,
}

impl ErrorReportQueue {
    pub fn new(reporter: Arc<dyn ErrorReporter>, config: ErrorReportQueueConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::worker_loop(reporter, config, receiver, shutdown_rx).await;
        });

        Self {
            sender,
            shutdown_tx,
        }
    }

    /// Queue `report` for delivery. Returns `false` if it was dropped.
    pub fn enqueue(&self, report: ErrorReport) -> bool {
        match self.sender.try_send(report) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(report)) => {
                tracing::warn!(report_id = %report.id, "Error report queue full, dropping report");
                false
            }
            Err(mpsc::error::TrySendError::Closed(report)) => {
                tracing::warn!(report_id = %report.id, "Error report queue closed, dropping report");
                false
            }
        }
    }

    async fn worker_loop(
        reporter: Arc<dyn ErrorReporter>,
        config: ErrorReportQueueConfig,
        mut receiver: mpsc::Receiver<ErrorReport>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

        tracing::info!(
            max_attempts = config.max_attempts,
            backoff_secs = config.backoff.as_secs_f64(),
            "Error report queue started"
        );

        loop {
            tokio::select! {
                report = receiver.recv() => {
                    let Some(report) = report else { break };
                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };
                    let reporter = reporter.clone();
                    let config = config.clone();
                    tokio::spawn(async move {
                        Self::deliver(reporter.as_ref(), &report, &config).await;
                        drop(permit);
                    });
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Error report queue shutting down");
                    break;
                }
            }
        }
    }

    /// Attempt delivery up to `max_attempts` times. Returns whether it succeeded.
    #[tracing::instrument(skip(reporter, report, config), fields(report_id = %report.id))]
    async fn deliver(
        reporter: &dyn ErrorReporter,
        report: &ErrorReport,
        config: &ErrorReportQueueConfig,
    ) -> bool {
        let max_attempts = config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match reporter.report(report).await {
                Ok(()) => {
                    tracing::debug!(attempt, "Error report delivered");
                    return true;
                }
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_attempts,
                        retry_in_secs = config.backoff.as_secs_f64(),
                        "Error report delivery failed, retrying"
                    );
                    tokio::time::sleep(config.backoff).await;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        attempts = max_attempts,
                        code = %report.code,
                        path = %report.path,
                        "Error report delivery failed permanently"
                    );
                }
            }
        }

        false
    }

    /// Gracefully shutdown the queue worker
    pub async fn shutdown(&self) {
        if let Err(e) = self.shutdown_tx.send(()).await {
            tracing::warn!(
                error = %e,
                "Failed to send shutdown signal to error report queue"
            );
        }
    }
}
