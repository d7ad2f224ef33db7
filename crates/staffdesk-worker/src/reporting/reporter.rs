use super::ErrorReport;
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;

/// Delivers one report. A returned error makes the queue retry.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn report(&self, report: &ErrorReport) -> anyhow::Result<()>;
}

/// POSTs reports as JSON to a collector endpoint.
pub struct HttpErrorReporter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpErrorReporter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build error report HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ErrorReporter for HttpErrorReporter {
    async fn report(&self, report: &ErrorReport) -> anyhow::Result<()> {
        self.client
            .post(&self.endpoint)
            .json(report)
            .send()
            .await
            .with_context(|| format!("Failed to send error report to {}", self.endpoint))?
            .error_for_status()
            .context("Error report endpoint rejected the report")?;
        Ok(())
    }
}

/// Writes reports to the log. Used when no endpoint is configured.
#[derive(Default)]
pub struct LogErrorReporter;

#[async_trait]
impl ErrorReporter for LogErrorReporter {
    async fn report(&self, report: &ErrorReport) -> anyhow::Result<()> {
        tracing::warn!(
            report_id = %report.id,
            status = report.status,
            code = %report.code,
            method = %report.method,
            path = %report.path,
            request_id = ?report.request_id,
            tenant = ?report.tenant,
            message = %report.message,
            "Server error reported"
        );
        Ok(())
    }
}
