use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A server-side failure worth forwarding to an external collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub status: u16,
    pub code: String,
    pub message: String,
    pub method: String,
    pub path: String,
    pub request_id: Option<String>,
    pub tenant: Option<String>,
    pub environment: String,
}

impl ErrorReport {
    pub fn new(
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            status,
            code: code.into(),
            message: message.into(),
            method: method.into(),
            path: path.into(),
            request_id: None,
            tenant: None,
            environment: environment.into(),
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_tenant(mut self, tenant: Option<String>) -> Self {
        self.tenant = tenant;
        self
    }
}
