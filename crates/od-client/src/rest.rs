//! Async HTTP client for the orchestrator's REST API.

use serde::Deserialize;
use std::time::Duration;

use od_core::types::{
    BackgroundWorkerState, ConcurrencyLimits, HitlItem, OrchestratorStatus, PipelineIssues,
    PipelineSession, PullRequest,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{method} {path}: {message}")]
    Request {
        method: &'static str,
        path: String,
        message: String,
    },
    #[error("{method} {path}: HTTP {status}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },
    #[error("GET {path} parse: {message}")]
    Parse { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Reply shape of `GET /api/status`: the control plane's view of itself.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub orchestrator: OrchestratorStatus,
    #[serde(default)]
    pub background: Vec<BackgroundWorkerState>,
    #[serde(default)]
    pub limits: ConcurrencyLimits,
}

/// Reusable client + base URL. All methods are async and non-blocking;
/// failures are returned, never panicked, so a bad poll degrades to "keep
/// the previous value" upstream.
pub struct ApiClient {
    client: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base, path);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ClientError::Request {
                method: "GET",
                path: path.to_string(),
                message: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(ClientError::Status {
                method: "GET",
                path: path.to_string(),
                status: resp.status().as_u16(),
            });
        }
        resp.json::<T>().await.map_err(|e| ClientError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn post(&self, path: &str, body: Option<serde_json::Value>) -> Result<()> {
        let url = format!("{}{}", self.base, path);
        let mut req = self.client.post(&url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.map_err(|e| ClientError::Request {
            method: "POST",
            path: path.to_string(),
            message: e.to_string(),
        })?;
        if !resp.status().is_success() {
            return Err(ClientError::Status {
                method: "POST",
                path: path.to_string(),
                status: resp.status().as_u16(),
            });
        }
        // Fire-and-refetch: nothing in the body is trusted over the next GET.
        Ok(())
    }

    // -- snapshot reads --

    pub async fn fetch_issues(&self) -> Result<PipelineIssues> {
        self.get("/api/issues").await
    }

    pub async fn fetch_prs(&self) -> Result<Vec<PullRequest>> {
        self.get("/api/prs").await
    }

    pub async fn fetch_hitl(&self) -> Result<Vec<HitlItem>> {
        self.get("/api/hitl").await
    }

    pub async fn fetch_sessions(&self) -> Result<Vec<PipelineSession>> {
        self.get("/api/sessions").await
    }

    pub async fn fetch_status(&self) -> Result<StatusResponse> {
        self.get("/api/status").await
    }

    // -- HITL actions --

    pub async fn hitl_correct(&self, issue: u64, correction: &str) -> Result<()> {
        self.post(
            &format!("/api/hitl/{issue}/correct"),
            Some(serde_json::json!({ "correction": correction })),
        )
        .await
    }

    pub async fn hitl_skip(&self, issue: u64) -> Result<()> {
        self.post(&format!("/api/hitl/{issue}/skip"), None).await
    }

    pub async fn hitl_close(&self, issue: u64) -> Result<()> {
        self.post(&format!("/api/hitl/{issue}/close"), None).await
    }

    // -- control plane --

    pub async fn control_start(&self) -> Result<()> {
        self.post("/api/control/start", None).await
    }

    pub async fn control_stop(&self) -> Result<()> {
        self.post("/api/control/stop", None).await
    }
}
