//! HTTP surface of the session backend
//!
//! Covers the boundary calls this core consumes: the approve/deny pair
//! owned by the external approval service, prompt submission, and the
//! authoritative session read used as ground truth after reconnects.

use agentdeck_protocol::Session;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// The external approve/deny boundary.
///
/// The correlator guarantees at most one call per pending approval
/// instance; backend-side idempotency is the service's own concern. The
/// trait exists so the correlator can be exercised against a recording
/// double in tests.
pub trait ApprovalService {
    fn approve(
        &self,
        session_id: &str,
        feedback: Option<String>,
    ) -> impl std::future::Future<Output = Result<(), ClientError>> + Send;

    fn deny(
        &self,
        session_id: &str,
        feedback: Option<String>,
    ) -> impl std::future::Future<Output = Result<(), ClientError>> + Send;
}

#[derive(Serialize)]
struct FeedbackBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<String>,
}

#[derive(Serialize)]
struct PromptBody<'a> {
    prompt: &'a str,
}

/// reqwest-backed client for the session backend
#[derive(Clone)]
pub struct SessionApi {
    http: reqwest::Client,
    config: ClientConfig,
}

impl SessionApi {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Authoritative session read — ground truth for the projector.
    pub async fn get_session(&self, session_id: &str) -> Result<Session, ClientError> {
        let response = self
            .request(reqwest::Method::GET, &self.config.session_url(session_id))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::UnexpectedResponse(format!(
                "GET session returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Submit a new prompt to the session.
    pub async fn send_prompt(&self, session_id: &str, prompt: &str) -> Result<(), ClientError> {
        let url = format!("{}/prompt", self.config.session_url(session_id));
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&PromptBody { prompt })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::UnexpectedResponse(format!(
                "prompt returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn resolve_call(
        &self,
        session_id: &str,
        action: &str,
        feedback: Option<String>,
    ) -> Result<(), ClientError> {
        let url = format!("{}/{action}", self.config.session_url(session_id));
        debug!(component = "api", session_id = %session_id, action = %action, "issuing approval call");

        let response = self
            .request(reqwest::Method::POST, &url)
            // Issuance-side key only; the backend does not enforce it.
            .header("x-idempotency-key", Uuid::new_v4().to_string())
            .json(&FeedbackBody { feedback })
            .send()
            .await
            .map_err(|e| ClientError::ApprovalAction(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::ApprovalAction(format!(
                "{action} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("x-api-key", key);
        }
        builder
    }
}

impl ApprovalService for SessionApi {
    async fn approve(
        &self,
        session_id: &str,
        feedback: Option<String>,
    ) -> Result<(), ClientError> {
        self.resolve_call(session_id, "approve", feedback).await
    }

    async fn deny(&self, session_id: &str, feedback: Option<String>) -> Result<(), ClientError> {
        self.resolve_call(session_id, "deny", feedback).await
    }
}
