//! 人脸验证数据上报 - HTTP 边界

use super::error::PipelineError;
use crate::api::models::verification::{ErrorResponse, FaceVerificationRequest, FaceVerificationResponse};
use log::{debug, error, info};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;

pub const VERIFICATION_PATH: &str = "api/auth/face-verification";

#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub base_url: String,
    pub auth_token: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            auth_token: String::new(),
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(60),
        }
    }
}

impl SubmissionConfig {
    pub fn endpoint(&self) -> String {
        self.url(VERIFICATION_PATH)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn build_client(&self) -> Result<Client, PipelineError> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .build()
            .map_err(|e| PipelineError::Network(format!("failed to build HTTP client: {}", e)))
    }
}

pub trait VerificationSubmitter: Send + Sync {
    fn submit(&self, request: &FaceVerificationRequest) -> Result<FaceVerificationResponse, PipelineError>;
}

/// 根据 HTTP 状态码和响应体得出上报结果
pub fn interpret_response(status: StatusCode, body: &str) -> Result<FaceVerificationResponse, PipelineError> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|e| e.message)
            .unwrap_or_else(|_| {
                format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("error")
                )
            });
        return Err(PipelineError::SubmissionFailed(message));
    }

    let response: FaceVerificationResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::SubmissionFailed(format!("malformed response: {}", e)))?;

    if !response.success {
        return Err(PipelineError::SubmissionFailed(response.message));
    }
    Ok(response)
}

pub struct HttpSubmitter {
    client: Client,
    config: SubmissionConfig,
}

impl HttpSubmitter {
    pub fn new(config: SubmissionConfig) -> Result<Self, PipelineError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }
}

impl VerificationSubmitter for HttpSubmitter {
    fn submit(&self, request: &FaceVerificationRequest) -> Result<FaceVerificationResponse, PipelineError> {
        if self.config.auth_token.is_empty() {
            return Err(PipelineError::SubmissionFailed("No auth token available".to_string()));
        }

        let url = self.config.endpoint();
        debug!(
            "📤 POST {} ({} frames, session {})",
            url,
            request.frames_base64.len(),
            request.session_id
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.auth_token)
            .json(request)
            .send()
            .map_err(|e| {
                error!("❌ Face verification request failed: {}", e);
                PipelineError::Network(e.to_string())
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| PipelineError::Network(format!("failed to read response: {}", e)))?;

        let result = interpret_response(status, &body);
        match &result {
            Ok(r) => info!("✅ Face verification accepted: {}", r.message),
            Err(e) => error!("❌ Face verification rejected ({}): {}", status, e),
        }
        result
    }
}
