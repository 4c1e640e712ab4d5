//! 人脸注册 - 录制视频按 30fps 每 5 帧取 1 帧，JPEG 压缩后以 multipart 上传

use super::encoder::FrameEncoder;
use super::error::PipelineError;
use super::submission::SubmissionConfig;
use crate::api::models::face_auth::{FaceAuthResponse, FaceStatusResponse, RegistrationOutcome};
use crate::api::models::verification::ErrorResponse;
use crate::core::cancel::CancelFlag;
use crate::core::video::{CapturedFrame, FrameSampler, VideoSource};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use reqwest::blocking::{multipart, Client, Response};
use reqwest::StatusCode;

pub const REGISTER_PATH: &str = "api/face-auth/register";
pub const STATUS_PATH: &str = "api/face-auth/status";
pub const DELETE_PATH: &str = "api/face-auth/delete";

/// 30fps 下每 5 帧取一帧
pub const REGISTRATION_INTERVAL_MS: u64 = 167;
pub const REGISTRATION_JPEG_QUALITY: u8 = 85;

pub struct RegistrationConfig {
    pub sample_interval_ms: u64,
    pub jpeg_quality: u8,
    /// 注册图片默认保持原始尺寸
    pub max_encoded_size: Option<(u32, u32)>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: REGISTRATION_INTERVAL_MS,
            jpeg_quality: REGISTRATION_JPEG_QUALITY,
            max_encoded_size: None,
        }
    }
}

/// multipart 中的一张图片（字段名 `files`）
#[derive(Debug, Clone)]
pub struct RegistrationImage {
    pub file_name: String,
    pub jpeg: Vec<u8>,
}

pub trait FaceAuthClient: Send + Sync {
    fn register(&self, images: &[RegistrationImage]) -> Result<FaceAuthResponse, PipelineError>;
    fn status(&self) -> Result<FaceStatusResponse, PipelineError>;
    fn delete(&self) -> Result<FaceAuthResponse, PipelineError>;
}

/// 非 2xx 时的错误信息：JSON message，其次原始响应体，最后状态码
fn failure_message(action: &str, status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.message)
        .ok()
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    format!("{} failed: {}", action, detail)
}

/// 注册 / 删除接口：2xx 且 `success` 为真才算成功
pub fn interpret_auth_response(
    action: &str,
    status: StatusCode,
    body: &str,
) -> Result<FaceAuthResponse, PipelineError> {
    if !status.is_success() {
        return Err(PipelineError::SubmissionFailed(failure_message(action, status, body)));
    }
    let response: FaceAuthResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::SubmissionFailed(format!("malformed response: {}", e)))?;
    if !response.success {
        return Err(PipelineError::SubmissionFailed(response.message));
    }
    Ok(response)
}

pub fn interpret_status_response(status: StatusCode, body: &str) -> Result<FaceStatusResponse, PipelineError> {
    if !status.is_success() {
        return Err(PipelineError::SubmissionFailed(failure_message(
            "Status check",
            status,
            body,
        )));
    }
    serde_json::from_str(body)
        .map_err(|e| PipelineError::SubmissionFailed(format!("malformed response: {}", e)))
}

pub struct HttpFaceAuthClient {
    client: Client,
    config: SubmissionConfig,
}

impl HttpFaceAuthClient {
    pub fn new(config: SubmissionConfig) -> Result<Self, PipelineError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    fn token(&self) -> Result<&str, PipelineError> {
        if self.config.auth_token.is_empty() {
            return Err(PipelineError::SubmissionFailed("No auth token available".to_string()));
        }
        Ok(&self.config.auth_token)
    }

    fn read(result: reqwest::Result<Response>) -> Result<(StatusCode, String), PipelineError> {
        let resp = result.map_err(|e| {
            error!("❌ Face auth request failed: {}", e);
            PipelineError::Network(e.to_string())
        })?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| PipelineError::Network(format!("failed to read response: {}", e)))?;
        Ok((status, body))
    }
}

impl FaceAuthClient for HttpFaceAuthClient {
    fn register(&self, images: &[RegistrationImage]) -> Result<FaceAuthResponse, PipelineError> {
        let token = self.token()?;
        let url = self.config.url(REGISTER_PATH);

        let mut form = multipart::Form::new();
        for image in images {
            let part = multipart::Part::bytes(image.jpeg.clone())
                .file_name(image.file_name.clone())
                .mime_str("image/jpeg")
                .map_err(|e| PipelineError::Network(e.to_string()))?;
            form = form.part("files", part);
        }

        debug!("📤 POST {} ({} images)", url, images.len());
        let (status, body) = Self::read(self.client.post(&url).bearer_auth(token).multipart(form).send())?;
        interpret_auth_response("Registration", status, &body)
    }

    fn status(&self) -> Result<FaceStatusResponse, PipelineError> {
        let token = self.token()?;
        let url = self.config.url(STATUS_PATH);
        let (status, body) = Self::read(self.client.get(&url).bearer_auth(token).send())?;
        interpret_status_response(status, &body)
    }

    fn delete(&self) -> Result<FaceAuthResponse, PipelineError> {
        let token = self.token()?;
        let url = self.config.url(DELETE_PATH);
        let (status, body) = Self::read(self.client.delete(&url).bearer_auth(token).send())?;
        interpret_auth_response("Deletion", status, &body)
    }
}

/// 注册流程：抽帧 → 压缩 → 上传，不做人脸检测与筛选
#[derive(Default)]
pub struct FaceRegistrar {
    config: RegistrationConfig,
}

impl FaceRegistrar {
    pub fn new(config: RegistrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// 抽帧并压缩为待上传图片
    pub fn prepare<S: VideoSource>(
        &self,
        source: S,
        cancel: &CancelFlag,
    ) -> Result<Vec<RegistrationImage>, PipelineError> {
        let frames: Vec<CapturedFrame> = FrameSampler::with_interval(source, self.config.sample_interval_ms)
            .with_cancel(cancel.clone())
            .collect();
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        if frames.is_empty() {
            warn!("⚠️ No frames could be extracted for registration");
            return Err(PipelineError::NoFramesExtracted);
        }

        let encoder = FrameEncoder {
            quality: self.config.jpeg_quality.clamp(1, 100),
            max_size: self.config.max_encoded_size,
        };
        let images = frames
            .par_iter()
            .map(|frame| {
                encoder.encode_captured(frame).map(|(jpeg, _, _)| RegistrationImage {
                    file_name: format!("frame_{}.jpg", frame.frame_index),
                    jpeg,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Prepared {} registration images", images.len());
        Ok(images)
    }

    pub fn register<S: VideoSource>(
        &self,
        source: S,
        client: &dyn FaceAuthClient,
        cancel: &CancelFlag,
    ) -> Result<RegistrationOutcome, PipelineError> {
        let images = self.prepare(source, cancel)?;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        info!("📤 Uploading {} frames for face registration", images.len());
        let response = client.register(&images)?;
        info!("✅ Face registration accepted: {}", response.message);

        Ok(RegistrationOutcome {
            message: format!("Face registration started. Training {} images...", images.len()),
            frames_uploaded: images.len(),
            status: response.status,
        })
    }
}
