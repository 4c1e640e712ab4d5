//! 人脸注册 - 录制视频上传训练、查询训练状态、删除人脸数据

use crate::api::models::face_auth::{FaceStatusResponse, RegistrationOutcome};
use crate::core::cancel::CancelSlot;
use crate::core::face::{FaceAuthClient, FaceRegistrar, HttpFaceAuthClient, PipelineError, SubmissionConfig};
use crate::core::video::{RawFrame, RecordedVideo};
use flutter_rust_bridge::frb;
use log::{error, info};

#[derive(Debug, Clone)]
pub struct FaceAuthConfig {
    pub base_url: String,
    pub auth_token: String,
}

/// 人脸注册
///
/// ```dart
/// final enrollment = FaceEnrollment.create(config: config);
/// final outcome = await enrollment.registerRecording(frames: yuvFrames);
/// final status = await enrollment.trainingStatus();
/// ```
#[frb(opaque)]
pub struct FaceEnrollment {
    registrar: FaceRegistrar,
    client: Box<dyn FaceAuthClient>,
    cancel: CancelSlot,
}

impl FaceEnrollment {
    #[frb(sync)]
    pub fn create(config: FaceAuthConfig) -> Result<Self, PipelineError> {
        crate::init_logging();
        let client = HttpFaceAuthClient::new(SubmissionConfig {
            base_url: config.base_url,
            auth_token: config.auth_token,
            ..Default::default()
        })?;
        Ok(Self::with_client(Box::new(client)))
    }

    #[frb(ignore)]
    pub fn with_client(client: Box<dyn FaceAuthClient>) -> Self {
        info!("🙂 FaceEnrollment: created");
        Self {
            registrar: FaceRegistrar::default(),
            client,
            cancel: CancelSlot::new(),
        }
    }

    /// 上传录制视频中的帧用于注册（约 10 秒视频，每 5 帧取 1 帧）
    #[frb]
    pub fn register_recording(&self, frames: Vec<RawFrame>) -> Result<RegistrationOutcome, PipelineError> {
        let cancel = self.cancel.begin();
        info!("🎥 FaceEnrollment: registering from {} recorded frames", frames.len());

        let result = self
            .registrar
            .register(RecordedVideo::new(frames), self.client.as_ref(), &cancel);
        self.cancel.finish(&cancel);

        if let Err(e) = &result {
            error!("❌ Face registration failed: {}", e);
        }
        result
    }

    /// 查询训练状态
    #[frb]
    pub fn training_status(&self) -> Result<FaceStatusResponse, PipelineError> {
        self.client.status().inspect_err(|e| error!("❌ Status check failed: {}", e))
    }

    /// 删除服务端的人脸数据
    #[frb]
    pub fn delete_face_data(&self) -> Result<String, PipelineError> {
        self.client
            .delete()
            .map(|_| "Face data deleted successfully".to_string())
            .inspect_err(|e| error!("❌ Face data deletion failed: {}", e))
    }

    #[frb(sync)]
    pub fn cancel(&self) {
        info!("FaceEnrollment: cancel requested");
        self.cancel.cancel();
    }
}

impl Drop for FaceEnrollment {
    fn drop(&mut self) {
        info!("🗑️ FaceEnrollment: released");
    }
}
