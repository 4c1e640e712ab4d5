//! 人脸验证 - 录制视频 → 选帧 → 上报

use crate::api::models::verification::DeviceInfo;
use crate::core::cancel::CancelSlot;
use crate::core::face::{
    CaptureContext, DetectorSession, FaceCapturePipeline, FaceDetector, GradientBlurPolicy,
    HttpSubmitter, NeverBlurry, PipelineConfig, PipelineError, SubmissionConfig,
    SubmissionOutcome, VerificationSubmitter,
};
use crate::core::video::{RawFrame, RecordedVideo};
use flutter_rust_bridge::frb;
use log::{error, info};
use std::sync::{Arc, PoisonError, RwLock};

type DetectorFactory = Arc<dyn Fn() -> Box<dyn FaceDetector> + Send + Sync>;

static DETECTOR_FACTORY: RwLock<Option<DetectorFactory>> = RwLock::new(None);

/// 原生层启动时注册平台人脸检测器，之后 Dart 侧才能通过 `FaceVerifier.create` 创建验证器
///
/// 每次验证都会从工厂打开一个新的检测会话，验证结束即关闭。
#[frb(ignore)]
pub fn register_detector_factory<F>(factory: F)
where
    F: Fn() -> Box<dyn FaceDetector> + Send + Sync + 'static,
{
    let factory: DetectorFactory = Arc::new(factory);
    let mut slot = DETECTOR_FACTORY.write().unwrap_or_else(PoisonError::into_inner);
    *slot = Some(factory);
    info!("🙂 Face detector factory registered");
}

fn registered_factory(registry: &RwLock<Option<DetectorFactory>>) -> Option<DetectorFactory> {
    registry.read().unwrap_or_else(PoisonError::into_inner).clone()
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub base_url: String,
    pub auth_token: String,
    pub batch_size: Option<usize>,
    pub detect_blur: bool,
}

/// 人脸验证器，检测器由原生侧注册后交给 Dart 使用
///
/// ```dart
/// final verifier = FaceVerifier.create(config: config);
/// final outcome = await verifier.verifyRecording(frames: yuvFrames, userId: id, device: info);
/// ```
#[frb(opaque)]
pub struct FaceVerifier {
    pipeline: FaceCapturePipeline,
    submitter: Box<dyn VerificationSubmitter>,
    detector_factory: DetectorFactory,
    cancel: CancelSlot,
}

impl FaceVerifier {
    /// 使用已注册的检测器创建验证器
    #[frb(sync)]
    pub fn create(config: VerifierConfig) -> Result<Self, PipelineError> {
        Self::from_registry(config, &DETECTOR_FACTORY)
    }

    fn from_registry(
        config: VerifierConfig,
        registry: &RwLock<Option<DetectorFactory>>,
    ) -> Result<Self, PipelineError> {
        crate::init_logging();

        let factory = registered_factory(registry).ok_or_else(|| {
            error!("❌ FaceVerifier: no face detector registered");
            PipelineError::DetectorUnavailable
        })?;
        let submitter = HttpSubmitter::new(SubmissionConfig {
            base_url: config.base_url,
            auth_token: config.auth_token,
            ..Default::default()
        })?;
        Ok(Self::build(
            config.batch_size,
            config.detect_blur,
            Box::new(submitter),
            factory,
        ))
    }

    #[frb(ignore)]
    pub fn with_submitter<F>(
        batch_size: Option<usize>,
        detect_blur: bool,
        submitter: Box<dyn VerificationSubmitter>,
        detector_factory: F,
    ) -> Self
    where
        F: Fn() -> Box<dyn FaceDetector> + Send + Sync + 'static,
    {
        Self::build(batch_size, detect_blur, submitter, Arc::new(detector_factory))
    }

    fn build(
        batch_size: Option<usize>,
        detect_blur: bool,
        submitter: Box<dyn VerificationSubmitter>,
        detector_factory: DetectorFactory,
    ) -> Self {
        let config = PipelineConfig {
            batch_size,
            ..Default::default()
        };
        let pipeline = if detect_blur {
            FaceCapturePipeline::with_blur_policy(config, Box::new(GradientBlurPolicy::default()))
        } else {
            FaceCapturePipeline::with_blur_policy(config, Box::new(NeverBlurry))
        };

        info!("🙂 FaceVerifier: created");
        Self {
            pipeline,
            submitter,
            detector_factory,
            cancel: CancelSlot::new(),
        }
    }

    /// 处理录制的 YUV 帧并提交验证
    #[frb]
    pub fn verify_recording(
        &self,
        frames: Vec<RawFrame>,
        user_id: String,
        device: DeviceInfo,
    ) -> Result<SubmissionOutcome, PipelineError> {
        let cancel = self.cancel.begin();
        info!("🎥 FaceVerifier: verifying {} recorded frames", frames.len());

        let session = DetectorSession::open((self.detector_factory)());
        let context = CaptureContext {
            user_id,
            device,
            session_id: None,
            cancel: cancel.clone(),
        };
        let result = self.pipeline.run(
            RecordedVideo::new(frames),
            &session,
            self.submitter.as_ref(),
            &context,
        );
        session.close();
        self.cancel.finish(&cancel);

        if let Err(e) = &result {
            error!("❌ Face verification failed: {}", e);
        }
        result
    }

    /// 取消正在进行（或即将开始）的验证，不会再发送请求
    #[frb(sync)]
    pub fn cancel(&self) {
        info!("FaceVerifier: cancel requested");
        self.cancel.cancel();
    }
}

impl Drop for FaceVerifier {
    fn drop(&mut self) {
        info!("🗑️ FaceVerifier: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::verification::{FaceVerificationRequest, FaceVerificationResponse};
    use crate::core::face::MockFaceDetector;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSubmitter {
        calls: Arc<AtomicUsize>,
    }

    impl VerificationSubmitter for CountingSubmitter {
        fn submit(&self, request: &FaceVerificationRequest) -> Result<FaceVerificationResponse, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FaceVerificationResponse {
                success: true,
                message: format!("received {} frames", request.frames_base64.len()),
                verification_id: None,
            })
        }
    }

    fn recording(seconds: u64) -> Vec<RawFrame> {
        (0..seconds * 10)
            .map(|i| RawFrame::grey(32, 24, 140, i * 100))
            .collect()
    }

    fn detector() -> Box<dyn FaceDetector> {
        Box::new(MockFaceDetector::constant(0.95, 0.8))
    }

    fn verifier(calls: Arc<AtomicUsize>) -> FaceVerifier {
        FaceVerifier::with_submitter(None, false, Box::new(CountingSubmitter { calls }), detector)
    }

    fn config() -> VerifierConfig {
        VerifierConfig {
            base_url: "https://boxes.example.com".to_string(),
            auth_token: "token".to_string(),
            batch_size: None,
            detect_blur: false,
        }
    }

    #[test]
    fn test_verify_recording() {
        let calls = Arc::new(AtomicUsize::new(0));
        let verifier = verifier(calls.clone());

        let outcome = verifier
            .verify_recording(recording(3), "user".to_string(), DeviceInfo::default())
            .unwrap();

        assert_eq!(outcome.selected_frames, 10);
        assert_eq!(outcome.message, "received 10 frames");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_before_verification_sends_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let verifier = verifier(calls.clone());

        // cancel lands before the worker picks up the job
        verifier.cancel();
        let err = verifier
            .verify_recording(recording(2), "user".to_string(), DeviceInfo::default())
            .unwrap_err();
        assert_eq!(err, PipelineError::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // the cancel was consumed by that run; the next one proceeds
        assert!(verifier
            .verify_recording(recording(2), "user".to_string(), DeviceInfo::default())
            .is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_recording() {
        let calls = Arc::new(AtomicUsize::new(0));
        let verifier = verifier(calls.clone());

        let err = verifier
            .verify_recording(Vec::new(), "user".to_string(), DeviceInfo::default())
            .unwrap_err();
        assert_eq!(err, PipelineError::NoFramesExtracted);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_create_without_detector_fails() {
        let registry = RwLock::new(None);
        assert!(matches!(
            FaceVerifier::from_registry(config(), &registry),
            Err(PipelineError::DetectorUnavailable)
        ));
    }

    #[test]
    fn test_create_uses_registered_detector() {
        let factory: DetectorFactory = Arc::new(detector);
        let registry = RwLock::new(Some(factory));
        assert!(FaceVerifier::from_registry(config(), &registry).is_ok());

        register_detector_factory(detector);
        assert!(FaceVerifier::create(config()).is_ok());
    }
}
