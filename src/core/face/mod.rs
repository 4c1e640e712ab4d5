//! 人脸采集质量筛选
//!
//! 流程：
//! 1. 抽帧 - 每 200ms 采样一帧
//! 2. 评分 - 人脸检测 + 置信度 + 模糊 + 光照
//! 3. 筛选 - 过滤低质量帧，取置信度最高的 10 帧，按时间排序
//! 4. 汇总 - 生成采集元数据
//! 5. 编码上报 - JPEG + base64 提交验证接口
//!
//! 注册流程（registration）只做抽帧和压缩，以 multipart 上传

pub mod detector;
pub mod encoder;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod registration;
pub mod scorer;
pub mod selector;
pub mod submission;

pub use detector::{BoundingBox, DetectedFace, DetectionError, DetectorSession, FaceDetector, HeadPose, MockFaceDetector};
pub use encoder::{EncodeError, EncodedFrame, FrameEncoder};
pub use error::PipelineError;
pub use pipeline::{CaptureContext, FaceCapturePipeline, PipelineConfig, SubmissionOutcome};
pub use registration::{FaceAuthClient, FaceRegistrar, HttpFaceAuthClient, RegistrationConfig, RegistrationImage};
pub use scorer::{BlurPolicy, GradientBlurPolicy, LightingQuality, NeverBlurry, QualityScorer, ScoredFrame};
pub use selector::{select_best_frames, SelectionCriteria};
pub use submission::{HttpSubmitter, SubmissionConfig, VerificationSubmitter};
