use super::detector::DetectorSession;
use super::encoder::{FrameEncoder, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SIZE};
use super::error::PipelineError;
use super::metadata::{batch_criteria, build_metadata, SessionInfo, SELECTION_CRITERIA};
use super::scorer::{BlurPolicy, NeverBlurry, QualityScorer, ScoredFrame};
use super::selector::{select_best_frames, SelectionCriteria};
use super::submission::VerificationSubmitter;
use crate::api::models::verification::{DeviceInfo, FaceVerificationRequest};
use crate::core::cancel::CancelFlag;
use crate::core::video::{FrameSampler, VideoSource, DEFAULT_SAMPLE_INTERVAL_MS};
use log::{debug, info, warn};

pub struct PipelineConfig {
    pub sample_interval_ms: u64,
    pub selection: SelectionCriteria,
    pub jpeg_quality: u8,
    pub max_encoded_size: Option<(u32, u32)>,
    /// 分批上报，每批一个请求
    pub batch_size: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            selection: SelectionCriteria::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_encoded_size: Some(DEFAULT_MAX_SIZE),
            batch_size: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CaptureContext {
    pub user_id: String,
    pub device: DeviceInfo,
    /// 为空时自动生成
    pub session_id: Option<String>,
    /// 本次运行的取消标志，宿主保留一个克隆
    pub cancel: CancelFlag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub session_id: String,
    pub message: String,
    pub verification_id: Option<String>,
    pub selected_frames: usize,
    pub batches_sent: usize,
}

pub struct FaceCapturePipeline {
    config: PipelineConfig,
    scorer: QualityScorer,
}

impl FaceCapturePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_blur_policy(config, Box::new(NeverBlurry))
    }

    pub fn with_blur_policy(config: PipelineConfig, blur_policy: Box<dyn BlurPolicy>) -> Self {
        Self {
            config,
            scorer: QualityScorer::with_blur_policy(blur_policy),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn check_cancelled(cancel: &CancelFlag) -> Result<(), PipelineError> {
        if cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// 抽帧、评分、筛选，不发送请求
    pub fn analyze<S: VideoSource>(
        &self,
        source: S,
        session: &DetectorSession,
        cancel: &CancelFlag,
    ) -> Result<(usize, Vec<ScoredFrame>, Vec<ScoredFrame>), PipelineError> {
        let frames: Vec<_> = FrameSampler::with_interval(source, self.config.sample_interval_ms)
            .with_cancel(cancel.clone())
            .collect();
        Self::check_cancelled(cancel)?;

        let extracted = frames.len();
        if extracted == 0 {
            warn!("⚠️ No frames extracted from video");
            return Err(PipelineError::NoFramesExtracted);
        }

        let scored = self
            .scorer
            .score_frames(frames, session.detector(), Some(cancel));
        Self::check_cancelled(cancel)?;
        if scored.is_empty() {
            return Err(PipelineError::NoFacesDetected(extracted));
        }

        let selected = select_best_frames(&scored, &self.config.selection);
        if selected.is_empty() {
            return Err(PipelineError::SelectionEmpty(scored.len()));
        }

        Ok((extracted, scored, selected))
    }

    pub fn run<S: VideoSource>(
        &self,
        source: S,
        session: &DetectorSession,
        submitter: &dyn VerificationSubmitter,
        context: &CaptureContext,
    ) -> Result<SubmissionOutcome, PipelineError> {
        let session_id = context
            .session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let started_at_ms = chrono::Utc::now().timestamp_millis();
        info!("🎥 Face capture session {} started", session_id);

        let (extracted, scored, selected) = self.analyze(source, session, &context.cancel)?;
        let capture_completed_at_ms = chrono::Utc::now().timestamp_millis();

        let info = SessionInfo {
            session_id: session_id.clone(),
            user_id: context.user_id.clone(),
            started_at_ms,
            capture_completed_at_ms,
            device: context.device.clone(),
        };

        let encoder = FrameEncoder {
            quality: self.config.jpeg_quality,
            max_size: self.config.max_encoded_size,
        };

        // build every request before sending anything
        let chunk_size = self.config.batch_size.unwrap_or(selected.len()).max(1);
        let batches: Vec<&[ScoredFrame]> = selected.chunks(chunk_size).collect();
        let total_batches = batches.len();
        let mut requests = Vec::with_capacity(total_batches);
        for (batch_index, batch) in batches.into_iter().enumerate() {
            let criteria = if total_batches > 1 {
                batch_criteria(batch_index, total_batches)
            } else {
                SELECTION_CRITERIA.to_string()
            };
            let metadata = build_metadata(
                &info,
                extracted,
                &scored,
                batch,
                &criteria,
                encoder.quality,
            );
            let frames_base64 = encoder
                .encode_all(batch)?
                .into_iter()
                .map(|e| e.base64)
                .collect();

            requests.push(FaceVerificationRequest {
                session_id: session_id.clone(),
                metadata,
                frames_base64,
            });
        }

        // 取消只在首个请求之前生效，之后的批次全部发出
        Self::check_cancelled(&context.cancel)?;
        let mut last_response = None;
        for (batch_index, request) in requests.iter().enumerate() {
            debug!("Sending batch {}/{}", batch_index + 1, total_batches);
            let response = submitter.submit(request).map_err(|e| {
                if total_batches == 1 {
                    return e;
                }
                let reason = match e {
                    PipelineError::SubmissionFailed(msg) | PipelineError::Network(msg) => msg,
                    other => other.to_string(),
                };
                PipelineError::BatchFailed {
                    batch: batch_index + 1,
                    total: total_batches,
                    sent: batch_index,
                    reason,
                }
            })?;
            if context.cancel.is_cancelled() && batch_index + 1 < total_batches {
                warn!(
                    "Cancel requested after batch {}/{}, sending the remaining batches",
                    batch_index + 1,
                    total_batches
                );
            }
            last_response = Some(response);
        }

        let response = last_response.ok_or(PipelineError::SelectionEmpty(scored.len()))?;
        info!(
            "✅ Face capture session {} submitted ({} frames in {} batches)",
            session_id,
            selected.len(),
            total_batches
        );

        Ok(SubmissionOutcome {
            session_id,
            message: response.message,
            verification_id: response.verification_id,
            selected_frames: selected.len(),
            batches_sent: total_batches,
        })
    }
}

impl Default for FaceCapturePipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
