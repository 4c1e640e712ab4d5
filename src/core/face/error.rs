use super::encoder::EncodeError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("no frames extracted from video")]
    NoFramesExtracted,
    #[error("insufficient quality captures: no face detected in {0} frames")]
    NoFacesDetected(usize),
    #[error("insufficient quality captures: none of {0} face frames passed selection")]
    SelectionEmpty(usize),
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    /// 分批上报时第 `batch` 批失败，此前已发送 `sent` 批
    #[error("batch {batch} of {total} failed after {sent} sent: {reason}")]
    BatchFailed {
        batch: usize,
        total: usize,
        sent: usize,
        reason: String,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("frame encoding failed: {0}")]
    Encoding(String),
    #[error("capture cancelled")]
    Cancelled,
    #[error("no face detector registered")]
    DetectorUnavailable,
}

impl PipelineError {
    pub fn is_insufficient_quality(&self) -> bool {
        matches!(
            self,
            PipelineError::NoFacesDetected(_) | PipelineError::SelectionEmpty(_)
        )
    }

    /// 展示给用户的提示文本
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::NoFramesExtracted => "Could not read the recorded video".to_string(),
            PipelineError::NoFacesDetected(_) | PipelineError::SelectionEmpty(_) => {
                "Insufficient quality captures, please record again".to_string()
            }
            PipelineError::SubmissionFailed(msg) | PipelineError::Network(msg) => {
                format!("Submission failed: {}", msg)
            }
            PipelineError::BatchFailed { batch, total, reason, .. } => {
                format!("Submission failed: batch {} of {}: {}", batch, total, reason)
            }
            PipelineError::Encoding(_) => "Could not prepare captured frames".to_string(),
            PipelineError::Cancelled => "Verification cancelled".to_string(),
            PipelineError::DetectorUnavailable => "Face detection is not available on this device".to_string(),
        }
    }
}

impl From<EncodeError> for PipelineError {
    fn from(e: EncodeError) -> Self {
        PipelineError::Encoding(e.to_string())
    }
}
