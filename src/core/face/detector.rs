use crate::core::video::CapturedFrame;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectionError {
    #[error("detector failed: {0}")]
    Failed(String),
    #[error("detector timed out after {0}ms")]
    Timeout(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        (self.right - self.left).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// 头部姿态欧拉角（度）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    pub bounding_box: BoundingBox,
    pub head_pose: HeadPose,
    pub left_eye_open: Option<f32>,
    pub right_eye_open: Option<f32>,
    pub smiling: Option<f32>,
}

impl DetectedFace {
    pub fn new(bounding_box: BoundingBox) -> Self {
        Self {
            bounding_box,
            head_pose: HeadPose::default(),
            left_eye_open: None,
            right_eye_open: None,
            smiling: None,
        }
    }

    pub fn with_eyes(mut self, left: f32, right: f32) -> Self {
        self.left_eye_open = Some(left);
        self.right_eye_open = Some(right);
        self
    }

    pub fn with_smile(mut self, smiling: f32) -> Self {
        self.smiling = Some(smiling);
        self
    }

    pub fn with_pose(mut self, pitch: f32, yaw: f32, roll: f32) -> Self {
        self.head_pose = HeadPose { pitch, yaw, roll };
        self
    }
}

/// 人脸检测能力
///
/// 结果按检测器自身的优先级排列，调用方只取第一个
pub trait FaceDetector: Send + Sync {
    fn name(&self) -> &str {
        "face-detector"
    }

    fn detect(&self, frame: &CapturedFrame) -> Result<Vec<DetectedFace>, DetectionError>;
}

/// 一次采集会话内持有的检测器，显式创建、显式释放
pub struct DetectorSession {
    detector: Box<dyn FaceDetector>,
}

impl DetectorSession {
    pub fn open(detector: Box<dyn FaceDetector>) -> Self {
        info!("🙂 DetectorSession: opened ({})", detector.name());
        Self { detector }
    }

    pub fn detector(&self) -> &dyn FaceDetector {
        self.detector.as_ref()
    }

    pub fn close(self) {}
}

impl Drop for DetectorSession {
    fn drop(&mut self) {
        info!("🗑️ DetectorSession: released ({})", self.detector.name());
    }
}

type DetectionFn = Box<dyn Fn(u32) -> Result<Vec<DetectedFace>, DetectionError> + Send + Sync>;

/// 测试用检测器：按帧序号返回确定性的检测结果
pub struct MockFaceDetector {
    pattern: Option<DetectionFn>,
}

impl MockFaceDetector {
    pub fn new() -> Self {
        Self { pattern: None }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u32) -> Result<Vec<DetectedFace>, DetectionError> + Send + Sync + 'static,
    {
        Self {
            pattern: Some(Box::new(pattern)),
        }
    }

    /// 每帧返回同一张脸，睁眼/微笑概率固定
    pub fn constant(eye_open: f32, smiling: f32) -> Self {
        Self::with_pattern(move |_| {
            Ok(vec![DetectedFace::new(BoundingBox::new(100.0, 100.0, 300.0, 340.0))
                .with_eyes(eye_open, eye_open)
                .with_smile(smiling)])
        })
    }

    pub fn failing() -> Self {
        Self::with_pattern(|index| Err(DetectionError::Failed(format!("frame {} rejected", index))))
    }
}

impl Default for MockFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceDetector for MockFaceDetector {
    fn name(&self) -> &str {
        "mock"
    }

    fn detect(&self, frame: &CapturedFrame) -> Result<Vec<DetectedFace>, DetectionError> {
        match &self.pattern {
            Some(pattern) => pattern(frame.frame_index),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_area() {
        let bbox = BoundingBox::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(bbox.width(), 100.0);
        assert_eq!(bbox.height(), 50.0);
        assert_eq!(bbox.area(), 5000.0);

        let inverted = BoundingBox::new(50.0, 50.0, 10.0, 10.0);
        assert_eq!(inverted.area(), 0.0);
    }

    #[test]
    fn test_mock_detector_pattern() {
        let detector = MockFaceDetector::with_pattern(|n| {
            if n % 2 == 0 {
                Ok(vec![DetectedFace::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0))])
            } else {
                Ok(Vec::new())
            }
        });

        let even = CapturedFrame::filled(4, 4, 0, 0, 2);
        let odd = CapturedFrame::filled(4, 4, 0, 200, 3);
        assert_eq!(detector.detect(&even).unwrap().len(), 1);
        assert!(detector.detect(&odd).unwrap().is_empty());
    }

    #[test]
    fn test_failing_mock() {
        let detector = MockFaceDetector::failing();
        let frame = CapturedFrame::filled(4, 4, 0, 0, 7);
        assert!(detector.detect(&frame).is_err());
    }

    #[test]
    fn test_session_exposes_detector() {
        let session = DetectorSession::open(Box::new(MockFaceDetector::constant(0.9, 0.9)));
        assert_eq!(session.detector().name(), "mock");
        session.close();
    }
}
