//! 逐帧质量评分：人脸检测 + 置信度 + 模糊 + 光照

use super::detector::{DetectedFace, FaceDetector};
use crate::core::cancel::CancelFlag;
use crate::core::video::CapturedFrame;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};

/// 检测器不提供整体置信度，用固定基线参与平均
pub const BASELINE_CONFIDENCE: f32 = 0.8;
const MISSING_PROBABILITY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightingQuality {
    Poor,
    Adequate,
    Good,
}

impl LightingQuality {
    pub fn from_brightness(brightness: f32) -> Self {
        if brightness < 50.0 {
            LightingQuality::Poor
        } else if brightness < 150.0 {
            LightingQuality::Adequate
        } else {
            LightingQuality::Good
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LightingQuality::Poor => "poor",
            LightingQuality::Adequate => "adequate",
            LightingQuality::Good => "good",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredFrame {
    pub frame: CapturedFrame,
    pub face: DetectedFace,
    pub confidence: f32,
    pub is_blurry: bool,
    pub lighting: LightingQuality,
}

/// (基线 + 平均睁眼概率 + 微笑概率) / 3，缺失的概率按 0.5 计
pub fn face_confidence(face: &DetectedFace) -> f32 {
    let left = face.left_eye_open.unwrap_or(MISSING_PROBABILITY);
    let right = face.right_eye_open.unwrap_or(MISSING_PROBABILITY);
    let eyes = (left + right) / 2.0;
    let smile = face.smiling.unwrap_or(MISSING_PROBABILITY);

    (BASELINE_CONFIDENCE + eyes + smile) / 3.0
}

pub trait BlurPolicy: Send + Sync {
    fn is_blurry(&self, frame: &CapturedFrame) -> bool;
}

/// 所有帧都视为清晰
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverBlurry;

impl BlurPolicy for NeverBlurry {
    fn is_blurry(&self, _frame: &CapturedFrame) -> bool {
        false
    }
}

/// 基于亮度梯度的边缘密度判断模糊：边缘像素占比过低即视为模糊
#[derive(Debug, Clone, Copy)]
pub struct GradientBlurPolicy {
    pub gradient_threshold: i32,
    pub min_edge_density: f32,
}

impl Default for GradientBlurPolicy {
    fn default() -> Self {
        Self {
            gradient_threshold: 20,
            min_edge_density: 0.02,
        }
    }
}

impl GradientBlurPolicy {
    pub fn edge_density(&self, luma: &[u8], width: u32, height: u32) -> f32 {
        let w = width as usize;
        let h = height as usize;
        if w < 3 || h < 3 || luma.len() < w * h {
            return 0.0;
        }

        // every 2nd pixel
        let skip = 2;
        let threshold_squared = self.gradient_threshold * self.gradient_threshold;
        let mut edge_count = 0u32;
        let mut total = 0u32;

        for y in (1..(h - 1)).step_by(skip) {
            for x in (1..(w - 1)).step_by(skip) {
                let idx = y * w + x;
                let gx = luma[idx + 1] as i32 - luma[idx - 1] as i32;
                let gy = luma[idx + w] as i32 - luma[idx - w] as i32;
                if gx * gx + gy * gy > threshold_squared {
                    edge_count += 1;
                }
                total += 1;
            }
        }

        if total == 0 {
            0.0
        } else {
            edge_count as f32 / total as f32
        }
    }
}

impl BlurPolicy for GradientBlurPolicy {
    fn is_blurry(&self, frame: &CapturedFrame) -> bool {
        let density = self.edge_density(&frame.luma(), frame.width(), frame.height());
        density < self.min_edge_density
    }
}

pub struct QualityScorer {
    blur_policy: Box<dyn BlurPolicy>,
    pool: Option<rayon::ThreadPool>,
}

impl QualityScorer {
    pub fn new() -> Self {
        Self::with_blur_policy(Box::new(NeverBlurry))
    }

    pub fn with_blur_policy(blur_policy: Box<dyn BlurPolicy>) -> Self {
        let num_threads = num_cpus::get().min(4);
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("face-score-{}", i))
            .build()
        {
            Ok(pool) => {
                debug!("Using {} threads for face scoring", num_threads);
                Some(pool)
            }
            Err(e) => {
                warn!("⚠️ Scoring pool unavailable, using global pool: {}", e);
                None
            }
        };

        Self { blur_policy, pool }
    }

    /// 单帧评分，`None` 表示没有可用人脸（检测失败或 panic 也算）
    pub fn score_frame(&self, frame: CapturedFrame, detector: &dyn FaceDetector) -> Option<ScoredFrame> {
        let detection = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(&frame)));

        let faces = match detection {
            Ok(Ok(faces)) => faces,
            Ok(Err(e)) => {
                warn!("⚠️ Face detection failed on frame {}: {}", frame.frame_index, e);
                return None;
            }
            Err(_) => {
                warn!("⚠️ Face detector panicked on frame {}", frame.frame_index);
                return None;
            }
        };

        debug!("Frame {}: detected {} faces", frame.frame_index, faces.len());
        let face = faces.into_iter().next()?;

        let confidence = face_confidence(&face);
        let is_blurry = self.blur_policy.is_blurry(&frame);
        let lighting = LightingQuality::from_brightness(frame.mean_brightness());

        Some(ScoredFrame {
            frame,
            face,
            confidence,
            is_blurry,
            lighting,
        })
    }

    /// 在线程池上并行检测，结果按时间戳排序，与完成顺序无关
    pub fn score_frames(
        &self,
        frames: Vec<CapturedFrame>,
        detector: &dyn FaceDetector,
        cancel: Option<&CancelFlag>,
    ) -> Vec<ScoredFrame> {
        let total = frames.len();
        let run = || {
            frames
                .into_par_iter()
                .filter_map(|frame| {
                    if cancel.is_some_and(|c| c.is_cancelled()) {
                        return None;
                    }
                    self.score_frame(frame, detector)
                })
                .collect::<Vec<_>>()
        };

        let mut scored = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };
        scored.sort_by_key(|s| s.frame.timestamp_ms);

        info!("🙂 Scored frames with faces: {}/{}", scored.len(), total);
        scored
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}
