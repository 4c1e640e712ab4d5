//! 采集元数据汇总（纯函数，不修改输入）

use super::scorer::{LightingQuality, ScoredFrame};
use crate::api::models::verification::{CaptureMetadata, DeviceInfo, FrameMetric};

/// 人脸面积按 1080p 画面归一化
const REFERENCE_AREA: f32 = 1920.0 * 1080.0;
const EYE_OPEN_THRESHOLD: f32 = 0.5;

pub const SELECTION_CRITERIA: &str = "confidence_and_quality_based";

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: String,
    pub user_id: String,
    pub started_at_ms: i64,
    pub capture_completed_at_ms: i64,
    pub device: DeviceInfo,
}

pub fn batch_criteria(batch_index: usize, total_batches: usize) -> String {
    format!("{}_batch_{}_of_{}", SELECTION_CRITERIA, batch_index + 1, total_batches)
}

/// 出现次数最多的光照等级，平局取先出现的
pub fn dominant_lighting(scored: &[ScoredFrame]) -> LightingQuality {
    let mut counts: Vec<(LightingQuality, usize)> = Vec::with_capacity(3);
    for s in scored {
        match counts.iter_mut().find(|(q, _)| *q == s.lighting) {
            Some((_, n)) => *n += 1,
            None => counts.push((s.lighting, 1)),
        }
    }

    let mut best: Option<(LightingQuality, usize)> = None;
    for (quality, count) in counts {
        if best.map_or(true, |(_, n)| count > n) {
            best = Some((quality, count));
        }
    }
    best.map(|(q, _)| q).unwrap_or(LightingQuality::Adequate)
}

pub fn frame_metric(scored: &ScoredFrame, compression_quality: u8) -> FrameMetric {
    let face = &scored.face;
    let left = face.left_eye_open.unwrap_or(0.5);
    let right = face.right_eye_open.unwrap_or(0.5);

    FrameMetric {
        frame_index: scored.frame.frame_index,
        timestamp_ms: scored.frame.timestamp_ms,
        face_confidence: scored.confidence,
        face_bounds: face.bounding_box,
        head_pose: face.head_pose,
        eyes_open: left > EYE_OPEN_THRESHOLD && right > EYE_OPEN_THRESHOLD,
        is_blurry: scored.is_blurry,
        compression_quality,
    }
}

/// 置信度与人脸尺寸统计覆盖全部评分帧，逐帧指标只覆盖 `selected`
pub fn build_metadata(
    session: &SessionInfo,
    original_frame_count: usize,
    scored: &[ScoredFrame],
    selected: &[ScoredFrame],
    criteria: &str,
    compression_quality: u8,
) -> CaptureMetadata {
    let (average, min, max) = if scored.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let sum: f64 = scored.iter().map(|s| s.confidence as f64).sum();
        let min = scored.iter().map(|s| s.confidence).fold(f32::INFINITY, f32::min);
        let max = scored.iter().map(|s| s.confidence).fold(f32::NEG_INFINITY, f32::max);
        ((sum / scored.len() as f64) as f32, min, max)
    };

    let average_face_size = if scored.is_empty() {
        0.0
    } else {
        let sum: f64 = scored
            .iter()
            .map(|s| (s.face.bounding_box.area() / REFERENCE_AREA) as f64)
            .sum();
        (sum / scored.len() as f64) as f32
    };

    CaptureMetadata {
        session_id: session.session_id.clone(),
        user_id: session.user_id.clone(),
        timestamp: session.started_at_ms,
        capture_completed_at: session.capture_completed_at_ms,
        total_capture_time_ms: session.capture_completed_at_ms - session.started_at_ms,
        original_frame_count,
        selected_frame_count: selected.len(),
        frame_selection_criteria: criteria.to_string(),
        average_face_confidence: average,
        min_face_confidence: min,
        max_face_confidence: max,
        average_face_size,
        lighting_quality: dominant_lighting(scored),
        device: session.device.clone(),
        orientation_changes: 0,
        frame_metrics: selected
            .iter()
            .map(|s| frame_metric(s, compression_quality))
            .collect(),
    }
}
