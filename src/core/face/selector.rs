use super::scorer::ScoredFrame;
use log::debug;
use std::cmp::Ordering;

pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;
pub const DEFAULT_MAX_SELECTED: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct SelectionCriteria {
    pub min_confidence: f32,
    pub max_selected: usize,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_selected: DEFAULT_MAX_SELECTED,
        }
    }
}

/// 保留置信度超过阈值的清晰帧，取置信度最高的若干帧，再按时间排序
pub fn select_best_frames(scored: &[ScoredFrame], criteria: &SelectionCriteria) -> Vec<ScoredFrame> {
    let mut candidates: Vec<&ScoredFrame> = scored
        .iter()
        .filter(|s| !s.is_blurry && s.confidence > criteria.min_confidence)
        .collect();
    debug!(
        "Selecting from {} scored frames, {} pass the filter",
        scored.len(),
        candidates.len()
    );

    // stable: equal confidence keeps the earlier frame first
    candidates.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));
    candidates.truncate(criteria.max_selected);
    candidates.sort_by_key(|s| s.frame.timestamp_ms);

    debug!("Final selected frames: {}", candidates.len());
    candidates.into_iter().cloned().collect()
}
