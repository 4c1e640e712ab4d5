//! 视频资源 - 时长 + 按时间取帧

use super::frame::{DecodeError, RawFrame};
use image::RgbaImage;
use log::debug;

/// 录制视频的不透明句柄
///
/// `release` 必须幂等：抽帧结束时调用一次，drop 时可能再调用一次
pub trait VideoSource: Send {
    fn duration_ms(&self) -> u64;

    /// 解码离 `timestamp_ms` 最近的一帧
    fn frame_at(&mut self, timestamp_ms: u64) -> Result<RgbaImage, DecodeError>;

    fn release(&mut self);
}

/// 原生相机录制的帧序列（YUV420），按时间戳升序保存
pub struct RecordedVideo {
    frames: Vec<RawFrame>,
    duration_ms: u64,
    released: bool,
}

impl RecordedVideo {
    /// 时长 = 最后一帧时间戳 + 平均帧间隔
    pub fn new(mut frames: Vec<RawFrame>) -> Self {
        frames.sort_by_key(|f| f.timestamp_ms);
        let duration_ms = Self::infer_duration(&frames);
        Self {
            frames,
            duration_ms,
            released: false,
        }
    }

    pub fn with_duration(mut frames: Vec<RawFrame>, duration_ms: u64) -> Self {
        frames.sort_by_key(|f| f.timestamp_ms);
        Self {
            frames,
            duration_ms,
            released: false,
        }
    }

    fn infer_duration(frames: &[RawFrame]) -> u64 {
        match (frames.first(), frames.last()) {
            (Some(first), Some(last)) if frames.len() > 1 => {
                let span = last.timestamp_ms - first.timestamp_ms;
                last.timestamp_ms + span / (frames.len() as u64 - 1)
            }
            (Some(only), _) => only.timestamp_ms + 1,
            _ => 0,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn closest(&self, timestamp_ms: u64) -> Option<&RawFrame> {
        let idx = self.frames.partition_point(|f| f.timestamp_ms < timestamp_ms);
        let after = self.frames.get(idx);
        let before = idx.checked_sub(1).and_then(|i| self.frames.get(i));

        match (before, after) {
            (Some(b), Some(a)) => {
                if timestamp_ms - b.timestamp_ms <= a.timestamp_ms - timestamp_ms {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (Some(b), None) => Some(b),
            (None, a) => a,
        }
    }
}

impl VideoSource for RecordedVideo {
    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    fn frame_at(&mut self, timestamp_ms: u64) -> Result<RgbaImage, DecodeError> {
        if self.released {
            return Err(DecodeError::Released);
        }
        let raw = self
            .closest(timestamp_ms)
            .ok_or(DecodeError::Unavailable(timestamp_ms))?;
        raw.to_rgba()
    }

    fn release(&mut self) {
        if !self.released {
            debug!("RecordedVideo: releasing {} frames", self.frames.len());
            self.frames.clear();
            self.released = true;
        }
    }
}
