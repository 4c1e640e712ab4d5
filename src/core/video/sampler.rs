//! 定间隔抽帧 - 惰性迭代，资源在所有退出路径上释放

use super::frame::CapturedFrame;
use super::source::VideoSource;
use crate::core::cancel::CancelFlag;
use log::{debug, info, warn};

pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 200;

pub struct FrameSampler<S: VideoSource> {
    source: S,
    interval_ms: u64,
    duration_ms: u64,
    next_tick_ms: u64,
    next_index: u32,
    failed_ticks: u32,
    cancel: Option<CancelFlag>,
    finished: bool,
}

impl<S: VideoSource> FrameSampler<S> {
    pub fn new(source: S) -> Self {
        Self::with_interval(source, DEFAULT_SAMPLE_INTERVAL_MS)
    }

    pub fn with_interval(source: S, interval_ms: u64) -> Self {
        let duration_ms = source.duration_ms();
        debug!(
            "🎬 FrameSampler: duration {}ms, interval {}ms",
            duration_ms, interval_ms
        );
        Self {
            source,
            interval_ms: interval_ms.max(1),
            duration_ms,
            next_tick_ms: 0,
            next_index: 0,
            failed_ticks: 0,
            cancel: None,
            finished: false,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// 最多能产出的帧数：ceil(时长 / 间隔)
    pub fn max_frames(&self) -> u64 {
        self.duration_ms.div_ceil(self.interval_ms)
    }

    pub fn failed_ticks(&self) -> u32 {
        self.failed_ticks
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.source.release();
            info!(
                "🎬 FrameSampler: extracted {} frames ({} ticks failed)",
                self.next_index, self.failed_ticks
            );
        }
    }
}

impl<S: VideoSource> Iterator for FrameSampler<S> {
    type Item = CapturedFrame;

    fn next(&mut self) -> Option<CapturedFrame> {
        while !self.finished {
            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                debug!("FrameSampler: cancelled at {}ms", self.next_tick_ms);
                self.finish();
                break;
            }
            if self.next_tick_ms >= self.duration_ms {
                self.finish();
                break;
            }

            let tick = self.next_tick_ms;
            self.next_tick_ms += self.interval_ms;

            match self.source.frame_at(tick) {
                Ok(image) => {
                    let frame = CapturedFrame::new(image, tick, self.next_index);
                    self.next_index += 1;
                    return Some(frame);
                }
                Err(e) => {
                    warn!("⚠️ Failed to extract frame at {}ms: {}", tick, e);
                    self.failed_ticks += 1;
                }
            }
        }
        None
    }
}

impl<S: VideoSource> Drop for FrameSampler<S> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video::frame::{DecodeError, RawFrame};
    use crate::core::video::source::RecordedVideo;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Synthetic source that fails on chosen ticks and counts releases.
    struct ScriptedSource {
        duration_ms: u64,
        fail_at: Vec<u64>,
        releases: Arc<AtomicUsize>,
    }

    impl VideoSource for ScriptedSource {
        fn duration_ms(&self) -> u64 {
            self.duration_ms
        }

        fn frame_at(&mut self, timestamp_ms: u64) -> Result<RgbaImage, DecodeError> {
            if self.fail_at.contains(&timestamp_ms) {
                return Err(DecodeError::Unavailable(timestamp_ms));
            }
            Ok(RgbaImage::from_pixel(4, 4, Rgba([10, 10, 10, 255])))
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn scripted(duration_ms: u64, fail_at: Vec<u64>) -> (ScriptedSource, Arc<AtomicUsize>) {
        let releases = Arc::new(AtomicUsize::new(0));
        (
            ScriptedSource {
                duration_ms,
                fail_at,
                releases: releases.clone(),
            },
            releases,
        )
    }

    #[test]
    fn test_ten_second_video_yields_fifty_frames() {
        let (source, releases) = scripted(10_000, vec![]);
        let sampler = FrameSampler::new(source);
        assert_eq!(sampler.max_frames(), 50);

        let frames: Vec<_> = sampler.collect();
        assert_eq!(frames.len(), 50);
        assert_eq!(frames[49].timestamp_ms, 9_800);
        assert!(frames.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_partial_interval_rounds_up() {
        let (source, _) = scripted(1_050, vec![]);
        let frames: Vec<_> = FrameSampler::new(source).collect();
        assert_eq!(frames.len(), 6);
    }

    #[test]
    fn test_decode_failures_are_skipped() {
        let (source, _) = scripted(1_000, vec![200, 600]);
        let mut sampler = FrameSampler::new(source);
        let frames: Vec<_> = sampler.by_ref().collect();

        let stamps: Vec<u64> = frames.iter().map(|f| f.timestamp_ms).collect();
        assert_eq!(stamps, vec![0, 400, 800]);
        let indices: Vec<u32> = frames.iter().map(|f| f.frame_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(sampler.failed_ticks(), 2);
    }

    #[test]
    fn test_zero_duration_is_empty() {
        let (source, releases) = scripted(0, vec![]);
        assert_eq!(FrameSampler::new(source).count(), 0);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_early_drop_releases_source() {
        let (source, releases) = scripted(5_000, vec![]);
        {
            let mut sampler = FrameSampler::new(source);
            sampler.next();
            sampler.next();
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_stops_sampling() {
        let (source, releases) = scripted(5_000, vec![]);
        let cancel = CancelFlag::new();
        let mut sampler = FrameSampler::new(source).with_cancel(cancel.clone());

        assert!(sampler.next().is_some());
        cancel.cancel();
        assert!(sampler.next().is_none());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_recorded_video_with_corrupt_frame() {
        let mut broken = RawFrame::grey(8, 8, 50, 200);
        broken.v_plane.clear();
        let frames = vec![
            RawFrame::grey(8, 8, 50, 0),
            broken,
            RawFrame::grey(8, 8, 50, 400),
        ];
        let video = RecordedVideo::with_duration(frames, 600);

        let sampled: Vec<_> = FrameSampler::new(video).collect();
        let stamps: Vec<u64> = sampled.iter().map(|f| f.timestamp_ms).collect();
        assert_eq!(stamps, vec![0, 400]);
    }
}
