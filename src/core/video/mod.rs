//! 视频抽帧 - 按固定间隔从录制视频中采样

pub mod frame;
pub mod sampler;
pub mod source;

pub use frame::{CapturedFrame, DecodeError, RawFrame};
pub use sampler::{FrameSampler, DEFAULT_SAMPLE_INTERVAL_MS};
pub use source::{RecordedVideo, VideoSource};
