//! 选中帧压缩为 JPEG 并做 base64 编码

use super::scorer::ScoredFrame;
use crate::core::video::CapturedFrame;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageOutputFormat};
use std::io::Cursor;
use thiserror::Error;

pub const DEFAULT_JPEG_QUALITY: u8 = 80;
pub const DEFAULT_MAX_SIZE: (u32, u32) = (320, 240);

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("frame {0} has no pixels")]
    EmptyFrame(u32),
    #[error("JPEG compression failed: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub frame_index: u32,
    pub width: u32,
    pub height: u32,
    pub base64: String,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    pub quality: u8,
    pub max_size: Option<(u32, u32)>,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            max_size: Some(DEFAULT_MAX_SIZE),
        }
    }
}

/// 保持宽高比缩放到 `max` 以内，不放大
pub fn fit_within(width: u32, height: u32, max: (u32, u32)) -> (u32, u32) {
    let scale = (max.0 as f32 / width as f32)
        .min(max.1 as f32 / height as f32)
        .min(1.0);
    let w = ((width as f32 * scale).round() as u32).max(1);
    let h = ((height as f32 * scale).round() as u32).max(1);
    (w, h)
}

impl FrameEncoder {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            ..Default::default()
        }
    }

    pub fn encode_jpeg(&self, frame: &ScoredFrame) -> Result<(Vec<u8>, u32, u32), EncodeError> {
        self.encode_captured(&frame.frame)
    }

    /// 任意采样帧压缩为 JPEG，返回字节与输出尺寸
    pub fn encode_captured(&self, frame: &CapturedFrame) -> Result<(Vec<u8>, u32, u32), EncodeError> {
        let image = &frame.image;
        if image.width() == 0 || image.height() == 0 {
            return Err(EncodeError::EmptyFrame(frame.frame_index));
        }

        let (w, h) = match self.max_size {
            Some(max) => fit_within(image.width(), image.height(), max),
            None => (image.width(), image.height()),
        };
        let rgba = if (w, h) == image.dimensions() {
            image.clone()
        } else {
            image::imageops::resize(image, w, h, image::imageops::FilterType::Triangle)
        };
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

        let mut buffer = Cursor::new(Vec::new());
        rgb.write_to(&mut buffer, ImageOutputFormat::Jpeg(self.quality))?;
        Ok((buffer.into_inner(), w, h))
    }

    pub fn encode(&self, frame: &ScoredFrame) -> Result<EncodedFrame, EncodeError> {
        let (jpeg, width, height) = self.encode_jpeg(frame)?;
        Ok(EncodedFrame {
            frame_index: frame.frame.frame_index,
            width,
            height,
            base64: STANDARD.encode(jpeg),
        })
    }

    pub fn encode_all(&self, frames: &[ScoredFrame]) -> Result<Vec<EncodedFrame>, EncodeError> {
        frames.iter().map(|f| self.encode(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::face::detector::{BoundingBox, DetectedFace};
    use crate::core::face::scorer::LightingQuality;
    use crate::core::video::CapturedFrame;
    use image::{Rgba, RgbaImage};

    fn scored_frame(image: RgbaImage) -> ScoredFrame {
        ScoredFrame {
            frame: CapturedFrame::new(image, 0, 3),
            face: DetectedFace::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            confidence: 0.9,
            is_blurry: false,
            lighting: LightingQuality::Good,
        }
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        })
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(1920, 1080, (320, 240)), (320, 180));
        assert_eq!(fit_within(480, 640, (320, 240)), (180, 240));
        assert_eq!(fit_within(100, 50, (320, 240)), (100, 50));
    }

    #[test]
    fn test_decoded_dimensions_match() {
        let encoder = FrameEncoder::default();
        let encoded = encoder.encode(&scored_frame(gradient(640, 480))).unwrap();

        let bytes = STANDARD.decode(&encoded.base64).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (encoded.width, encoded.height));
        assert_eq!((encoded.width, encoded.height), (320, 240));
        assert_eq!(encoded.frame_index, 3);
    }

    #[test]
    fn test_small_frames_keep_size() {
        let encoder = FrameEncoder {
            max_size: None,
            ..Default::default()
        };
        let encoded = encoder.encode(&scored_frame(gradient(64, 48))).unwrap();
        let bytes = STANDARD.decode(&encoded.base64).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_default_encoder_does_not_enlarge() {
        let encoded = FrameEncoder::default()
            .encode(&scored_frame(gradient(100, 50)))
            .unwrap();
        assert_eq!((encoded.width, encoded.height), (100, 50));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let encoder = FrameEncoder::with_quality(80);
        let frame = scored_frame(gradient(120, 90));
        assert_eq!(
            encoder.encode(&frame).unwrap().base64,
            encoder.encode(&frame).unwrap().base64
        );
    }

    #[test]
    fn test_empty_frame_rejected() {
        let encoder = FrameEncoder::default();
        assert!(matches!(
            encoder.encode(&scored_frame(RgbaImage::new(0, 0))),
            Err(EncodeError::EmptyFrame(3))
        ));
    }
}
