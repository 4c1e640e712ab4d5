use image::{Rgba, RgbaImage};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("corrupt frame at {timestamp_ms}ms: {reason}")]
    CorruptFrame { timestamp_ms: u64, reason: String },
    #[error("no frame available at {0}ms")]
    Unavailable(u64),
    #[error("video source already released")]
    Released,
}

/// 从视频中采样得到的一帧
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub image: RgbaImage,
    pub timestamp_ms: u64,
    pub frame_index: u32,
}

impl CapturedFrame {
    pub fn new(image: RgbaImage, timestamp_ms: u64, frame_index: u32) -> Self {
        Self {
            image,
            timestamp_ms,
            frame_index,
        }
    }

    /// 纯色帧，用于合成输入
    pub fn filled(width: u32, height: u32, value: u8, timestamp_ms: u64, frame_index: u32) -> Self {
        let image = RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]));
        Self::new(image, timestamp_ms, frame_index)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// 平均亮度 (r+g+b)/3，范围 0-255
    pub fn mean_brightness(&self) -> f32 {
        let count = self.pixel_count();
        if count == 0 {
            return 0.0;
        }
        let sum: u64 = self
            .image
            .pixels()
            .map(|p| (p[0] as u64 + p[1] as u64 + p[2] as u64) / 3)
            .sum();
        sum as f32 / count as f32
    }

    /// BT.601 亮度平面，每像素一字节
    pub fn luma(&self) -> Vec<u8> {
        self.image
            .pixels()
            .map(|p| ((p[0] as u32 * 299 + p[1] as u32 * 587 + p[2] as u32 * 114) / 1000) as u8)
            .collect()
    }
}

/// 从原生相机层传递的 YUV420 平面帧
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub timestamp_ms: u64,
}

impl RawFrame {
    /// 中性色度的灰度帧
    pub fn grey(width: u32, height: u32, luma: u8, timestamp_ms: u64) -> Self {
        let chroma_len = width.div_ceil(2) as usize * height.div_ceil(2) as usize;
        Self {
            width,
            height,
            y_plane: vec![luma; width as usize * height as usize],
            u_plane: vec![128; chroma_len],
            v_plane: vec![128; chroma_len],
            timestamp_ms,
        }
    }

    fn validate(&self) -> Result<(), DecodeError> {
        let corrupt = |reason: String| DecodeError::CorruptFrame {
            timestamp_ms: self.timestamp_ms,
            reason,
        };

        if self.width == 0 || self.height == 0 {
            return Err(corrupt(format!("empty dimensions {}x{}", self.width, self.height)));
        }
        // 尺寸来自宿主，按 u64 计算平面长度
        let luma_len = plane_len(self.width, self.height)
            .ok_or_else(|| corrupt(format!("dimensions {}x{} too large", self.width, self.height)))?;
        if self.y_plane.len() < luma_len {
            return Err(corrupt(format!(
                "y plane has {} bytes, expected {}",
                self.y_plane.len(),
                luma_len
            )));
        }
        let chroma_len = plane_len(self.width.div_ceil(2), self.height.div_ceil(2))
            .ok_or_else(|| corrupt(format!("dimensions {}x{} too large", self.width, self.height)))?;
        if self.u_plane.len() < chroma_len || self.v_plane.len() < chroma_len {
            return Err(corrupt(format!(
                "chroma planes have {}/{} bytes, expected {}",
                self.u_plane.len(),
                self.v_plane.len(),
                chroma_len
            )));
        }
        Ok(())
    }

    pub fn to_rgba(&self) -> Result<RgbaImage, DecodeError> {
        self.validate()?;

        let width = self.width as usize;
        let chroma_width = self.width.div_ceil(2) as usize;
        let mut rgba = RgbaImage::new(self.width, self.height);

        for (x, y, pixel) in rgba.enumerate_pixels_mut() {
            let (x, y) = (x as usize, y as usize);
            let y_idx = y * width + x;
            let uv_idx = (y / 2) * chroma_width + x / 2;

            let y_val = self.y_plane[y_idx] as f32;
            let u_val = self.u_plane[uv_idx] as f32 - 128.0;
            let v_val = self.v_plane[uv_idx] as f32 - 128.0;

            let r = (y_val + 1.402 * v_val).clamp(0.0, 255.0) as u8;
            let g = (y_val - 0.344136 * u_val - 0.714136 * v_val).clamp(0.0, 255.0) as u8;
            let b = (y_val + 1.772 * u_val).clamp(0.0, 255.0) as u8;

            *pixel = Rgba([r, g, b, 255]);
        }

        Ok(rgba)
    }
}

/// w*h 字节数，超出 usize 时返回 None
fn plane_len(width: u32, height: u32) -> Option<usize> {
    (width as u64)
        .checked_mul(height as u64)
        .and_then(|len| usize::try_from(len).ok())
}
