//! 图像预处理: 字节流 -> 解码 -> 8-bit 灰度 -> 双线性缩放至 `resolution × resolution` -> `[0, 1]` 归一化.

use crate::landmarks::ImageSize;
use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array2;
use std::fmt::Formatter;

/// 预处理错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    /// 输入为空.
    Empty,

    /// 图像解码失败. 参数为底层错误信息.
    Image(String),

    /// 目标分辨率为 0.
    ZeroResolution,
}

impl std::fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessError::Empty => f.write_str("输入图像为空"),
            PreprocessError::Image(e) => write!(f, "无法解码图像: {e}"),
            PreprocessError::ZeroResolution => f.write_str("目标分辨率为 0"),
        }
    }
}

impl std::error::Error for PreprocessError {}

/// 模型输入: 形状为 `(resolution, resolution)` 的灰度数组, 取值 `[0, 1]`.
pub type ModelPixels = Array2<f32>;

/// 将编码后的图像 (PNG, JPEG, ...) 转换为模型输入, 同时返回原图尺寸.
pub fn preprocess_image(bytes: &[u8], resolution: u32) -> Result<(ModelPixels, ImageSize), PreprocessError> {
    if bytes.is_empty() {
        return Err(PreprocessError::Empty);
    }
    if resolution == 0 {
        return Err(PreprocessError::ZeroResolution);
    }
    let img = image::load_from_memory(bytes).map_err(|e| PreprocessError::Image(e.to_string()))?;
    let size = ImageSize::new(img.width(), img.height())
        .map_err(|e| PreprocessError::Image(e.to_string()))?;
    let gray = imageops::resize(&img.into_luma8(), resolution, resolution, FilterType::Triangle);
    Ok((normalize(&gray), size))
}

/// 8-bit 灰度 -> `[0, 1]`, 索引为 `(h, w)`.
pub fn normalize(gray: &GrayImage) -> ModelPixels {
    let (w, h) = gray.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
        gray.get_pixel(x as u32, y as u32).0[0] as f32 / 255.0
    })
}
