//! # 图像读写模块
//!
//! 将图像文件解码为 `RgbImage`，以及将结果以无损格式保存。
//! 隐写数据只存在于通道的最低有效位，任何有损压缩 (如 JPEG) 都会将其破坏，
//! 因此输出格式被限制为无损格式。

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use log::debug;
use std::path::Path;

/// 支持的无损输出格式。
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Bmp,
    Tiff,
    /// 使用无损 WebP 编码器。
    Webp,
    Qoi,
}

impl OutputFormat {
    pub fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::Webp => ImageFormat::WebP,
            OutputFormat::Qoi => ImageFormat::Qoi,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Webp => "webp",
            OutputFormat::Qoi => "qoi",
        }
    }

    fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::Bmp => Some(OutputFormat::Bmp),
            ImageFormat::Tiff => Some(OutputFormat::Tiff),
            ImageFormat::WebP => Some(OutputFormat::Webp),
            ImageFormat::Qoi => Some(OutputFormat::Qoi),
            _ => None,
        }
    }
}

/// 决定输出格式。
///
/// 优先使用显式指定的格式；否则根据目标路径的扩展名推断；
/// 两者都没有时默认为 PNG。
///
/// # Errors
///
/// 目标扩展名对应有损格式或无法识别时返回错误。
pub fn resolve_format(dest: Option<&Path>, requested: Option<OutputFormat>) -> Result<OutputFormat> {
    if let Some(format) = requested {
        return Ok(format);
    }

    let Some(dest) = dest else {
        return Ok(OutputFormat::Png);
    };

    let image_format = ImageFormat::from_path(dest).with_context(|| {
        format!(
            "Unable to determine the output format from: {}",
            dest.to_string_lossy().red().bold()
        )
    })?;

    OutputFormat::from_image_format(image_format).with_context(|| {
        format!(
            "Output format {} is not lossless and would destroy the hidden text. \nChoose one of png, bmp, tiff, webp or qoi.",
            format!("{image_format:?}").red().bold()
        )
    })
}

/// 将任意像素格式强制转换为 8 位 RGB，丢弃 alpha 等其他通道。
///
/// 返回新的图像，不改动调用方的输入。
pub fn to_rgb(image: DynamicImage) -> RgbImage {
    debug!("Converting {:?} image to RGB8", image.color());
    image.into_rgb8()
}

/// 打开图像文件并转换为 RGB。
///
/// 格式根据文件内容猜测，而不仅依赖扩展名。
pub fn open_rgb(path: &Path) -> Result<RgbImage> {
    let image = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .with_context(|| {
            format!(
                "Unable to read image file: {}",
                path.to_string_lossy().red().bold()
            )
        })?
        .decode()
        .with_context(|| {
            format!(
                "Unable to decode image file: {}",
                path.to_string_lossy().red().bold()
            )
        })?;

    Ok(to_rgb(image))
}

/// 以指定的无损格式保存图像。
pub fn save_lossless(image: &RgbImage, path: &Path, format: OutputFormat) -> Result<()> {
    debug!(
        "Saving {}x{} image as {:?}",
        image.width(),
        image.height(),
        format
    );

    image
        .save_with_format(path, format.image_format())
        .with_context(|| {
            format!(
                "Unable to write to target image file: {}",
                path.to_string_lossy().red().bold()
            )
        })
}
