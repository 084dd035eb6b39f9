//! # 隐写核心算法模块
//!
//! 负责容量计算、长度帧封装、比特拆分/打包，以及按像素通道写入和读取最低有效位。
//! 本模块不做任何 I/O，只处理内存中的 `RgbImage`。
//!
//! 帧格式：4 字节大端序长度 `N` (负载字节数) + `N` 字节 UTF-8 文本，共 `32 + 8N` 比特。
//! 像素按行优先顺序访问，每个像素依次写入 R、G、B 三个通道，每字节高位在前。

use crate::constants::{CHANNELS_PER_PIXEL, HEADER_BITS, HEADER_BYTES, LSB_MASK};
use image::RgbImage;
use log::debug;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StegoError>;

/// 编码与解码过程中可能出现的错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StegoError {
    /// 帧的比特数超过了图像容量，图像未被修改。
    #[error("Message too large. Need {required} bits but only {available} bits available.")]
    CapacityExceeded { required: u64, available: u64 },

    /// 负载超过 32 位长度头部所能表示的最大值。
    #[error("Message of {len} bytes cannot be described by a 32-bit length header.")]
    PayloadTooLong { len: usize },

    /// 图像连长度头部都放不下。
    #[error("Image too small or invalid for decoding: {capacity} bits available, 32 required.")]
    UndersizedImage { capacity: u64 },

    /// 头部声明的长度超出了图像所含的比特数。
    #[error(
        "Encoded payload of {declared} bytes exceeds image capacity of {available} bits or the image was not encoded with this tool."
    )]
    TruncatedOrForeignData { declared: u32, available: u64 },

    #[error("Bit length must be a multiple of 8, got {len}.")]
    UnalignedBits { len: usize },
}

/// 负载文本实际采用的解码方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// 负载不是合法的 UTF-8，逐字节映射为 U+0000..=U+00FF。
    Latin1,
}

/// `encode` 的结果：新的图像以及使用的比特数和总容量。
#[derive(Debug, Clone)]
pub struct Encoded {
    pub image: RgbImage,
    pub used_bits: u64,
    pub capacity_bits: u64,
}

/// `decode_detailed` 的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub text: String,
    pub encoding: TextEncoding,
}

/// 图像可嵌入的比特数：每个像素 3 个通道，每个通道 1 比特。
pub fn capacity(image: &RgbImage) -> u64 {
    let (width, height) = image.dimensions();
    u64::from(width) * u64::from(height) * CHANNELS_PER_PIXEL
}

/// 负载为 `payload_len` 字节时整个帧所需的比特数。
pub fn frame_bits(payload_len: u64) -> u64 {
    HEADER_BITS + 8 * payload_len
}

/// 将字节展开为比特序列 (每个元素为 0 或 1)，每字节高位在前。
pub fn bytes_to_bits(data: &[u8]) -> Vec<u8> {
    data.iter()
        .flat_map(|&byte| (0..8).rev().map(move |i| (byte >> i) & LSB_MASK))
        .collect()
}

/// `bytes_to_bits` 的逆操作。比特数必须是 8 的倍数。
pub fn bits_to_bytes(bits: &[u8]) -> Result<Vec<u8>> {
    if bits.len() % 8 != 0 {
        return Err(StegoError::UnalignedBits { len: bits.len() });
    }

    Ok(bits
        .chunks_exact(8)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0u8, |byte, &bit| (byte << 1) | (bit & LSB_MASK))
        })
        .collect())
}

/// 构造帧：4 字节大端序长度头部，后接负载本身。
pub fn build_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(payload.len())
        .map_err(|_| StegoError::PayloadTooLong { len: payload.len() })?;

    let mut frame = Vec::with_capacity(HEADER_BYTES + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

// 编码和解码共用同一访问顺序：行优先的像素，像素内 R、G、B。
fn channels(image: &RgbImage) -> impl Iterator<Item = u8> + '_ {
    image.pixels().flat_map(|pixel| pixel.0)
}

fn channels_mut(image: &mut RgbImage) -> impl Iterator<Item = &mut u8> + '_ {
    image.pixels_mut().flat_map(|pixel| pixel.0.iter_mut())
}

/// 将 `message` 以 UTF-8 帧的形式写入图像通道的最低有效位。
///
/// 返回修改后的副本，原图像保持不变。容量检查在修改任何通道之前完成，
/// 失败时不会产生半写入的图像。
///
/// # Errors
///
/// * `CapacityExceeded` - 帧的比特数超过 `capacity(image)`。
/// * `PayloadTooLong` - 消息超过 `u32::MAX` 字节。
pub fn encode(image: &RgbImage, message: &str) -> Result<Encoded> {
    let payload = message.as_bytes();
    let capacity_bits = capacity(image);
    let used_bits = frame_bits(payload.len() as u64);

    if used_bits > capacity_bits {
        return Err(StegoError::CapacityExceeded {
            required: used_bits,
            available: capacity_bits,
        });
    }

    let bits = bytes_to_bits(&build_frame(payload)?);
    debug!(
        "Embedding {} bytes of payload ({} of {} bits)",
        payload.len(),
        used_bits,
        capacity_bits
    );

    let mut stego = image.clone();
    channels_mut(&mut stego)
        .zip(bits)
        .for_each(|(channel, bit)| *channel = (*channel & !LSB_MASK) | bit);

    Ok(Encoded {
        image: stego,
        used_bits,
        capacity_bits,
    })
}

/// 从图像中读取由 `encode` 嵌入的文本。
///
/// 负载不是合法 UTF-8 时不会报错，而是按字节回退为 Latin-1 文本。
/// 需要区分这两种情况时使用 `decode_detailed`。
pub fn decode(image: &RgbImage) -> Result<String> {
    decode_detailed(image).map(|recovered| recovered.text)
}

/// 与 `decode` 相同，但同时报告文本采用的解码方式。
///
/// # Errors
///
/// * `UndersizedImage` - 图像容量小于 32 比特。
/// * `TruncatedOrForeignData` - 头部声明的长度超出图像容量。
pub fn decode_detailed(image: &RgbImage) -> Result<Recovered> {
    let available = capacity(image);
    if available < HEADER_BITS {
        return Err(StegoError::UndersizedImage {
            capacity: available,
        });
    }

    let mut bits = channels(image).map(|channel| channel & LSB_MASK);

    let header_bits: Vec<u8> = bits.by_ref().take(HEADER_BITS as usize).collect();
    let mut header = [0u8; HEADER_BYTES];
    header.copy_from_slice(&bits_to_bytes(&header_bits)?);
    let declared = u32::from_be_bytes(header);

    let required = frame_bits(u64::from(declared));
    if required > available {
        return Err(StegoError::TruncatedOrForeignData {
            declared,
            available,
        });
    }

    let payload_bits: Vec<u8> = bits.take((required - HEADER_BITS) as usize).collect();
    let payload = bits_to_bytes(&payload_bits)?;
    debug!("Recovered {} bytes of payload", payload.len());

    let recovered = match String::from_utf8(payload) {
        Ok(text) => Recovered {
            text,
            encoding: TextEncoding::Utf8,
        },
        Err(err) => Recovered {
            text: err.into_bytes().into_iter().map(char::from).collect(),
            encoding: TextEncoding::Latin1,
        },
    };

    Ok(recovered)
}
