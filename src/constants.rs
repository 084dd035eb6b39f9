/// 长度头部占用的比特数。
/// 头部是一个大端序的 `u32`，记录其后负载的字节数 (不是比特数)。
pub const HEADER_BITS: u64 = 32;

/// 长度头部占用的字节数。
pub const HEADER_BYTES: usize = 4;

/// 每个像素参与隐写的通道数，按 R、G、B 的顺序依次写入。
pub const CHANNELS_PER_PIXEL: u64 = 3;

/// 每个通道只替换最低有效位，高 7 位保持不变。
pub const LSB_MASK: u8 = 0x01;

/// 默认的输出图像文件名前缀，例如 `doctored_cat.png`。
pub const DOCTORED_PREFIX: &str = "doctored_";

/// 默认的恢复文本文件名前缀，例如 `recovered_doctored_cat.txt`。
pub const RECOVERED_PREFIX: &str = "recovered_";

/// 容量换算为字节数 (扣除长度头部)，用于向用户展示。
///
/// 容量不足以容纳头部时返回 0。
pub const fn payload_bytes(bits: u64) -> u64 {
    bits.saturating_sub(HEADER_BITS) / 8
}
