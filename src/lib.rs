//! # lsb_text 库
//!
//! 本库包含 LSB 文本隐写工具的核心逻辑：
//! 隐写编解码 (`steganography`)、图像读写 (`imaging`) 以及命令行处理 (`cli`, `handler`)。

// 声明库包含的所有模块。

pub mod cli;
pub mod constants;
pub mod handler;
pub mod imaging;
pub mod steganography;
