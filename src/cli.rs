//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。

use crate::imaging::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// 一款基于 LSB (最低有效位) 隐写术的命令行工具，将 UTF-8 文本逐比特写入图像 RGB 通道的最低位，并可完整恢复。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "一款基于 LSB (最低有效位) 隐写术的命令行工具，将 UTF-8 文本逐比特写入图像 RGB 通道的最低位，并可完整恢复。\n输出图像必须保存为无损格式 (PNG, BMP, TIFF, WebP, QOI)，否则隐藏的文本会被破坏。"
)]
pub struct Cli {
    /// 输出调试日志 (也可以通过 RUST_LOG 环境变量控制)。
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令：hide (隐藏)、recover (恢复) 和 capacity (容量)。
#[derive(Parser, Debug)]
pub enum Commands {
    /// 在图像中隐藏一段文本，结果以无损格式保存。
    Hide(HideArgs),

    /// 从经过隐写的图像中恢复隐藏的文本。
    Recover(RecoverArgs),

    /// 显示图像可以容纳的文本大小。
    Capacity(CapacityArgs),
}

/// 'hide' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct HideArgs {
    /// 用于隐写的输入图像文件路径，非 RGB 图像会被转换为 RGB。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 要隐藏的文本内容的文件路径 (UTF-8)。
    #[arg(short, long, conflicts_with = "message", required_unless_present = "message")]
    pub text: Option<PathBuf>,

    /// 直接在命令行中给出要隐藏的文本。
    #[arg(short, long)]
    pub message: Option<String>,

    /// 结果图像的输出路径。默认为输入图像同目录下的 `doctored_<文件名>`。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 输出格式。未指定时根据输出路径的扩展名推断，默认为 PNG。
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// 输出文件已存在时强制覆盖。
    #[arg(long)]
    pub force: bool,
}

/// 'recover' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct RecoverArgs {
    /// 已隐藏文本数据的图像文件路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 保存恢复文本的输出路径。默认为图像同目录下的 `recovered_<文件名>.txt`。
    #[arg(short, long, conflicts_with = "stdout")]
    pub text: Option<PathBuf>,

    /// 将恢复的文本直接打印到终端，而不是写入文件。
    #[arg(long)]
    pub stdout: bool,

    /// 输出文件已存在时强制覆盖。
    #[arg(long)]
    pub force: bool,
}

/// 'capacity' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct CapacityArgs {
    /// 要检查的图像文件路径。
    #[arg(short, long)]
    pub image: PathBuf,
}
