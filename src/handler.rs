//! # 命令处理逻辑模块
//!
//! 包含处理 `hide`、`recover` 和 `capacity` 子命令的高级业务逻辑。
//! 本模块负责协调文件 I/O、调用核心隐写算法以及向用户报告结果。

use crate::cli::{CapacityArgs, HideArgs, RecoverArgs};
use crate::constants::{DOCTORED_PREFIX, RECOVERED_PREFIX, payload_bytes};
use crate::imaging::{open_rgb, resolve_format, save_lossless};
use crate::steganography::{TextEncoding, capacity, decode_detailed, encode};
use anyhow::{Context, Result};
use colored::Colorize;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// 在源文件旁生成默认输出路径：`<目录>/<前缀><文件名>.<扩展名>`。
fn default_path(source: &Path, prefix: &str, extension: &str) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default().to_string_lossy();
    source.with_file_name(format!("{prefix}{stem}.{extension}"))
}

fn ensure_writable(path: &Path, force: bool) -> Result<()> {
    anyhow::ensure!(
        force || !path.exists(),
        "Output file already exists: {}. \nUse --force to overwrite it.",
        path.to_string_lossy().red().bold()
    );
    Ok(())
}

fn read_message(args: &HideArgs) -> Result<String> {
    match (&args.text, &args.message) {
        (Some(path), _) => fs::read_to_string(path).with_context(|| {
            format!(
                "Unable to read text file: {}",
                path.to_string_lossy().red().bold()
            )
        }),
        (None, Some(message)) => Ok(message.clone()),
        (None, None) => anyhow::bail!("Either a text file or a message must be given."),
    }
}

/// 处理 'Hide' 命令的执行逻辑。
///
/// 负责读取图像和文本、确定输出格式与路径、调用隐写核心函数写入文本，
/// 最后以无损格式保存结果图像并报告使用的容量。
///
/// # Arguments
///
/// * `args` - 包含输入/输出路径和选项的 `HideArgs` 结构体。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取输入的图像或文本文件。
/// * 文本为空。
/// * 输出格式不是无损格式。
/// * 输出文件已存在且未指定 `--force`。
/// * 图像没有足够的空间来隐藏文本。
/// * 无法写入到目标图像文件。
pub fn handle_hide(args: HideArgs) -> Result<()> {
    let message = read_message(&args)?;
    anyhow::ensure!(
        !message.is_empty(),
        "The message to hide is empty. \nPlease enter some text to encode."
    );

    let format = resolve_format(args.dest.as_deref(), args.format)?;
    let dest = args
        .dest
        .clone()
        .unwrap_or_else(|| default_path(&args.image, DOCTORED_PREFIX, format.extension()));
    ensure_writable(&dest, args.force)?;

    let cover = open_rgb(&args.image)?;
    info!(
        "Loaded {} ({}x{})",
        args.image.display(),
        cover.width(),
        cover.height()
    );

    let encoded = encode(&cover, &message).with_context(|| {
        format!(
            "Not enough space in the image to hide the text. \nRequired: {} bytes, Available: {} bytes",
            message.len().to_string().red().bold(),
            payload_bytes(capacity(&cover)).to_string().green().bold()
        )
    })?;

    save_lossless(&encoded.image, &dest, format)?;

    println!(
        "The text has been successfully hidden and saved: {}",
        dest.to_string_lossy().green().bold()
    );
    println!(
        "Used {} / {} bytes",
        payload_bytes(encoded.used_bits).to_string().green().bold(),
        payload_bytes(encoded.capacity_bits).to_string().green()
    );

    Ok(())
}

/// 处理 'Recover' 命令的执行逻辑。
///
/// 负责读取经过隐写的图像、调用恢复核心函数取得文本，
/// 然后将文本写入目标文件或直接打印到终端。
///
/// 隐藏的字节不是合法 UTF-8 时仍会输出 (按 Latin-1 逐字节解释)，并给出警告。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取输入的图像文件。
/// * 图像太小，或头部声明的长度超出图像容量。
/// * 输出文件已存在且未指定 `--force`。
/// * 无法写入到目标文本文件。
pub fn handle_recover(args: RecoverArgs) -> Result<()> {
    let dest = match (&args.text, args.stdout) {
        (_, true) => None,
        (Some(path), false) => Some(path.clone()),
        (None, false) => Some(default_path(&args.image, RECOVERED_PREFIX, "txt")),
    };
    if let Some(dest) = &dest {
        ensure_writable(dest, args.force)?;
    }

    let picture = open_rgb(&args.image)?;

    let recovered = decode_detailed(&picture).with_context(|| {
        format!(
            "Failed to recover the hidden text from '{}'. \nThe image may not contain a hidden message or is corrupted.",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    if recovered.encoding == TextEncoding::Latin1 {
        warn!("Recovered payload is not valid UTF-8, fell back to Latin-1");
        eprintln!(
            "{}",
            "Warning: the hidden bytes are not valid UTF-8 and were decoded as Latin-1. \nThe image may be corrupted."
                .yellow()
        );
    }

    match dest {
        Some(dest) => {
            fs::write(&dest, &recovered.text).with_context(|| {
                format!(
                    "Unable to write to target text file: {}",
                    dest.to_string_lossy().red().bold()
                )
            })?;

            println!(
                "The text has been successfully recovered and saved: {}",
                dest.to_string_lossy().green().bold()
            );
        }
        None => println!("{}", recovered.text),
    }

    Ok(())
}

/// 处理 'Capacity' 命令的执行逻辑。
///
/// 打印图像尺寸、可嵌入的比特数，以及扣除长度头部后大约能容纳的文本字节数。
pub fn handle_capacity(args: CapacityArgs) -> Result<()> {
    let picture = open_rgb(&args.image)?;
    let bits = capacity(&picture);

    println!(
        "{}: {}x{}, {} bits",
        args.image.to_string_lossy().bold(),
        picture.width(),
        picture.height(),
        bits
    );
    println!(
        "Approx. capacity: {} bytes",
        payload_bytes(bits).to_string().green().bold()
    );

    Ok(())
}
