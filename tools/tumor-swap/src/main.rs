//! 用辅助任务的肿瘤预测替换多类分割中的肿瘤标签.
//!
//! 典型用法:
//!
//! ```text
//! tumor-swap --seg006 output/CaseID/task006/CaseID.nii.gz \
//!            --seg212 output/CaseID/task212/CaseID.nii.gz \
//!            --out    output/CaseID/CaseID_seg_final.nii.gz
//! ```
//!
//! 退出码: 0 成功; 2 形状不匹配; 1 其它错误.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{error, info, warn};

use seg_berry::consts::{label, AFFINE_ATOL};
use seg_berry::post_proc::{swap_label, SwapOutcome};
use seg_berry::{affine, NiftiHeaderAttr, SegLabel};

/// 形状不匹配的专用退出码, 便于上层脚本区分失败原因.
const EXIT_SHAPE_MISMATCH: i32 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "tumor-swap",
    about = "用辅助任务 (Task212 风格) 的肿瘤预测替换多类分割 (Task006 风格) 中的肿瘤标签",
    version
)]
struct Cli {
    /// 多类主预测文件 (.nii/.nii.gz).
    #[arg(long = "seg006", value_name = "FILE")]
    primary: PathBuf,

    /// 肿瘤辅助预测文件, 二值或多类, 值 > 0 记为肿瘤.
    #[arg(long = "seg212", value_name = "FILE")]
    secondary: PathBuf,

    /// 合并结果输出路径.
    #[arg(long, value_name = "FILE")]
    out: PathBuf,

    /// 主预测中肿瘤的标签值.
    #[arg(long = "tumor-label", default_value_t = label::TUMOR)]
    tumor_label: i16,

    /// 辅助预测为空时保留主预测的肿瘤标签 (默认: 清除).
    #[arg(long = "fallback-keep-primary")]
    fallback_keep_primary: bool,
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("Logger init error");
    let cli = Cli::parse();

    let primary = open_or_exit(&cli.primary);
    let secondary = open_or_exit(&cli.secondary);

    if primary.shape() != secondary.shape() {
        error!(
            "shape mismatch: primary {:?} vs secondary {:?}",
            primary.shape(),
            secondary.shape()
        );
        process::exit(EXIT_SHAPE_MISMATCH);
    }
    if !affine::allclose(&primary.affine(), &secondary.affine(), AFFINE_ATOL) {
        warn!("affines differ slightly; proceeding but ensure both tasks were run on the same staged inputs.");
    }

    let swapped = swap_label(
        primary.data(),
        secondary.data(),
        cli.tumor_label,
        cli.fallback_keep_primary,
    );
    let (merged, outcome) = match swapped {
        Ok(ans) => ans,
        Err(e) => {
            error!("{e}");
            process::exit(EXIT_SHAPE_MISMATCH);
        }
    };

    match outcome {
        SwapOutcome::Stamped(vox) => info!(
            "replaced tumor label {} using secondary mask (vox={vox}).",
            cli.tumor_label
        ),
        SwapOutcome::EmptyKept => {
            info!("secondary tumor empty -> keeping primary tumor unchanged (fallback enabled).")
        }
        SwapOutcome::EmptyCleared => {
            info!("secondary tumor empty -> removing tumor label from primary (fallback disabled).")
        }
    }

    let out = SegLabel::from_parts(primary.header(), merged);
    if let Err(e) = out.save(&cli.out) {
        error!("writing {} failed: {e}", cli.out.display());
        process::exit(1);
    }
    info!("wrote merged segmentation -> {}", cli.out.display());
}

fn open_or_exit(path: &Path) -> SegLabel {
    match SegLabel::open(path) {
        Ok(v) => v,
        Err(e) => {
            error!("cannot read {}: {e}", path.display());
            process::exit(1);
        }
    }
}
