//! 将原始 case 目录暂存为 nnU-Net raw task 布局并生成 `dataset.json`.
//!
//! 退出码: 0 成功; 2 源目录中没有任何可暂存的 case; 1 其它错误.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use log::{error, info};

use seg_berry::staging::{curated, singles, CopyMode, StageError};

#[derive(Debug, Parser)]
#[command(
    name = "task-stage",
    about = "将 curated 批次或单鼠 triplet 目录物化为 nnU-Net raw task",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 从 curated 批次目录 (sXXXXX-LMR 后缀) 逐侧展开暂存
    Curated(CuratedArgs),
    /// 从单鼠 triplet 目录 (_0000/_0001/seg) 顺序编号暂存
    Singles(SinglesArgs),
}

#[derive(Debug, Args)]
struct CuratedArgs {
    /// curated 批次目录.
    #[arg(long, value_name = "DIR")]
    curated: PathBuf,

    /// 目标 nnU-Net raw task 目录.
    #[arg(long, value_name = "DIR")]
    dst: PathBuf,

    /// 任务名, 写入 dataset.json (如 "Task202_CT2PET_FT_LMR").
    #[arg(long = "task-name")]
    task_name: String,

    /// 模态名称序列, 如 CT PET. 省略时按通道数生成 channel_{i}.
    #[arg(long = "modality-names", num_args = 0..)]
    modality_names: Vec<String>,

    /// 标签文件名模式, 逗号分隔, 第一个命中者生效.
    #[arg(long = "label-globs", value_delimiter = ',', num_args = 0..)]
    label_globs: Vec<String>,

    /// 物化模式: symlink / hardlink / copy.
    #[arg(long = "copy-mode", default_value = "symlink", value_parser = CopyMode::parse)]
    mode: CopyMode,
}

#[derive(Debug, Args)]
struct SinglesArgs {
    /// 单鼠数据源目录. 省略时从 $NANOMASK_SINGLES_ROOT 或主目录解析.
    #[arg(long = "singles-root", value_name = "DIR")]
    singles_root: Option<PathBuf>,

    /// 任务编号, 如 207.
    #[arg(long = "task-id")]
    task_id: u32,

    /// 任务名后缀 (TaskXXX_ 之后的部分).
    #[arg(long = "task-name", default_value = "CT2PET_FT")]
    task_name: String,

    /// 物理拷贝而非符号链接.
    #[arg(long)]
    copy: bool,
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("Logger init error");
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        error!("{e}");
        process::exit(match e {
            StageError::NoCases => 2,
            _ => 1,
        });
    }
}

fn run(cmd: Command) -> Result<(), StageError> {
    match cmd {
        Command::Curated(a) => {
            let spec = curated::CuratedSpec {
                curated: a.curated,
                dst: a.dst.clone(),
                task_name: a.task_name,
                modality_names: a.modality_names,
                label_globs: a.label_globs,
                mode: a.mode,
            };
            let summary = curated::stage(&spec)?;
            info!("wrote {} cases to {}", summary.cases_written, a.dst.display());
            if summary.skipped_plain > 0 {
                info!(
                    "skipped {} plain folders without L/M/R flags.",
                    summary.skipped_plain
                );
            }
            if summary.unlabeled > 0 {
                info!("{} cases staged without label.", summary.unlabeled);
            }
            Ok(())
        }
        Command::Singles(a) => {
            let task_dirname = format!("Task{:03}_{}", a.task_id, a.task_name);
            let task_root = utils::raw_task_root(&task_dirname);
            let spec = singles::SinglesSpec {
                singles_root: a
                    .singles_root
                    .unwrap_or_else(utils::singles_root_from_env_or_home),
                task_root: task_root.clone(),
                task_dirname,
                mode: if a.copy {
                    CopyMode::Copy
                } else {
                    CopyMode::Symlink
                },
            };
            let summary = singles::stage(&spec)?;
            info!("staged {} cases at {}", summary.cases.len(), task_root.display());
            Ok(())
        }
    }
}
