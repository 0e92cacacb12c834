//! 对 `seg-berry::staging` 的更一层封装. 提供运行环境的根目录解析.

use seg_berry::staging;
use std::env;
use std::path::PathBuf;

/// 获取微调工作区根目录.
///
/// 1. 若环境变量 `$NANOMASK_FINETUNE_ROOT` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/NanoMask/finetuning_aug`.
pub fn finetune_root_from_env_or_home() -> PathBuf {
    if let Ok(d) = env::var("NANOMASK_FINETUNE_ROOT") {
        PathBuf::from(d)
    } else {
        staging::home_nanomask_dir_with(["finetuning_aug"]).unwrap()
    }
}

/// 获取单鼠数据源根目录.
///
/// 1. 若环境变量 `$NANOMASK_SINGLES_ROOT` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/NanoMask/FinetuneData`.
pub fn singles_root_from_env_or_home() -> PathBuf {
    if let Ok(d) = env::var("NANOMASK_SINGLES_ROOT") {
        PathBuf::from(d)
    } else {
        staging::home_nanomask_dir_with(["FinetuneData"]).unwrap()
    }
}

/// 获取微调工作区内 nnU-Net raw 数据目录下给定任务目录的全路径.
pub fn raw_task_root(task_dirname: &str) -> PathBuf {
    let mut ans = finetune_root_from_env_or_home();
    ans.extend(["nnUNet_data", "nnUNet_raw_data", task_dirname]);
    ans
}
