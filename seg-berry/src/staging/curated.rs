//! curated 批次目录的逐侧展开暂存.
//!
//! 批次目录的子目录名以 `-L`/`-M`/`-R` 组合后缀标记可用侧, 形如:
//!
//! ```text
//! batch20250807_Curated/
//!   s01234-L/      -> 生成 s01234-L
//!   s04567-LM/     -> 生成 s04567-L, s04567-M
//!   s08901/        -> 跳过 (无标志)
//! ```
//!
//! 每个子目录内, 命中标签模式的 nifti 文件作为标签,
//! 其余 nifti 文件按名称序作为模态通道 `_0000`, `_0001`, ...

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::warn;

use super::{file_name_str, glob_match, materialize, sorted_subdirs, CopyMode, StageError};
use crate::manifest::{DatasetManifest, TrainingEntry};

/// 合法的侧标志.
pub const VALID_FLAGS: [char; 3] = ['L', 'M', 'R'];

/// 用户未指定标签模式时的内置回退序列, 按序第一个命中者生效.
pub const DEFAULT_LABEL_GLOBS: [&str; 8] = [
    "label.nii.gz",
    "label.nii",
    "*_label.nii.gz",
    "*_label.nii",
    "*_mask.nii.gz",
    "*_mask.nii",
    "mask.nii.gz",
    "mask.nii",
];

/// 从目录名解析 base 编号和侧标志序列.
///
/// 标志去重且保持出现顺序. 后缀不是纯 `L`/`M`/`R`
/// 组合 (或没有后缀) 时返回空标志序列:
///
/// ```
/// use seg_berry::staging::curated::parse_case_dirname;
///
/// assert_eq!(parse_case_dirname("s04567-LM"), ("s04567", vec!['L', 'M']));
/// assert_eq!(parse_case_dirname("s08901"), ("s08901", vec![]));
/// ```
pub fn parse_case_dirname(name: &str) -> (&str, Vec<char>) {
    match name.split_once('-') {
        Some((base, flags))
            if !base.is_empty()
                && !flags.is_empty()
                && flags.chars().all(|c| VALID_FLAGS.contains(&c)) =>
        {
            (base, flags.chars().unique().collect())
        }
        _ => (name, Vec::new()),
    }
}

/// curated 暂存任务描述.
#[derive(Debug, Clone)]
pub struct CuratedSpec {
    /// curated 批次目录.
    pub curated: PathBuf,

    /// 目标 nnU-Net raw task 目录.
    pub dst: PathBuf,

    /// 任务名, 写入 `dataset.json` 的 `name` 字段.
    pub task_name: String,

    /// 模态名称序列. 为空时按实际通道数生成 `channel_{i}`.
    pub modality_names: Vec<String>,

    /// 用户指定的标签文件名模式. 内置回退序列总是在其后生效.
    pub label_globs: Vec<String>,

    /// 物化模式.
    pub mode: CopyMode,
}

/// curated 暂存结果统计.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CuratedSummary {
    /// 写出的 case 个数 (逐侧展开后).
    pub cases_written: usize,

    /// 因没有侧标志而被跳过的子目录个数.
    pub skipped_plain: usize,

    /// 写出的无标签项个数.
    pub unlabeled: usize,
}

/// 执行 curated 暂存并写出 `dataset.json`.
///
/// 子目录按名称升序处理, 因此多次运行产生确定性的输出.
pub fn stage(spec: &CuratedSpec) -> Result<CuratedSummary, StageError> {
    let images_tr = spec.dst.join("imagesTr");
    let labels_tr = spec.dst.join("labelsTr");
    fs::create_dir_all(&images_tr)?;
    fs::create_dir_all(&labels_tr)?;

    let mut summary = CuratedSummary::default();
    let mut entries = Vec::new();
    let mut channels = 0usize;

    for case_dir in sorted_subdirs(&spec.curated)? {
        let Some(name) = file_name_str(&case_dir) else {
            continue;
        };
        let (base, flags) = parse_case_dirname(name);
        if flags.is_empty() {
            summary.skipped_plain += 1;
            continue;
        }

        let label_file = find_label_file(&case_dir, &spec.label_globs)?;
        let image_files: Vec<PathBuf> = list_nifti_files(&case_dir)?
            .into_iter()
            .filter(|p| Some(p) != label_file.as_ref())
            .collect();
        if image_files.is_empty() {
            warn!("{} 中没有图像 nifti 文件, 跳过.", case_dir.display());
            continue;
        }
        channels = channels.max(image_files.len());

        // 每个在场标志各生成一个 case.
        for flag in flags {
            let case_id = format!("{base}-{flag}");

            let mut rep_image = String::new();
            for (k, img) in image_files.iter().enumerate() {
                let dst_name = format!("{case_id}_{k:04}{}", nifti_ext(img));
                materialize(img, &images_tr.join(&dst_name), spec.mode)?;
                if k == 0 {
                    rep_image = format!("./imagesTr/{dst_name}");
                }
            }

            let label = match &label_file {
                Some(src) => {
                    let dst_name = format!("{case_id}{}", nifti_ext(src));
                    materialize(src, &labels_tr.join(&dst_name), spec.mode)?;
                    Some(format!("./labelsTr/{dst_name}"))
                }
                None => {
                    warn!("{} 中没有标签文件, 生成无标签项.", case_dir.display());
                    summary.unlabeled += 1;
                    None
                }
            };

            entries.push(TrainingEntry {
                image: rep_image,
                label,
                case_id: None,
            });
            summary.cases_written += 1;
        }
    }

    let mut manifest = DatasetManifest::generic(
        &spec.task_name,
        "Finetuning dataset expanded from curated side-flagged folders",
        channels,
    );
    if !spec.modality_names.is_empty() {
        manifest.set_modalities(spec.modality_names.iter().cloned());
    }
    for e in entries {
        manifest.push_training(e);
    }
    manifest.write(spec.dst.join("dataset.json"))?;

    Ok(summary)
}

/// 在 `dir` 中按模式序列定位标签文件. 第一个命中者生效.
fn find_label_file(dir: &Path, globs: &[String]) -> io::Result<Option<PathBuf>> {
    let files = list_nifti_files(dir)?;
    for g in globs.iter().map(String::as_str).chain(DEFAULT_LABEL_GLOBS) {
        let hit = files
            .iter()
            .find(|p| file_name_str(p).is_some_and(|n| glob_match(g, n)));
        if let Some(hit) = hit {
            return Ok(Some(hit.clone()));
        }
    }
    Ok(None)
}

/// 按文件名升序列出 `dir` 下的 nifti 文件 (`.nii` 与 `.nii.gz`).
fn list_nifti_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut ans: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && file_name_str(p).is_some_and(|n| n.ends_with(".nii") || n.ends_with(".nii.gz"))
        })
        .collect();
    ans.sort();
    Ok(ans)
}

/// 文件的 nifti 扩展名 (含点), 压缩与否二选一.
fn nifti_ext(p: &Path) -> &'static str {
    if file_name_str(p).is_some_and(|n| n.ends_with(".nii.gz")) {
        ".nii.gz"
    } else {
        ".nii"
    }
}
