//! 单鼠 triplet 目录的顺序编号暂存.
//!
//! 源目录的每个带侧标志的子目录应包含一组 triplet:
//! `{tag}_*_0000.nii.gz` (CT), `{tag}_*_0001.nii.gz` (PET)
//! 和一个其余命名的 `{tag}_*.nii.gz` (分割). 三者各恰好一个时才暂存,
//! case 编号按处理顺序从 `case1` 起连续分配.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::curated::parse_case_dirname;
use super::{file_name_str, glob_match, materialize, sorted_subdirs, CopyMode, StageError};
use crate::manifest::{DatasetManifest, TrainingEntry};

/// 一个单鼠 case 的三份源文件.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triplet {
    /// CT 体积 (`_0000`).
    pub ct: PathBuf,

    /// PET 体积 (`_0001`).
    pub pet: PathBuf,

    /// 分割标签.
    pub seg: PathBuf,
}

/// 在 `dir` 中定位 triplet. 三类文件各恰好一个时返回 `Some`,
/// 多一个或少一个都视为不完整, 返回 `None`.
pub fn find_triplet(dir: &Path) -> io::Result<Option<Triplet>> {
    let Some(name) = file_name_str(dir) else {
        return Ok(None);
    };
    let tag = name.split('-').next().unwrap_or(name);
    let ct_glob = format!("{tag}_*_0000.nii.gz");
    let pet_glob = format!("{tag}_*_0001.nii.gz");
    let any_glob = format!("{tag}_*.nii.gz");

    let mut ct = Vec::new();
    let mut pet = Vec::new();
    let mut seg = Vec::new();
    for entry in fs::read_dir(dir)? {
        let p = entry?.path();
        let Some(n) = file_name_str(&p) else {
            continue;
        };
        if glob_match(&ct_glob, n) {
            ct.push(p);
        } else if glob_match(&pet_glob, n) {
            pet.push(p);
        } else if glob_match(&any_glob, n)
            // 带模态后缀但无中缀的文件 (如 `{tag}_0000.nii.gz`)
            // 不匹配 ct/pet 模式, 也不能算分割候选.
            && !n.ends_with("_0000.nii.gz")
            && !n.ends_with("_0001.nii.gz")
        {
            seg.push(p);
        }
    }

    match (ct.as_slice(), pet.as_slice(), seg.as_slice()) {
        ([ct], [pet], [seg]) => Ok(Some(Triplet {
            ct: ct.clone(),
            pet: pet.clone(),
            seg: seg.clone(),
        })),
        _ => Ok(None),
    }
}

/// 单鼠暂存任务描述.
#[derive(Debug, Clone)]
pub struct SinglesSpec {
    /// 单鼠数据源目录.
    pub singles_root: PathBuf,

    /// 目标 nnU-Net raw task 目录.
    pub task_root: PathBuf,

    /// 任务目录名, 形如 `Task207_CT2PET_FT`, 同时写入 `dataset.json`.
    pub task_dirname: String,

    /// 物化模式.
    pub mode: CopyMode,
}

/// 单鼠暂存结果.
#[derive(Debug, Clone)]
pub struct SinglesSummary {
    /// 已暂存 case 的 (case 编号, 原目录名) 映射, 与 `caseID.txt` 内容一致.
    pub cases: Vec<(String, String)>,
}

/// 执行单鼠暂存, 写出 `dataset.json` 和 `caseID.txt`.
///
/// 子目录按名称升序处理; 没有任何完整 triplet 时返回
/// [`StageError::NoCases`], 此时不写出清单.
pub fn stage(spec: &SinglesSpec) -> Result<SinglesSummary, StageError> {
    let images_tr = spec.task_root.join("imagesTr");
    let labels_tr = spec.task_root.join("labelsTr");
    fs::create_dir_all(&images_tr)?;
    fs::create_dir_all(&labels_tr)?;

    let mut cases: Vec<(String, String)> = Vec::new();
    for dir in sorted_subdirs(&spec.singles_root)? {
        let Some(name) = file_name_str(&dir) else {
            continue;
        };
        // 仅接受带 -L/-M/-R 后缀的目录.
        if parse_case_dirname(name).1.is_empty() {
            continue;
        }
        let Some(t) = find_triplet(&dir)? else {
            continue;
        };

        let case_id = format!("case{}", cases.len() + 1);
        materialize(&t.ct, &images_tr.join(format!("{case_id}_0000.nii.gz")), spec.mode)?;
        materialize(&t.pet, &images_tr.join(format!("{case_id}_0001.nii.gz")), spec.mode)?;
        materialize(&t.seg, &labels_tr.join(format!("{case_id}.nii.gz")), spec.mode)?;
        cases.push((case_id, name.to_owned()));
    }

    if cases.is_empty() {
        return Err(StageError::NoCases);
    }

    let mut manifest =
        DatasetManifest::nanomask(&spec.task_dirname, "CT->PET finetune on mouse singles");
    for (case_id, _) in &cases {
        manifest.push_training(TrainingEntry {
            // nnU-Net 按 `_0000` 后缀定位实际通道文件,
            // 清单按其惯例记录无后缀路径.
            image: format!("./imagesTr/{case_id}.nii.gz"),
            label: Some(format!("./labelsTr/{case_id}.nii.gz")),
            case_id: Some(case_id.clone()),
        });
    }
    manifest.write(spec.task_root.join("dataset.json"))?;

    let mut txt = String::new();
    for (cid, orig) in &cases {
        txt.push_str(&format!("{cid}\t{orig}\n"));
    }
    fs::write(spec.task_root.join("caseID.txt"), txt)?;

    Ok(SinglesSummary { cases })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(p: &Path) {
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, b"nii").unwrap();
    }

    #[test]
    fn test_find_triplet() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("m01-L");
        touch(&dir.join("m01_scan_0000.nii.gz"));
        touch(&dir.join("m01_scan_0001.nii.gz"));
        touch(&dir.join("m01_seg.nii.gz"));

        let t = find_triplet(&dir).unwrap().unwrap();
        assert_eq!(file_name_str(&t.ct), Some("m01_scan_0000.nii.gz"));
        assert_eq!(file_name_str(&t.pet), Some("m01_scan_0001.nii.gz"));
        assert_eq!(file_name_str(&t.seg), Some("m01_seg.nii.gz"));

        // 无中缀的 `_0000` 文件按模态后缀整体排除, 不会挤进分割候选.
        touch(&dir.join("m01_0000.nii.gz"));
        let t = find_triplet(&dir).unwrap().unwrap();
        assert_eq!(file_name_str(&t.seg), Some("m01_seg.nii.gz"));

        // 多出一个分割候选即不完整.
        touch(&dir.join("m01_other.nii.gz"));
        assert_eq!(find_triplet(&dir).unwrap(), None);
    }

    #[test]
    fn test_stage_singles() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("FinetuneData");
        let task = tmp.path().join("Task207_CT2PET_FT");

        for (d, tag) in [("m01-L", "m01"), ("m10-MR", "m10")] {
            let dir = root.join(d);
            touch(&dir.join(format!("{tag}_a_0000.nii.gz")));
            touch(&dir.join(format!("{tag}_a_0001.nii.gz")));
            touch(&dir.join(format!("{tag}_a.nii.gz")));
        }
        // 缺 PET 的 triplet 与无标志目录都被跳过.
        let broken = root.join("m05-R");
        touch(&broken.join("m05_a_0000.nii.gz"));
        touch(&broken.join("m05_a.nii.gz"));
        touch(&root.join("m07").join("m07_a_0000.nii.gz"));

        let spec = SinglesSpec {
            singles_root: root,
            task_root: task.clone(),
            task_dirname: "Task207_CT2PET_FT".to_owned(),
            mode: CopyMode::Copy,
        };
        let summary = stage(&spec).unwrap();
        assert_eq!(
            summary.cases,
            vec![
                ("case1".to_owned(), "m01-L".to_owned()),
                ("case2".to_owned(), "m10-MR".to_owned()),
            ]
        );

        assert!(task.join("imagesTr/case1_0000.nii.gz").is_file());
        assert!(task.join("imagesTr/case2_0001.nii.gz").is_file());
        assert!(task.join("labelsTr/case2.nii.gz").is_file());
        assert_eq!(
            fs::read_to_string(task.join("caseID.txt")).unwrap(),
            "case1\tm01-L\ncase2\tm10-MR\n"
        );

        let manifest: DatasetManifest =
            serde_json::from_reader(fs::File::open(task.join("dataset.json")).unwrap()).unwrap();
        assert_eq!(manifest.num_training, 2);
        assert_eq!(manifest.labels["6"], "Tumor");
        assert_eq!(manifest.training[0].image, "./imagesTr/case1.nii.gz");
        assert_eq!(manifest.training[0].case_id.as_deref(), Some("case1"));
    }

    #[test]
    fn test_stage_singles_without_any_triplet() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("empty");
        fs::create_dir_all(&root).unwrap();
        let spec = SinglesSpec {
            singles_root: root,
            task_root: tmp.path().join("task"),
            task_dirname: "Task200_CT2PET_FT".to_owned(),
            mode: CopyMode::Copy,
        };
        assert!(matches!(stage(&spec), Err(StageError::NoCases)));
        // 没有 case 时不写清单.
        assert!(!tmp.path().join("task/dataset.json").exists());
    }
}
