//! nnU-Net `dataset.json` 清单构建与写出.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{LABEL_NAMES, MODALITY_NAMES};

/// `dataset.json` 中的单条训练项.
///
/// 路径按 nnU-Net 惯例相对任务根目录书写, 形如 `./imagesTr/case1_0000.nii.gz`.
/// nnU-Net 按后缀推断其余模态通道, 因此 `image` 只记录通道 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingEntry {
    /// 通道 0 图像路径.
    pub image: String,

    /// 标签路径. 无标签 (半监督) 时省略.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// 人类可读的 case 编号. 仅部分暂存流程写入.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
}

/// nnU-Net raw task 的 `dataset.json` 清单.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    /// 任务名, 形如 `Task207_CT2PET_FT`.
    pub name: String,

    /// 描述文本.
    pub description: String,

    /// nnU-Net 张量布局标记, 双模态 3D 数据固定为 `"4D"`.
    #[serde(rename = "tensorImageSize")]
    pub tensor_image_size: String,

    /// 数据出处.
    pub reference: String,

    /// 许可说明.
    pub licence: String,

    /// 版本号.
    pub release: String,

    /// 模态编号到名称的映射, 键为十进制字符串.
    pub modality: BTreeMap<String, String>,

    /// 标签值到名称的映射, 键为十进制字符串.
    pub labels: BTreeMap<String, String>,

    /// 训练 case 个数.
    #[serde(rename = "numTraining")]
    pub num_training: usize,

    /// 测试 case 个数. 暂存流程不划分测试集, 恒为 0.
    #[serde(rename = "numTest")]
    pub num_test: usize,

    /// 训练项列表.
    pub training: Vec<TrainingEntry>,

    /// 测试项列表. 恒为空.
    pub test: Vec<String>,
}

impl DatasetManifest {
    /// 以 NanoMask 词表 (7 类标签, CT/PET 双模态) 构建清单骨架.
    pub fn nanomask(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tensor_image_size: "4D".to_owned(),
            reference: "internal".to_owned(),
            licence: "internal".to_owned(),
            release: "0.0".to_owned(),
            modality: MODALITY_NAMES
                .iter()
                .enumerate()
                .map(|(i, n)| (i.to_string(), (*n).to_owned()))
                .collect(),
            labels: LABEL_NAMES
                .iter()
                .map(|(v, n)| (v.to_string(), (*n).to_owned()))
                .collect(),
            num_training: 0,
            num_test: 0,
            training: Vec::new(),
            test: Vec::new(),
        }
    }

    /// 以通用词表 (背景/前景二类, 按 `channels` 生成 `channel_{i}` 模态名)
    /// 构建清单骨架. curated 暂存流程在用户未指定模态名时使用.
    pub fn generic(name: impl Into<String>, description: impl Into<String>, channels: usize) -> Self {
        let mut ans = Self::nanomask(name, description);
        ans.licence = "unknown".to_owned();
        ans.release = "1.0".to_owned();
        ans.reference = String::new();
        ans.modality = (0..channels.max(1))
            .map(|i| (i.to_string(), format!("channel_{i}")))
            .collect();
        ans.labels = [(0, "background"), (1, "foreground")]
            .iter()
            .map(|(v, n)| (v.to_string(), (*n).to_owned()))
            .collect();
        ans
    }

    /// 覆盖模态映射为给定名称序列.
    pub fn set_modalities<S: Into<String>, I: IntoIterator<Item = S>>(&mut self, names: I) {
        self.modality = names
            .into_iter()
            .enumerate()
            .map(|(i, n)| (i.to_string(), n.into()))
            .collect();
    }

    /// 追加一条训练项并同步 `num_training` 计数.
    pub fn push_training(&mut self, entry: TrainingEntry) {
        self.training.push(entry);
        self.num_training = self.training.len();
    }

    /// 将清单以 pretty JSON 写入 `path`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(file, self).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanomask_vocabulary() {
        let m = DatasetManifest::nanomask("Task207_CT2PET_FT", "mouse singles");
        assert_eq!(m.modality["0"], "CT");
        assert_eq!(m.modality["1"], "PET");
        assert_eq!(m.labels["0"], "background");
        assert_eq!(m.labels["6"], "Tumor");
        assert_eq!(m.labels.len(), 7);
        assert_eq!(m.tensor_image_size, "4D");
    }

    #[test]
    fn test_push_training_keeps_count_in_sync() {
        let mut m = DatasetManifest::nanomask("Task207_CT2PET_FT", "");
        for i in 1..=3 {
            m.push_training(TrainingEntry {
                image: format!("./imagesTr/case{i}_0000.nii.gz"),
                label: Some(format!("./labelsTr/case{i}.nii.gz")),
                case_id: Some(format!("case{i}")),
            });
        }
        assert_eq!(m.num_training, 3);
        assert_eq!(m.num_test, 0);
    }

    #[test]
    fn test_json_field_names_follow_nnunet_convention() {
        let mut m = DatasetManifest::generic("Task202_CT2PET_FT_LMR", "", 2);
        m.push_training(TrainingEntry {
            image: "./imagesTr/s01234-L_0000.nii.gz".to_owned(),
            label: None,
            case_id: None,
        });

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["tensorImageSize"], "4D");
        assert_eq!(json["numTraining"], 1);
        assert_eq!(json["numTest"], 0);
        assert_eq!(json["modality"]["1"], "channel_1");
        assert_eq!(json["labels"]["1"], "foreground");
        // 无标签项不应出现 label/case_id 字段.
        assert!(json["training"][0].get("label").is_none());
        assert!(json["training"][0].get("case_id").is_none());
    }

    #[test]
    fn test_set_modalities() {
        let mut m = DatasetManifest::generic("Task202_CT2PET_FT_LMR", "", 2);
        m.set_modalities(["CT", "PET"]);
        assert_eq!(m.modality["0"], "CT");
        assert_eq!(m.modality["1"], "PET");
        assert_eq!(m.modality.len(), 2);
    }
}
