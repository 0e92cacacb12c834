//! 通用常量.

/// NanoMask 多类分割的标签值.
pub mod label {
    /// 背景的标签值.
    pub const BACKGROUND: i16 = 0;

    /// 心脏的标签值.
    pub const HEART: i16 = 1;

    /// 肺的标签值.
    pub const LUNGS: i16 = 2;

    /// 肝脏的标签值.
    pub const LIVER: i16 = 3;

    /// 脾脏的标签值.
    pub const SPLEEN: i16 = 4;

    /// 肾脏的标签值.
    pub const KIDNEYS: i16 = 5;

    /// 肿瘤的标签值.
    pub const TUMOR: i16 = 6;

    /// 体素是否是肿瘤?
    #[inline]
    pub const fn is_tumor(p: i16) -> bool {
        matches!(p, TUMOR)
    }

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: i16) -> bool {
        matches!(p, BACKGROUND)
    }

    /// 体素是否是某个前景器官 (肿瘤除外)?
    #[inline]
    pub const fn is_organ(p: i16) -> bool {
        matches!(p, HEART | LUNGS | LIVER | SPLEEN | KIDNEYS)
    }
}

/// NanoMask 多类任务的标签词表, 按标签值升序排列.
/// 文本与 `dataset.json` 的 `labels` 映射保持一致.
pub const LABEL_NAMES: [(i16, &str); 7] = [
    (label::BACKGROUND, "background"),
    (label::HEART, "Heart"),
    (label::LUNGS, "Lungs"),
    (label::LIVER, "Liver"),
    (label::SPLEEN, "Spleen"),
    (label::KIDNEYS, "Kidneys"),
    (label::TUMOR, "Tumor"),
];

/// 双模态词表: 通道 0 为 CT, 通道 1 为 PET.
pub const MODALITY_NAMES: [&str; 2] = ["CT", "PET"];

/// 比较两个 nifti 仿射矩阵时使用的逐元素绝对容差.
pub const AFFINE_ATOL: f64 = 1e-5;
