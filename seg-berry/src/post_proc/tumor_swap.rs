//! 肿瘤标签替换 (后处理).
//!
//! 主预测 (多类) 中的肿瘤标签由辅助预测 (二值或多类, 值 > 0 记为阳性)
//! 给出的区域整体替换. 辅助预测为空时按回退策略决定保留还是清除.

use std::error::Error;
use std::fmt;

use ndarray::{Array3, ArrayView3};

use crate::consts::label::BACKGROUND;
use crate::Idx3d;

/// 主预测与辅助预测形状不一致错误. 两个体积不满足几何相容条件,
/// 替换不能进行.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeMismatch {
    /// 主预测形状.
    pub primary: Idx3d,

    /// 辅助预测形状.
    pub secondary: Idx3d,
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shape mismatch: primary {:?} vs secondary {:?}",
            self.primary, self.secondary
        )
    }
}

impl Error for ShapeMismatch {}

/// 单次替换的结果描述, 供调用方打日志或统计.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// 辅助预测非空, 已完成替换. 参数为辅助预测中的阳性体素个数.
    Stamped(usize),

    /// 辅助预测为空, 回退策略开启, 主预测原样保留.
    EmptyKept,

    /// 辅助预测为空, 回退策略关闭, 主预测中的目标标签被清为背景.
    EmptyCleared,
}

/// 用辅助预测 `secondary` 的阳性区域替换主预测 `primary` 中的 `target` 标签.
///
/// 算法流程依次为:
///
/// 1. 计算辅助阳性掩膜 (`secondary > 0`).
/// 2. 掩膜为空且 `keep_if_empty` 为真: 输出即主预测本身.
/// 3. 掩膜为空且 `keep_if_empty` 为假: 输出为主预测中 `target` 全部清为背景.
/// 4. 掩膜非空: 先将主预测中 `target` 清为背景, 再在掩膜阳性处无条件写入
///   `target`. 即使该体素原先持有其它标签, 掩膜也总是胜出.
///
/// 输出形状恒等于主预测形状. 两个输入形状不一致时返回 `Err`, 不产生输出.
pub fn swap_label(
    primary: ArrayView3<'_, i16>,
    secondary: ArrayView3<'_, i16>,
    target: i16,
    keep_if_empty: bool,
) -> Result<(Array3<i16>, SwapOutcome), ShapeMismatch> {
    if primary.dim() != secondary.dim() {
        return Err(ShapeMismatch {
            primary: primary.dim(),
            secondary: secondary.dim(),
        });
    }

    let positive = secondary.iter().filter(|p| **p > 0).count();
    if positive == 0 {
        if keep_if_empty {
            return Ok((primary.to_owned(), SwapOutcome::EmptyKept));
        }
        let mut out = primary.to_owned();
        clear_label(&mut out, target);
        return Ok((out, SwapOutcome::EmptyCleared));
    }

    let mut out = primary.to_owned();
    clear_label(&mut out, target);
    out.iter_mut()
        .zip(secondary.iter())
        .filter(|(_, s)| **s > 0)
        .for_each(|(o, _)| *o = target);

    Ok((out, SwapOutcome::Stamped(positive)))
}

/// 将 `data` 中值为 `label` 的体素全部清为背景.
fn clear_label(data: &mut Array3<i16>, label: i16) {
    data.iter_mut()
        .filter(|p| **p == label)
        .for_each(|p| *p = BACKGROUND);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::label::TUMOR;
    use ndarray::Array3;

    /// 角点持有肿瘤标签、其余为肺的主预测.
    fn primary_4x4x4() -> Array3<i16> {
        let mut p = Array3::from_elem((4, 4, 4), 2);
        p[(0, 0, 0)] = TUMOR;
        p
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let p = Array3::<i16>::zeros((64, 64, 32));
        let s = Array3::<i16>::zeros((64, 64, 31));
        let err = swap_label(p.view(), s.view(), TUMOR, false).unwrap_err();
        assert_eq!(err.primary, (64, 64, 32));
        assert_eq!(err.secondary, (64, 64, 31));
    }

    #[test]
    fn test_empty_secondary_with_fallback_keeps_primary() {
        let p = primary_4x4x4();
        let s = Array3::<i16>::zeros((4, 4, 4));
        let (out, outcome) = swap_label(p.view(), s.view(), TUMOR, true).unwrap();
        assert_eq!(outcome, SwapOutcome::EmptyKept);
        assert_eq!(out, p);
    }

    #[test]
    fn test_empty_secondary_clears_target_by_default() {
        let p = primary_4x4x4();
        let s = Array3::<i16>::zeros((4, 4, 4));
        let (out, outcome) = swap_label(p.view(), s.view(), TUMOR, false).unwrap();
        assert_eq!(outcome, SwapOutcome::EmptyCleared);
        assert_eq!(out[(0, 0, 0)], 0);
        assert!(out.iter().all(|p| *p != TUMOR));
        // 除原肿瘤体素外, 其余体素保持不变.
        assert_eq!(out.iter().filter(|p| **p == 2).count(), 63);
    }

    #[test]
    fn test_clear_branch_is_idempotent() {
        let p = primary_4x4x4();
        let s = Array3::<i16>::zeros((4, 4, 4));
        let (once, _) = swap_label(p.view(), s.view(), TUMOR, false).unwrap();
        let (twice, _) = swap_label(once.view(), s.view(), TUMOR, false).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_end_to_end_replace() {
        let p = primary_4x4x4();
        let mut s = Array3::<i16>::zeros((4, 4, 4));
        s[(3, 3, 3)] = 1;

        let (out, outcome) = swap_label(p.view(), s.view(), TUMOR, false).unwrap();
        assert_eq!(outcome, SwapOutcome::Stamped(1));
        assert_eq!(out.dim(), p.dim());
        // 旧肿瘤体素被清除, 新位置被压印.
        assert_eq!(out[(0, 0, 0)], 0);
        assert_eq!(out[(3, 3, 3)], TUMOR);
        for (pos, v) in out.indexed_iter() {
            if pos != (0, 0, 0) && pos != (3, 3, 3) {
                assert_eq!(*v, 2, "体素 {pos:?} 不应被改动");
            }
        }
    }

    #[test]
    fn test_mask_stamps_over_any_original_label() {
        // 辅助掩膜覆盖的体素原先持有器官标签 (非肿瘤), 掩膜仍胜出.
        let mut p = primary_4x4x4();
        p[(1, 1, 1)] = 3;
        let mut s = Array3::<i16>::zeros((4, 4, 4));
        s[(1, 1, 1)] = 5; // 多类辅助预测: 任何 > 0 的值均记为阳性.

        let (out, outcome) = swap_label(p.view(), s.view(), TUMOR, false).unwrap();
        assert_eq!(outcome, SwapOutcome::Stamped(1));
        assert_eq!(out[(1, 1, 1)], TUMOR);
        assert_eq!(out[(0, 0, 0)], 0);
    }

    #[test]
    fn test_unmasked_voxels_keep_primary_value() {
        let mut p = primary_4x4x4();
        p[(2, 2, 2)] = 4;
        let mut s = Array3::<i16>::zeros((4, 4, 4));
        s[(0, 0, 0)] = 1;

        let (out, _) = swap_label(p.view(), s.view(), TUMOR, false).unwrap();
        // 掩膜外且非目标标签的体素原样保留.
        assert_eq!(out[(2, 2, 2)], 4);
        // 原肿瘤体素被掩膜重新覆盖时仍为肿瘤.
        assert_eq!(out[(0, 0, 0)], TUMOR);
    }
}
