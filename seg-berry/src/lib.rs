#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 为 NanoMask 小鼠 PET/CT 微调流水线提供 nnU-Net 任务格式的
//! nifti 标签文件模型、后处理算法和训练数据暂存功能.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 按照 nnU-Net raw task 模式组织数据 (`imagesTr`, `labelsTr`,
//!   `dataset.json`), 没有对其它组织方式进行直接适配.
//! 2. 在非期望情况下, 程序会直接 panic, 而不会导致内存错误. As what Rust promises.
//!
//! # 功能一览
//!
//! ### 肿瘤标签替换 (mask merge) ✅
//!
//! 将多类分割 (主预测) 中的肿瘤标签替换为辅助模型给出的肿瘤区域,
//! 输出沿用主预测的空间元信息.
//!
//! 实现位于 `seg-berry/src/post_proc/tumor_swap.rs`.
//!
//! ### nifti 仿射矩阵提取与比较 ✅
//!
//! 从 header 的 sform/qform/pixdim 恢复 4x4 仿射矩阵,
//! 并在给定容差下判断两个体积是否占据同一物理空间.
//!
//! 实现位于 `seg-berry/src/data/affine.rs`.
//!
//! ### 训练数据暂存与 dataset.json 清单 ✅
//!
//! 1. curated 批次目录 (`sXXXXX-LMR` 后缀标志) 展开为逐侧 case. ✅
//! 2. 单鼠 triplet 目录 (`_0000`/`_0001`/seg) 顺序编号为 caseN. ✅
//! 3. nnU-Net `dataset.json` 清单构建与写出. ✅
//!
//! 实现位于 `seg-berry/src/staging` 和 `seg-berry/src/manifest.rs`.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// nnU-Net 格式 3D 标签体积基础数据结构.
mod data;

pub use data::{affine, Affine4, NiftiHeaderAttr, SegLabel};

pub mod consts;

pub mod manifest;
pub mod post_proc;
pub mod staging;
