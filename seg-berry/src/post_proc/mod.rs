//! 分割结果后处理.

mod tumor_swap;

pub use tumor_swap::{swap_label, ShapeMismatch, SwapOutcome};
