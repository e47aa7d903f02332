//! 通用常量.

/// 背景标签.
pub const BACKGROUND: u32 = 0;

/// patch 网格中相邻 patch 的默认最小重叠 (像素).
pub const DEFAULT_MIN_OVERLAP: usize = 30;

/// 默认交叉验证折数.
pub const DEFAULT_N_SPLITS: usize = 5;

/// 预处理后病例文件的扩展名.
pub const CASE_EXTENSION: &str = "npz";

/// 标签是否是背景?
#[inline]
pub const fn is_background(label: u32) -> bool {
    label == BACKGROUND
}

/// 标签是否是前景?
#[inline]
pub const fn is_foreground(label: u32) -> bool {
    !is_background(label)
}
