//! 大尺寸图像的 patch 网格切分.
//!
//! 在每个空间轴上独立地放置若干个等长 patch, 使其覆盖整条轴且相邻 patch 的重叠不小于
//! `min_overlap`, 然后取各轴的笛卡尔积.

use crate::consts::DEFAULT_MIN_OVERLAP;
use crate::Span;
use itertools::Itertools;
use ndarray::{ArrayViewD, Axis, Slice};
use std::fmt;

/// patch 网格配置错误.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatchError {
    /// 空间维度必须为 2 或 3.
    UnsupportedDim(usize),

    /// 图像形状与 patch 尺寸的维度不一致.
    ///
    /// 第一个参数为图像维度, 第二个参数为 patch 维度.
    DimMismatch(usize, usize),

    /// 第 `.0` 维的图像长度或 patch 尺寸为 0.
    EmptyAxis(usize),

    /// 第 `.0` 维需要多个 patch, 但最小重叠 `.1` 不小于 patch 尺寸 `.2`.
    OverlapTooLarge(usize, usize, usize),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDim(d) => write!(f, "{d}-d patches are not supported"),
            Self::DimMismatch(img, p) => {
                write!(f, "image has {img} axes but patch size has {p}")
            }
            Self::EmptyAxis(axis) => write!(f, "axis {axis} has zero length"),
            Self::OverlapTooLarge(axis, m, p) => write!(
                f,
                "axis {axis}: min overlap {m} must be smaller than patch size {p}"
            ),
        }
    }
}

impl std::error::Error for PatchError {}

pub type PatchResult<T> = Result<T, PatchError>;

/// 单个 patch 在各空间轴上的半开区间.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PatchCoords {
    bounds: Vec<Span>,
}

impl PatchCoords {
    /// 各轴区间, 轴 0 在前.
    #[inline]
    pub fn bounds(&self) -> &[Span] {
        &self.bounds
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    /// 展平为 `[y1, y2, x1, x2]` 或 `[y1, y2, x1, x2, z1, z2]`.
    pub fn flat(&self) -> Vec<usize> {
        self.bounds.iter().flat_map(|&(lo, hi)| [lo, hi]).collect()
    }

    /// patch 的形状.
    pub fn shape(&self) -> Vec<usize> {
        self.bounds.iter().map(|(lo, hi)| hi - lo).collect()
    }

    /// 从 `view` 中截取该 patch. patch 作用于 `view` 的最后 `self.dim()` 个轴,
    /// 前面的轴 (例如 batch, channel) 保持不变.
    ///
    /// # 注意
    ///
    /// 若 `view` 的维数少于 `self.dim()` 或区间越界, 则 panic.
    pub fn crop<'a, A>(&self, view: ArrayViewD<'a, A>) -> ArrayViewD<'a, A> {
        let offset = view.ndim() - self.dim();
        let mut view = view;
        for (i, &(lo, hi)) in self.bounds.iter().enumerate() {
            view.slice_axis_inplace(Axis(offset + i), Slice::from(lo..hi));
        }
        view
    }
}

/// patch 网格.
///
/// # 例子
///
/// ```
/// use det_berry::data::PatchGrid;
///
/// let grid = PatchGrid::new(vec![256, 256], 30).unwrap();
/// let patches = grid.compute(&[480, 200]).unwrap();
/// assert_eq!(patches.len(), 2);
/// assert_eq!(patches[1].flat(), [224, 480, 0, 200]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchGrid {
    patch_size: Vec<usize>,
    min_overlap: usize,
}

impl PatchGrid {
    /// 以 patch 尺寸和最小重叠创建网格. patch 尺寸必须为 2 维或 3 维且各维为正.
    pub fn new(patch_size: Vec<usize>, min_overlap: usize) -> PatchResult<Self> {
        if !matches!(patch_size.len(), 2 | 3) {
            return Err(PatchError::UnsupportedDim(patch_size.len()));
        }
        if let Some(axis) = patch_size.iter().position(|&p| p == 0) {
            return Err(PatchError::EmptyAxis(axis));
        }
        Ok(Self {
            patch_size,
            min_overlap,
        })
    }

    /// 使用默认最小重叠创建网格.
    #[inline]
    pub fn with_default_overlap(patch_size: Vec<usize>) -> PatchResult<Self> {
        Self::new(patch_size, DEFAULT_MIN_OVERLAP)
    }

    #[inline]
    pub fn patch_size(&self) -> &[usize] {
        &self.patch_size
    }

    #[inline]
    pub fn min_overlap(&self) -> usize {
        self.min_overlap
    }

    /// 计算形状为 `image_shape` 的图像上的所有 patch, 轴 0 变化最慢.
    ///
    /// 3 维且第 3 个 patch 尺寸为 1 时, 第 3 轴按逐层切片处理:
    /// 每一层对应一个 `(z, z + 1)` 区间, 不考虑重叠.
    pub fn compute(&self, image_shape: &[usize]) -> PatchResult<Vec<PatchCoords>> {
        let dim = self.patch_size.len();
        if image_shape.len() != dim {
            return Err(PatchError::DimMismatch(image_shape.len(), dim));
        }
        if let Some(axis) = image_shape.iter().position(|&s| s == 0) {
            return Err(PatchError::EmptyAxis(axis));
        }

        let per_axis = image_shape
            .iter()
            .zip(self.patch_size.iter())
            .enumerate()
            .map(|(axis, (&len, &patch))| {
                if axis == 2 && patch == 1 {
                    Ok((0..len).map(|z| (z, z + 1)).collect())
                } else {
                    axis_bounds(axis, len, patch, self.min_overlap)
                }
            })
            .collect::<PatchResult<Vec<Vec<Span>>>>()?;

        Ok(per_axis
            .into_iter()
            .multi_cartesian_product()
            .map(|bounds| PatchCoords { bounds })
            .collect())
    }
}

/// 直接计算 patch 网格, 参见 [`PatchGrid::compute`].
#[inline]
pub fn compute_patches(
    image_shape: &[usize],
    patch_size: &[usize],
    min_overlap: usize,
) -> PatchResult<Vec<PatchCoords>> {
    PatchGrid::new(patch_size.to_vec(), min_overlap)?.compute(image_shape)
}

/// 单条轴上的 patch 区间.
///
/// 从 `ceil(len / patch)` 个 patch 开始, 中心等距分布在 `[patch / 2, len - patch / 2]` 上;
/// 若相邻中心距使重叠小于 `min_overlap`, 就继续增加 patch 个数.
/// 轴长不超过 patch 尺寸时返回 `[(0, len)]`.
pub fn axis_bounds(axis: usize, len: usize, patch: usize, min_overlap: usize) -> PatchResult<Vec<Span>> {
    if len == 0 || patch == 0 {
        return Err(PatchError::EmptyAxis(axis));
    }
    let mut n = len.div_ceil(patch);
    if n == 1 {
        return Ok(vec![(0, len)]);
    }
    if min_overlap >= patch {
        return Err(PatchError::OverlapTooLarge(axis, min_overlap, patch));
    }

    let span = (len - patch) as f64;
    let mut center_dist = span / (n - 1) as f64;
    while (patch as f64 - center_dist) < min_overlap as f64 {
        n += 1;
        center_dist = span / (n - 1) as f64;
    }

    let max_lo = len - patch;
    let half = patch as f64 / 2.0;
    Ok((0..n)
        .map(|k| {
            let offset = center_dist * k as f64;
            let lo = if patch % 2 == 0 {
                // 中心按 "四舍六入五成双" 取整.
                (half + offset).round_ties_even() - half
            } else {
                // 奇数尺寸的中心落在半格上, 直接对起点取整.
                offset.round()
            };
            (lo.max(0.0) as usize).min(max_lo)
        })
        .map(|lo| (lo, lo + patch))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{axis_bounds, compute_patches, PatchError, PatchGrid};
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn test_three_per_axis() {
        // 两个 patch 只能重叠 12 个像素, 小于 30, 因此每条轴需要 3 个.
        let patches = compute_patches(&[500, 500], &[256, 256], 30).unwrap();
        assert_eq!(patches.len(), 9);
        assert_eq!(
            axis_bounds(0, 500, 256, 30).unwrap(),
            [(0, 256), (122, 378), (244, 500)]
        );
        assert!(patches.iter().all(|p| p.shape() == [256, 256]));
    }

    #[test]
    fn test_two_patches_suffice() {
        assert_eq!(axis_bounds(0, 480, 256, 30).unwrap(), [(0, 256), (224, 480)]);
    }

    #[test]
    fn test_small_image_single_patch() {
        let patches = compute_patches(&[200, 256], &[256, 256], 30).unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].flat(), [0, 200, 0, 256]);
    }

    #[test]
    fn test_axis0_major_order() {
        let patches = compute_patches(&[480, 300], &[256, 256], 30).unwrap();
        let flat: Vec<Vec<usize>> = patches.iter().map(|p| p.flat()).collect();
        assert_eq!(
            flat,
            [
                vec![0, 256, 0, 256],
                vec![0, 256, 44, 300],
                vec![224, 480, 0, 256],
                vec![224, 480, 44, 300],
            ]
        );
    }

    #[test]
    fn test_slice_mode() {
        let patches = compute_patches(&[300, 300, 5], &[256, 256, 1], 30).unwrap();
        assert_eq!(patches.len(), 2 * 2 * 5);
        assert_eq!(patches[0].flat(), [0, 256, 0, 256, 0, 1]);
        assert_eq!(patches[19].flat(), [44, 300, 44, 300, 4, 5]);
    }

    #[test]
    fn test_3d_volume() {
        let patches = compute_patches(&[128, 128, 100], &[64, 64, 64], 10).unwrap();
        // 128 / 64: 2 个 patch 没有重叠, 需要 3 个; 100 / 64: 2 个, 重叠 28.
        assert_eq!(patches.len(), 3 * 3 * 2);
        assert!(patches.iter().all(|p| p.dim() == 3));
    }

    #[test]
    fn test_coverage_and_overlap() {
        for patch in [4usize, 7, 16, 33] {
            for min_overlap in [0, 1, patch / 2, patch - 1] {
                for len in 1..=150usize {
                    let bounds = axis_bounds(0, len, patch, min_overlap).unwrap();
                    assert_eq!(bounds[0].0, 0);
                    assert_eq!(bounds.last().unwrap().1, len);
                    for &(lo, hi) in bounds.iter() {
                        assert_eq!(hi - lo, patch.min(len), "len {len} patch {patch}");
                        assert!(hi <= len);
                    }
                    for w in bounds.windows(2) {
                        let ((lo0, hi0), (lo1, _)) = (w[0], w[1]);
                        assert!(lo0 <= lo1);
                        assert!(lo1 <= hi0, "gap: len {len} patch {patch} {bounds:?}");
                        assert!(
                            hi0 - lo1 >= min_overlap,
                            "overlap: len {len} patch {patch} m {min_overlap} {bounds:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_crop() {
        let img = ArrayD::from_shape_fn(IxDyn(&[2, 1, 10, 12]), |d| d[2] * 100 + d[3]);
        let patches = compute_patches(&[10, 12], &[6, 6], 2).unwrap();
        for p in patches.iter() {
            let view = p.crop(img.view());
            assert_eq!(view.shape(), [2, 1, 6, 6]);
            let (y0, x0) = (p.bounds()[0].0, p.bounds()[1].0);
            assert_eq!(view[[1, 0, 0, 0]], y0 * 100 + x0);
        }
    }

    #[test]
    fn test_patch_errors() {
        assert_eq!(
            PatchGrid::new(vec![16], 0).unwrap_err(),
            PatchError::UnsupportedDim(1)
        );
        assert_eq!(
            PatchGrid::new(vec![16, 0], 0).unwrap_err(),
            PatchError::EmptyAxis(1)
        );
        assert_eq!(
            compute_patches(&[64, 64, 64], &[16, 16], 0).unwrap_err(),
            PatchError::DimMismatch(3, 2)
        );
        assert_eq!(
            compute_patches(&[64, 0], &[16, 16], 0).unwrap_err(),
            PatchError::EmptyAxis(1)
        );
        assert_eq!(
            compute_patches(&[64, 64], &[16, 16], 16).unwrap_err(),
            PatchError::OverlapTooLarge(0, 16, 16)
        );
        // 只需要一个 patch 时不检查重叠.
        assert!(compute_patches(&[16, 16], &[16, 16], 16).is_ok());
    }
}
