//! N 维数组的填充.
//!
//! 只在最后若干个轴上填充, 每个轴上的填充量尽量平均分配到两端, 多出的一格放在后端.
//! 填充永远不会裁剪数据: 目标长度小于当前长度的轴保持原样.

use crate::Span;
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use num::Zero;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 填充模式.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PadMode<T> {
    /// 填充常数.
    Constant(T),

    /// 重复边缘元素.
    #[default]
    Edge,

    /// 以边缘元素为轴镜像, 不重复边缘元素本身.
    Reflect,
}

impl<T: Zero> PadMode<T> {
    /// 以 0 填充.
    #[inline]
    pub fn zeros() -> Self {
        Self::Constant(T::zero())
    }
}

/// 填充后长度需要整除的因子.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Divisor {
    /// 所有填充轴使用同一个因子. 需要同时给出目标形状以确定填充轴.
    Scalar(usize),

    /// 每个填充轴一个因子, 作用于最后 `len()` 个轴.
    PerAxis(Vec<usize>),
}

/// 填充参数.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PadSpec<T> {
    /// 最后 `len()` 个轴的最小目标长度.
    pub target_shape: Option<Vec<usize>>,

    /// 整除约束.
    pub divisible_by: Option<Divisor>,

    pub mode: PadMode<T>,
}

impl<T> PadSpec<T> {
    /// 以边缘模式填充到至少 `target_shape`.
    pub fn to_shape(target_shape: Vec<usize>) -> Self {
        Self {
            target_shape: Some(target_shape),
            divisible_by: None,
            mode: PadMode::Edge,
        }
    }

    /// 以边缘模式填充到各轴能被 `divisors` 整除的最小长度.
    pub fn divisible_by(divisors: Vec<usize>) -> Self {
        Self {
            target_shape: None,
            divisible_by: Some(Divisor::PerAxis(divisors)),
            mode: PadMode::Edge,
        }
    }

    pub fn with_divisor(mut self, divisor: Divisor) -> Self {
        self.divisible_by = Some(divisor);
        self
    }

    pub fn with_mode(mut self, mode: PadMode<T>) -> Self {
        self.mode = mode;
        self
    }
}

/// 填充参数错误.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PadError {
    /// 既没有目标形状, 也没有逐轴整除因子.
    NoTarget,

    /// 只给出标量整除因子而没有目标形状, 无法确定填充轴.
    ScalarDivisorWithoutShape,

    /// 填充轴数 `.0` 多于数组维数 `.1`.
    TooManyAxes(usize, usize),

    /// 逐轴整除因子个数 `.0` 与目标形状的轴数 `.1` 不一致.
    DivisorLenMismatch(usize, usize),

    /// 第 `.0` 个轴的整除因子为 0.
    ZeroDivisor(usize),

    /// 第 `.0` 个轴长度为 0, 只能以常数模式填充.
    EmptyAxis(usize),
}

impl fmt::Display for PadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTarget => write!(f, "either a target shape or per-axis divisors is required"),
            Self::ScalarDivisorWithoutShape => {
                write!(f, "a scalar divisor needs a target shape to pick the padded axes")
            }
            Self::TooManyAxes(n, ndim) => write!(f, "cannot pad {n} axes of a {ndim}-d array"),
            Self::DivisorLenMismatch(got, want) => {
                write!(f, "{got} divisors given for {want} padded axes")
            }
            Self::ZeroDivisor(axis) => write!(f, "axis {axis} has a zero divisor"),
            Self::EmptyAxis(axis) => {
                write!(f, "axis {axis} is empty and can only be padded with a constant")
            }
        }
    }
}

impl std::error::Error for PadError {}

pub type PadResult<T> = Result<T, PadError>;

/// 填充结果.
#[derive(Clone, Debug, PartialEq)]
pub struct Padded<T> {
    /// 填充后的数组.
    pub data: ArrayD<T>,

    /// 原数组在每个轴上所处的半开区间. 未填充的轴为 `(0, len)`.
    pub slicer: Vec<Span>,
}

impl<T> Padded<T> {
    /// 截回原数组.
    pub fn crop_back(&self) -> ArrayViewD<'_, T> {
        self.data
            .slice_each_axis(|ad| {
                let (lo, hi) = self.slicer[ad.axis.index()];
                Slice::from(lo..hi)
            })
    }

    #[inline]
    pub fn into_data(self) -> ArrayD<T> {
        self.data
    }
}

/// 计算形状为 `shape` 的数组在 `spec` 下每个轴两端的填充量 `(前端, 后端)`.
pub fn pad_widths<T>(shape: &[usize], spec: &PadSpec<T>) -> PadResult<Vec<Span>> {
    let ndim = shape.len();
    let mut target: Vec<usize> = match (&spec.target_shape, &spec.divisible_by) {
        (Some(t), _) => {
            if t.len() > ndim {
                return Err(PadError::TooManyAxes(t.len(), ndim));
            }
            t.iter()
                .zip(&shape[ndim - t.len()..])
                .map(|(&want, &have)| want.max(have))
                .collect()
        }
        (None, Some(Divisor::PerAxis(d))) => {
            if d.len() > ndim {
                return Err(PadError::TooManyAxes(d.len(), ndim));
            }
            shape[ndim - d.len()..].to_vec()
        }
        (None, Some(Divisor::Scalar(_))) => return Err(PadError::ScalarDivisorWithoutShape),
        (None, None) => return Err(PadError::NoTarget),
    };
    let offset = ndim - target.len();

    if let Some(divisor) = &spec.divisible_by {
        let divisors = match divisor {
            Divisor::Scalar(d) => vec![*d; target.len()],
            Divisor::PerAxis(d) if d.len() != target.len() => {
                return Err(PadError::DivisorLenMismatch(d.len(), target.len()));
            }
            Divisor::PerAxis(d) => d.clone(),
        };
        for (i, (t, d)) in target.iter_mut().zip(divisors).enumerate() {
            if d == 0 {
                return Err(PadError::ZeroDivisor(offset + i));
            }
            *t = t.div_ceil(d) * d;
        }
    }

    let mut widths = vec![(0, 0); ndim];
    for (i, t) in target.into_iter().enumerate() {
        let diff = t - shape[offset + i];
        widths[offset + i] = (diff / 2, diff - diff / 2);
    }
    Ok(widths)
}

/// 按 `spec` 填充 `image`.
///
/// # 例子
///
/// ```
/// use det_berry::data::{pad_nd, PadMode, PadSpec};
/// use ndarray::arr1;
///
/// let image = arr1(&[1, 2, 3]).into_dyn();
/// let spec = PadSpec::to_shape(vec![7]).with_mode(PadMode::Constant(0));
/// let padded = pad_nd(image.view(), &spec).unwrap();
/// assert_eq!(padded.data, arr1(&[0, 0, 1, 2, 3, 0, 0]).into_dyn());
/// assert_eq!(padded.slicer, [(2, 5)]);
/// ```
pub fn pad_nd<T: Clone>(image: ArrayViewD<'_, T>, spec: &PadSpec<T>) -> PadResult<Padded<T>> {
    let shape = image.shape();
    let widths = pad_widths(shape, spec)?;
    let slicer: Vec<Span> = shape
        .iter()
        .zip(widths.iter())
        .map(|(&len, &(below, _))| (below, below + len))
        .collect();

    let data = match &spec.mode {
        PadMode::Constant(v) => {
            let new_shape: Vec<usize> = shape
                .iter()
                .zip(widths.iter())
                .map(|(&len, &(below, above))| below + len + above)
                .collect();
            let mut data = ArrayD::from_elem(IxDyn(&new_shape), v.clone());
            data.slice_each_axis_mut(|ad| {
                let (lo, hi) = slicer[ad.axis.index()];
                Slice::from(lo..hi)
            })
            .assign(&image);
            data
        }
        PadMode::Edge | PadMode::Reflect => {
            let reflect = matches!(spec.mode, PadMode::Reflect);
            let mut data = image.to_owned();
            // 逐轴按下标表整片复制, 不需要填充的轴跳过.
            for (axis, (&len, &(below, above))) in shape.iter().zip(widths.iter()).enumerate() {
                if below + above == 0 {
                    continue;
                }
                if len == 0 {
                    return Err(PadError::EmptyAxis(axis));
                }
                let indices = source_indices(len, below, above, reflect);
                data = data.select(Axis(axis), &indices);
            }
            data
        }
    };
    Ok(Padded { data, slicer })
}

/// 填充后某个轴上每个位置对应的原数组下标. `len` 必须大于 0.
fn source_indices(len: usize, below: usize, above: usize, reflect: bool) -> Vec<usize> {
    let len = len as isize;
    (0..below + len as usize + above)
        .map(|p| {
            let x = p as isize - below as isize;
            if reflect {
                reflect_index(x, len)
            } else {
                x.clamp(0, len - 1) as usize
            }
        })
        .collect()
}

/// 镜像填充的下标, 周期为 `2 * (len - 1)`.
#[inline]
fn reflect_index(x: isize, len: isize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let m = x.rem_euclid(period);
    (if m < len { m } else { period - m }) as usize
}

#[cfg(test)]
mod tests {
    use super::{pad_nd, pad_widths, Divisor, PadError, PadMode, PadSpec};
    use ndarray::{arr1, ArrayD, IxDyn};

    fn sample(shape: &[usize]) -> ArrayD<i32> {
        let mut k = 0;
        ArrayD::from_shape_simple_fn(IxDyn(shape), || {
            k += 1;
            k
        })
    }

    #[test]
    fn test_pad_trailing_axes() {
        let img = sample(&[2, 1, 5, 6]);
        let padded = pad_nd(img.view(), &PadSpec::to_shape(vec![8, 8])).unwrap();
        assert_eq!(padded.data.shape(), [2, 1, 8, 8]);
        assert_eq!(padded.slicer, [(0, 2), (0, 1), (1, 6), (1, 7)]);
        assert_eq!(padded.crop_back(), img.view());
    }

    #[test]
    fn test_never_crops() {
        let img = sample(&[2, 1, 5, 6]);
        let padded = pad_nd(img.view(), &PadSpec::to_shape(vec![3, 9])).unwrap();
        assert_eq!(padded.data.shape(), [2, 1, 5, 9]);
        assert_eq!(padded.slicer[2], (0, 5));
    }

    #[test]
    fn test_odd_difference_goes_after() {
        let widths = pad_widths(&[3], &PadSpec::<u8>::to_shape(vec![6])).unwrap();
        assert_eq!(widths, [(1, 2)]);
    }

    #[test]
    fn test_divisible_by() {
        let img = sample(&[3, 5, 7]);
        let padded = pad_nd(img.view(), &PadSpec::divisible_by(vec![4, 4])).unwrap();
        assert_eq!(padded.data.shape(), [3, 8, 8]);

        let spec = PadSpec::to_shape(vec![5, 8]).with_divisor(Divisor::Scalar(4));
        let img = sample(&[3, 5, 8]);
        let padded = pad_nd(img.view(), &spec).unwrap();
        assert_eq!(padded.data.shape(), [3, 8, 8]);
        assert_eq!(padded.crop_back(), img.view());
    }

    #[test]
    fn test_modes_1d() {
        let img = arr1(&[1, 2, 3]).into_dyn();
        let spec = PadSpec::to_shape(vec![7]);
        let edge = pad_nd(img.view(), &spec).unwrap();
        assert_eq!(edge.data, arr1(&[1, 1, 1, 2, 3, 3, 3]).into_dyn());

        let reflect = pad_nd(img.view(), &spec.clone().with_mode(PadMode::Reflect)).unwrap();
        assert_eq!(reflect.data, arr1(&[3, 2, 1, 2, 3, 2, 1]).into_dyn());

        let zeros = pad_nd(img.view(), &spec.with_mode(PadMode::zeros())).unwrap();
        assert_eq!(zeros.data, arr1(&[0, 0, 1, 2, 3, 0, 0]).into_dyn());
    }

    #[test]
    fn test_crop_back_all_modes() {
        let img = sample(&[2, 3, 4]);
        let modes = [PadMode::Constant(-1), PadMode::Edge, PadMode::Reflect];
        for mode in modes {
            for target in [vec![4, 4], vec![9, 10], vec![5, 6, 7]] {
                let spec = PadSpec::to_shape(target).with_mode(mode.clone());
                let padded = pad_nd(img.view(), &spec).unwrap();
                assert_eq!(padded.crop_back(), img.view());
            }
        }
    }

    #[test]
    fn test_divisible_grid() {
        let modes = [PadMode::Constant(0), PadMode::Edge, PadMode::Reflect];
        for len in 1..=20usize {
            let img = sample(&[2, len]);
            for k in 1..=8usize {
                for target in [None, Some(1), Some(len + 3), Some(17)] {
                    let spec = match target {
                        Some(t) => PadSpec::to_shape(vec![t]).with_divisor(Divisor::Scalar(k)),
                        None => PadSpec::divisible_by(vec![k]),
                    };
                    let want = target.unwrap_or(0).max(len);
                    for mode in modes.iter() {
                        let spec = spec.clone().with_mode(mode.clone());
                        let padded = pad_nd(img.view(), &spec).unwrap();
                        let got = padded.data.shape()[1];
                        assert_eq!(got % k, 0, "len {len}, k {k}, target {target:?}");
                        assert!(got >= want);
                        assert!(got < want + k);
                        assert_eq!(padded.data.shape()[0], 2);
                        assert_eq!(padded.crop_back(), img.view());
                    }
                }
            }
        }
    }

    #[test]
    fn test_modes_2d() {
        let img = sample(&[2, 3]);
        let spec = PadSpec::to_shape(vec![4, 5]);
        let edge = pad_nd(img.view(), &spec).unwrap();
        // 两个轴的两端各填充一格.
        let expected = ndarray::arr2(&[
            [1, 1, 2, 3, 3],
            [1, 1, 2, 3, 3],
            [4, 4, 5, 6, 6],
            [4, 4, 5, 6, 6],
        ]);
        assert_eq!(edge.data, expected.into_dyn());

        let reflect = pad_nd(img.view(), &spec.with_mode(PadMode::Reflect)).unwrap();
        let expected = ndarray::arr2(&[
            [5, 4, 5, 6, 5],
            [2, 1, 2, 3, 2],
            [5, 4, 5, 6, 5],
            [2, 1, 2, 3, 2],
        ]);
        assert_eq!(reflect.data, expected.into_dyn());
        assert_eq!(reflect.slicer, [(1, 3), (1, 4)]);
    }

    #[test]
    fn test_empty_axis() {
        let img = sample(&[0, 3]);
        let spec = PadSpec::to_shape(vec![2, 3]);
        assert_eq!(pad_nd(img.view(), &spec).unwrap_err(), PadError::EmptyAxis(0));

        let padded = pad_nd(img.view(), &spec.with_mode(PadMode::Constant(5))).unwrap();
        assert!(padded.data.iter().all(|&v| v == 5));
        assert_eq!(padded.data.shape(), [2, 3]);
    }

    #[test]
    fn test_pad_errors() {
        let shape = [4, 4];
        let none = PadSpec::<u8> {
            target_shape: None,
            divisible_by: None,
            mode: PadMode::Edge,
        };
        assert_eq!(pad_widths(&shape, &none).unwrap_err(), PadError::NoTarget);
        assert_eq!(
            pad_widths(&shape, &none.clone().with_divisor(Divisor::Scalar(2))).unwrap_err(),
            PadError::ScalarDivisorWithoutShape
        );
        assert_eq!(
            pad_widths(&shape, &PadSpec::<u8>::to_shape(vec![1, 1, 1])).unwrap_err(),
            PadError::TooManyAxes(3, 2)
        );
        assert_eq!(
            pad_widths(
                &shape,
                &PadSpec::<u8>::to_shape(vec![4, 4]).with_divisor(Divisor::PerAxis(vec![2]))
            )
            .unwrap_err(),
            PadError::DivisorLenMismatch(1, 2)
        );
        assert_eq!(
            pad_widths(&shape, &PadSpec::<u8>::divisible_by(vec![2, 0])).unwrap_err(),
            PadError::ZeroDivisor(1)
        );
    }
}
