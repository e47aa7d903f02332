//! 分割掩码 -> ROI 检测框.
//!
//! 输入批次的分割数组形状为 `(batch, channel, *spatial)`. 对每个样本:
//!
//! 1. 得到 ROI 实例: 实例掩码模式下, 每个正整数值 `r` 就是第 `r` 个 ROI;
//!    类别图模式下, 对前景做连通域标记, 每个连通域是一个 ROI.
//! 2. 为每个实际存在的 ROI 生成外扩一个体素的检测框, 二值掩码和类别.
//! 3. 重写分割数组: 二值前景或逐体素类别.
//!
//! 实例掩码中没有体素的编号会被丢弃, 其类别和附加属性一并丢弃.

use super::label::{label_components, Connectivity};
use crate::consts::is_background;
use log::{debug, trace};
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, Axis, Dimension, IxDyn};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// 单个样本的类别标注.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassTargets {
    /// 实例掩码模式: 第 `r` 个 ROI 的类别位于下标 `r - 1`.
    PerRoi(Vec<u32>),

    /// 类别图模式: 样本中所有 ROI 共用一个类别.
    PerSample(u32),
}

/// 检测框提取配置.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BBoxConfig {
    /// 空间维度, 2 或 3.
    pub dim: usize,

    /// 需要随 ROI 一起筛选的附加属性名. 未列出的属性原样透传.
    pub roi_item_keys: Vec<String>,

    /// 是否为类别图模式.
    pub rois_from_classmap: bool,

    /// 输出的分割数组是否保留逐体素类别. 否则输出二值前景.
    pub class_specific_seg: bool,

    /// 类别图模式下连通域的连通性.
    pub connectivity: Connectivity,
}

impl BBoxConfig {
    /// 实例掩码模式, 二值分割输出, 无附加属性.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            roi_item_keys: Vec::new(),
            rois_from_classmap: false,
            class_specific_seg: false,
            connectivity: Connectivity::Face,
        }
    }

    pub fn with_item_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roi_item_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn from_classmap(mut self, connectivity: Connectivity) -> Self {
        self.rois_from_classmap = true;
        self.connectivity = connectivity;
        self
    }

    pub fn class_specific(mut self, yes: bool) -> Self {
        self.class_specific_seg = yes;
        self
    }
}

/// 输入批次.
#[derive(Clone, Debug, PartialEq)]
pub struct SegBatch {
    /// 分割数组, 形状 `(batch, channel, *spatial)`, 0 为背景.
    pub seg: ArrayD<u32>,

    /// 每个样本的类别标注.
    pub class_targets: Vec<ClassTargets>,

    /// 附加属性. 每个属性对每个样本给出一个二维数组, 第 `i` 行属于第 `i + 1` 个 ROI;
    /// 类别图模式下只使用第 0 行.
    pub roi_items: BTreeMap<String, Vec<Array2<f32>>>,
}

/// 检测框. `lo` 和 `hi` 按空间轴顺序给出, 已向外各扩展一个体素, 因此可能为 -1
/// 或等于轴长.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoiBox {
    lo: Vec<i64>,
    hi: Vec<i64>,
}

impl RoiBox {
    #[inline]
    pub fn lo(&self) -> &[i64] {
        &self.lo
    }

    #[inline]
    pub fn hi(&self) -> &[i64] {
        &self.hi
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.lo.len()
    }

    /// 检测框坐标, 2D 为 `[y1, x1, y2, x2]`, 3D 为 `[y1, x1, y2, x2, z1, z2]`.
    pub fn coords(&self) -> Vec<i64> {
        let mut ans = vec![self.lo[0], self.lo[1], self.hi[0], self.hi[1]];
        if self.dim() == 3 {
            ans.extend([self.lo[2], self.hi[2]]);
        }
        ans
    }
}

/// 单个样本的提取结果.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleRois {
    /// 检测框.
    pub boxes: Vec<RoiBox>,

    /// ROI 掩码, 形状 `(n_rois, channel, *spatial)`. 没有 ROI 时为一个全零掩码.
    pub masks: ArrayD<u8>,

    /// 每个 ROI 的类别.
    pub class_targets: Vec<u32>,

    /// 每个声明的附加属性筛选后的行.
    pub items: BTreeMap<String, Array2<f32>>,

    /// 重写后的分割数组, 形状 `(channel, *spatial)`.
    pub seg: ArrayD<u32>,
}

/// 输出批次. 除 `seg` 外, 各字段都按样本排列.
#[derive(Clone, Debug, PartialEq)]
pub struct RoiBatch {
    pub bb_target: Vec<Vec<RoiBox>>,
    pub roi_masks: Vec<ArrayD<u8>>,
    pub seg: ArrayD<u32>,
    pub class_targets: Vec<Vec<u32>>,
    pub roi_items: BTreeMap<String, Vec<Array2<f32>>>,
}

/// 提取错误.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BBoxError {
    /// 空间维度必须为 2 或 3.
    UnsupportedDim(usize),

    /// 分割数组维数 `.0` 与期望的 `.1` 不一致.
    /// 批次为 `(batch, channel, *spatial)`, 单个样本为 `(channel, *spatial)`.
    BadShape(usize, usize),

    /// 批次中的属性长度与批大小不一致. `(属性名, 批大小, 实际长度)`.
    BatchLenMismatch(String, usize, usize),

    /// 声明的附加属性不存在.
    MissingItem(String),

    /// 第 `.0` 个样本的类别标注形式与模式不符.
    ClassTargetsKind(usize),

    /// 第 `sample` 个样本的第 `roi` 个 ROI 缺少类别或附加属性.
    MissingRoiTarget { sample: usize, roi: usize },

    /// 第 `sample` 个样本的第 `roi` 个 ROI 的类别为背景.
    BackgroundRoi { sample: usize, roi: usize },
}

impl fmt::Display for BBoxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDim(d) => write!(f, "{d}-d boxes are not supported"),
            Self::BadShape(got, want) => {
                write!(f, "seg has {got} axes, expected {want}")
            }
            Self::BatchLenMismatch(key, b, got) => {
                write!(f, "{key} has {got} entries for a batch of {b}")
            }
            Self::MissingItem(key) => write!(f, "declared roi item {key} is missing"),
            Self::ClassTargetsKind(b) => {
                write!(f, "sample {b}: class targets do not match the roi mode")
            }
            Self::MissingRoiTarget { sample, roi } => {
                write!(f, "sample {sample}: roi {roi} has no class target or item row")
            }
            Self::BackgroundRoi { sample, roi } => {
                write!(f, "sample {sample}: roi {roi} is labelled as background")
            }
        }
    }
}

impl std::error::Error for BBoxError {}

pub type BBoxResult<T> = Result<T, BBoxError>;

/// 逐样本提取检测框.
pub fn extract(batch: SegBatch, config: &BBoxConfig) -> BBoxResult<RoiBatch> {
    let declared = check_batch(&batch, config)?;
    let samples = batch
        .seg
        .axis_iter(Axis(0))
        .enumerate()
        .map(|(b, seg)| {
            let items = sample_items(&batch, &declared, b);
            extract_sample(b, seg, &batch.class_targets[b], &items, config)
        })
        .collect::<BBoxResult<Vec<_>>>()?;
    Ok(assemble(batch, declared, samples))
}

/// 并行逐样本提取检测框, 结果与 [`extract`] 完全一致.
#[cfg(feature = "rayon")]
pub fn par_extract(batch: SegBatch, config: &BBoxConfig) -> BBoxResult<RoiBatch> {
    let declared = check_batch(&batch, config)?;
    let samples = batch
        .seg
        .axis_iter(Axis(0))
        .into_par_iter()
        .enumerate()
        .map(|(b, seg)| {
            let items = sample_items(&batch, &declared, b);
            extract_sample(b, seg, &batch.class_targets[b], &items, config)
        })
        .collect::<BBoxResult<Vec<_>>>()?;
    Ok(assemble(batch, declared, samples))
}

/// 检查批次形状, 返回声明的附加属性名.
fn check_batch(batch: &SegBatch, config: &BBoxConfig) -> BBoxResult<Vec<String>> {
    if !matches!(config.dim, 2 | 3) {
        return Err(BBoxError::UnsupportedDim(config.dim));
    }
    if batch.seg.ndim() != config.dim + 2 {
        return Err(BBoxError::BadShape(batch.seg.ndim(), config.dim + 2));
    }
    let b = batch.seg.len_of(Axis(0));
    if batch.class_targets.len() != b {
        return Err(BBoxError::BatchLenMismatch(
            "class_targets".to_string(),
            b,
            batch.class_targets.len(),
        ));
    }
    for key in config.roi_item_keys.iter() {
        let arrays = batch
            .roi_items
            .get(key)
            .ok_or_else(|| BBoxError::MissingItem(key.clone()))?;
        if arrays.len() != b {
            return Err(BBoxError::BatchLenMismatch(key.clone(), b, arrays.len()));
        }
    }
    Ok(config.roi_item_keys.clone())
}

/// 第 `b` 个样本的声明属性.
fn sample_items<'a>(batch: &'a SegBatch, declared: &'a [String], b: usize) -> Vec<(&'a str, ArrayView2<'a, f32>)> {
    declared
        .iter()
        .map(|key| (key.as_str(), batch.roi_items[key][b].view()))
        .collect()
}

/// 将逐样本结果拼成输出批次. 未声明的附加属性原样透传.
fn assemble(batch: SegBatch, declared: Vec<String>, samples: Vec<SampleRois>) -> RoiBatch {
    let SegBatch {
        mut seg,
        mut roi_items,
        ..
    } = batch;
    for key in declared.iter() {
        roi_items.remove(key);
    }

    let mut bb_target = Vec::with_capacity(samples.len());
    let mut roi_masks = Vec::with_capacity(samples.len());
    let mut class_targets = Vec::with_capacity(samples.len());
    for (b, sample) in samples.into_iter().enumerate() {
        seg.index_axis_mut(Axis(0), b).assign(&sample.seg);
        bb_target.push(sample.boxes);
        roi_masks.push(sample.masks);
        class_targets.push(sample.class_targets);
        for (key, rows) in sample.items {
            roi_items.entry(key).or_default().push(rows);
        }
    }
    RoiBatch {
        bb_target,
        roi_masks,
        seg,
        class_targets,
        roi_items,
    }
}

/// 每个 ROI 在各空间轴上的最小, 最大坐标.
struct Extent {
    lo: Vec<usize>,
    hi: Vec<usize>,
}

impl Extent {
    fn new(pos: &[usize]) -> Self {
        Self {
            lo: pos.to_vec(),
            hi: pos.to_vec(),
        }
    }

    fn update(&mut self, pos: &[usize]) {
        for ((lo, hi), &p) in self.lo.iter_mut().zip(self.hi.iter_mut()).zip(pos) {
            *lo = (*lo).min(p);
            *hi = (*hi).max(p);
        }
    }

    fn to_box(&self) -> RoiBox {
        RoiBox {
            lo: self.lo.iter().map(|&v| v as i64 - 1).collect(),
            hi: self.hi.iter().map(|&v| v as i64 + 1).collect(),
        }
    }
}

/// 处理单个样本. `seg` 的形状为 `(channel, *spatial)`, 空间维数必须等于 `config.dim`.
pub fn extract_sample(
    sample: usize,
    seg: ArrayViewD<'_, u32>,
    targets: &ClassTargets,
    items: &[(&str, ArrayView2<'_, f32>)],
    config: &BBoxConfig,
) -> BBoxResult<SampleRois> {
    if !matches!(config.dim, 2 | 3) {
        return Err(BBoxError::UnsupportedDim(config.dim));
    }
    if seg.ndim() != config.dim + 1 {
        return Err(BBoxError::BadShape(seg.ndim(), config.dim + 1));
    }
    if seg.iter().all(|&v| v == 0) {
        trace!("sample {sample} has no foreground");
        let mut mask_shape = vec![1];
        mask_shape.extend_from_slice(seg.shape());
        return Ok(SampleRois {
            boxes: Vec::new(),
            masks: ArrayD::zeros(IxDyn(&mask_shape)),
            class_targets: Vec::new(),
            items: items
                .iter()
                .map(|(key, arr)| (key.to_string(), Array2::zeros((0, arr.ncols()))))
                .collect(),
            seg: seg.to_owned(),
        });
    }

    let (instances, n, classes): (ArrayD<u32>, usize, Vec<u32>) = match (config.rois_from_classmap, targets) {
        (true, ClassTargets::PerSample(c)) => {
            let (labels, n) = label_components(seg.view(), config.connectivity);
            (labels, n, vec![*c; n])
        }
        (false, ClassTargets::PerRoi(v)) => {
            let n = seg.iter().copied().max().unwrap_or(0) as usize;
            (seg.to_owned(), n, v.clone())
        }
        _ => return Err(BBoxError::ClassTargetsKind(sample)),
    };

    // 一次遍历收集所有 ROI 的范围. 第 0 轴是通道, 不参与检测框.
    let mut extents: Vec<Option<Extent>> = (0..n).map(|_| None).collect();
    for (idx, &v) in instances.indexed_iter() {
        if v == 0 {
            continue;
        }
        let pos = &idx.slice()[1..];
        match &mut extents[v as usize - 1] {
            Some(ext) => ext.update(pos),
            slot => *slot = Some(Extent::new(pos)),
        }
    }

    let mut survivors = Vec::with_capacity(n);
    for (r, ext) in extents.iter().enumerate() {
        let Some(ext) = ext else {
            debug!("sample {sample}: roi {r} has no voxels, dropped");
            continue;
        };
        let class = *classes
            .get(r)
            .ok_or(BBoxError::MissingRoiTarget { sample, roi: r })?;
        if is_background(class) {
            return Err(BBoxError::BackgroundRoi { sample, roi: r });
        }
        let row = if config.rois_from_classmap { 0 } else { r };
        if let Some((key, _)) = items.iter().find(|(_, arr)| arr.nrows() <= row) {
            debug!("sample {sample}: roi item {key} has no row {row}");
            return Err(BBoxError::MissingRoiTarget { sample, roi: r });
        }
        survivors.push((r as u32 + 1, class, row, ext.to_box()));
    }

    let mut mask_shape = vec![survivors.len()];
    mask_shape.extend_from_slice(seg.shape());
    let mut masks = ArrayD::<u8>::zeros(IxDyn(&mask_shape));
    for (mut mask, (label, ..)) in masks.outer_iter_mut().zip(survivors.iter()) {
        mask.zip_mut_with(&instances, |m, &v| *m = u8::from(v == *label));
    }

    let out_items = items
        .iter()
        .map(|(key, arr)| {
            let mut rows = Array2::<f32>::zeros((survivors.len(), arr.ncols()));
            for (mut dst, &(_, _, row, _)) in rows.outer_iter_mut().zip(survivors.iter()) {
                dst.assign(&arr.row(row));
            }
            (key.to_string(), rows)
        })
        .collect();

    let out_seg = if config.class_specific_seg {
        // 所有非零体素都属于某个存活的 ROI, 其类别已检查过.
        instances.mapv(|v| if v == 0 { 0 } else { classes[v as usize - 1] })
    } else {
        instances.mapv(|v| u32::from(v > 0))
    };

    Ok(SampleRois {
        class_targets: survivors.iter().map(|&(_, c, ..)| c).collect(),
        boxes: survivors.into_iter().map(|(.., b)| b).collect(),
        masks,
        items: out_items,
        seg: out_seg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array};

    /// 20x20 的单样本单通道分割: ROI 1 占据第 0~2 行, ROI 2 占据第 10~12 行.
    fn two_roi_seg() -> ArrayD<u32> {
        let mut seg = Array::zeros((1, 1, 20, 20));
        seg.slice_mut(s![0, 0, 0..3, 5..8]).fill(1);
        seg.slice_mut(s![0, 0, 10..13, 3..5]).fill(2);
        seg.into_dyn()
    }

    fn batch_of(seg: ArrayD<u32>, targets: Vec<ClassTargets>) -> SegBatch {
        SegBatch {
            seg,
            class_targets: targets,
            roi_items: BTreeMap::new(),
        }
    }

    #[test]
    fn test_two_instances() {
        let batch = batch_of(two_roi_seg(), vec![ClassTargets::PerRoi(vec![3, 5])]);
        let out = extract(batch, &BBoxConfig::new(2)).unwrap();

        let coords: Vec<Vec<i64>> = out.bb_target[0].iter().map(RoiBox::coords).collect();
        assert_eq!(coords, [vec![-1, 4, 3, 8], vec![9, 2, 13, 5]]);
        assert_eq!(out.class_targets, [vec![3, 5]]);
        assert_eq!(out.roi_masks[0].shape(), [2, 1, 20, 20]);
        assert_eq!(out.roi_masks[0].index_axis(Axis(0), 0).sum(), 9);
        assert_eq!(out.roi_masks[0].index_axis(Axis(0), 1).sum(), 6);

        assert!(out.seg.iter().all(|&v| v <= 1));
        assert_eq!(out.seg.sum(), 15);
    }

    #[test]
    fn test_class_specific_seg() {
        let batch = batch_of(two_roi_seg(), vec![ClassTargets::PerRoi(vec![3, 5])]);
        let out = extract(batch, &BBoxConfig::new(2).class_specific(true)).unwrap();
        assert_eq!(out.seg[[0, 0, 1, 6]], 3);
        assert_eq!(out.seg[[0, 0, 11, 4]], 5);
        assert_eq!(out.seg[[0, 0, 5, 5]], 0);
    }

    #[test]
    fn test_absent_instance_dropped() {
        let mut seg = two_roi_seg();
        seg.mapv_inplace(|v| if v == 2 { 3 } else { v });
        let mut batch = batch_of(seg, vec![ClassTargets::PerRoi(vec![3, 4, 5])]);
        let rows = ndarray::array![[1.0f32, 1.5], [2.0, 2.5], [3.0, 3.5]];
        batch.roi_items.insert("regression_targets".to_string(), vec![rows]);

        let config = BBoxConfig::new(2).with_item_keys(["regression_targets"]);
        let out = extract(batch, &config).unwrap();
        assert_eq!(out.bb_target[0].len(), 2);
        assert_eq!(out.class_targets[0], [3, 5]);
        assert_eq!(
            out.roi_items["regression_targets"][0],
            ndarray::array![[1.0f32, 1.5], [3.0, 3.5]]
        );
    }

    #[test]
    fn test_empty_sample() {
        let mut seg = Array::<u32, _>::zeros((2, 1, 20, 20)).into_dyn();
        seg.index_axis_mut(Axis(0), 0)
            .assign(&two_roi_seg().index_axis(Axis(0), 0));
        let mut batch = batch_of(
            seg,
            vec![ClassTargets::PerRoi(vec![3, 5]), ClassTargets::PerRoi(vec![])],
        );
        batch.roi_items.insert(
            "regression_targets".to_string(),
            vec![Array2::ones((2, 4)), Array2::ones((0, 4))],
        );
        batch
            .roi_items
            .insert("meta".to_string(), vec![Array2::zeros((1, 1)), Array2::zeros((1, 1))]);

        let config = BBoxConfig::new(2).with_item_keys(["regression_targets"]);
        let out = extract(batch, &config).unwrap();
        assert!(out.bb_target[1].is_empty());
        assert!(out.class_targets[1].is_empty());
        assert_eq!(out.roi_masks[1].shape(), [1, 1, 20, 20]);
        assert_eq!(out.roi_masks[1].sum(), 0);
        assert_eq!(out.roi_items["regression_targets"][1].shape(), [0, 4]);
        assert_eq!(out.roi_items["regression_targets"][0].shape(), [2, 4]);
        // 未声明的属性原样透传.
        assert_eq!(out.roi_items["meta"].len(), 2);
    }

    #[test]
    fn test_background_class_rejected() {
        let batch = batch_of(two_roi_seg(), vec![ClassTargets::PerRoi(vec![3, 0])]);
        assert_eq!(
            extract(batch, &BBoxConfig::new(2)).unwrap_err(),
            BBoxError::BackgroundRoi { sample: 0, roi: 1 }
        );

        let batch = batch_of(two_roi_seg(), vec![ClassTargets::PerRoi(vec![3])]);
        assert_eq!(
            extract(batch, &BBoxConfig::new(2)).unwrap_err(),
            BBoxError::MissingRoiTarget { sample: 0, roi: 1 }
        );
    }

    #[test]
    fn test_classmap_mode() {
        let mut seg = Array::zeros((1, 1, 8, 8));
        seg.slice_mut(s![0, 0, 0..2, 0..2]).fill(2);
        seg.slice_mut(s![0, 0, 5..7, 5..8]).fill(2);
        let mut batch = batch_of(seg.into_dyn(), vec![ClassTargets::PerSample(7)]);
        batch
            .roi_items
            .insert("regression_targets".to_string(), vec![ndarray::array![[0.5f32]]]);

        let config = BBoxConfig::new(2)
            .from_classmap(Connectivity::Face)
            .with_item_keys(["regression_targets"])
            .class_specific(true);
        let out = extract(batch, &config).unwrap();
        assert_eq!(out.class_targets[0], [7, 7]);
        assert_eq!(out.bb_target[0][1].coords(), [4, 4, 7, 8]);
        assert_eq!(
            out.roi_items["regression_targets"][0],
            ndarray::array![[0.5f32], [0.5]]
        );
        assert_eq!(out.seg[[0, 0, 6, 6]], 7);
    }

    #[test]
    fn test_3d_box_order() {
        let mut seg = Array::zeros((1, 1, 4, 5, 6));
        seg[[0, 0, 1, 2, 3]] = 1;
        seg[[0, 0, 2, 2, 4]] = 1;
        let batch = batch_of(seg.into_dyn(), vec![ClassTargets::PerRoi(vec![1])]);
        let out = extract(batch, &BBoxConfig::new(3)).unwrap();
        assert_eq!(out.bb_target[0][0].coords(), [0, 1, 3, 3, 2, 5]);
        assert_eq!(out.roi_masks[0].shape(), [1, 1, 4, 5, 6]);
    }

    #[test]
    fn test_batch_errors() {
        let batch = batch_of(two_roi_seg(), vec![ClassTargets::PerSample(1)]);
        assert_eq!(
            extract(batch, &BBoxConfig::new(2)).unwrap_err(),
            BBoxError::ClassTargetsKind(0)
        );
        let batch = batch_of(two_roi_seg(), vec![]);
        assert!(matches!(
            extract(batch, &BBoxConfig::new(2)).unwrap_err(),
            BBoxError::BatchLenMismatch(..)
        ));
        let batch = batch_of(two_roi_seg(), vec![ClassTargets::PerRoi(vec![1, 1])]);
        assert_eq!(
            extract(batch.clone(), &BBoxConfig::new(3)).unwrap_err(),
            BBoxError::BadShape(4, 5)
        );
        assert_eq!(
            extract(batch, &BBoxConfig::new(2).with_item_keys(["x"])).unwrap_err(),
            BBoxError::MissingItem("x".to_string())
        );
    }

    #[test]
    fn test_sample_shape_checked() {
        // 只有一个空间轴的样本.
        let mut seg = Array::<u32, _>::zeros((1, 6));
        seg[[0, 2]] = 1;
        let seg = seg.into_dyn();
        let targets = ClassTargets::PerRoi(vec![1]);
        assert_eq!(
            extract_sample(0, seg.view(), &targets, &[], &BBoxConfig::new(2)).unwrap_err(),
            BBoxError::BadShape(2, 3)
        );
        assert_eq!(
            extract_sample(0, seg.view(), &targets, &[], &BBoxConfig::new(1)).unwrap_err(),
            BBoxError::UnsupportedDim(1)
        );

        let sample = two_roi_seg().index_axis_move(Axis(0), 0);
        let out = extract_sample(
            0,
            sample.view(),
            &ClassTargets::PerRoi(vec![1, 2]),
            &[],
            &BBoxConfig::new(2),
        )
        .unwrap();
        assert_eq!(out.boxes.len(), 2);
        assert_eq!(out.boxes[0].coords().len(), 4);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_extract_matches() {
        let mut seg = Array::<u32, _>::zeros((4, 1, 20, 20)).into_dyn();
        for b in 0..3 {
            seg.index_axis_mut(Axis(0), b)
                .assign(&two_roi_seg().index_axis(Axis(0), 0));
        }
        let targets = vec![ClassTargets::PerRoi(vec![1, 2]); 3]
            .into_iter()
            .chain([ClassTargets::PerRoi(vec![])])
            .collect();
        let batch = batch_of(seg, targets);
        let config = BBoxConfig::new(2).class_specific(true);
        assert_eq!(
            extract(batch.clone(), &config).unwrap(),
            par_extract(batch, &config).unwrap()
        );
    }
}
