//! 实验用病例集合.

use det_berry::sampler::ClassTable;
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// 合成病例中各类别的出现权重, 下标 `c - 1` 对应类别 `c`.
const CLASS_WEIGHTS: [u32; 3] = [70, 25, 5];

/// 合成病例最多包含的 ROI 个数.
const MAX_ROIS: usize = 4;

/// 病例集合: 标识及其类别表.
pub struct Cohort {
    pub ids: Vec<String>,
    pub table: ClassTable<String>,
    pub num_classes: u32,
}

impl Cohort {
    /// 以种子 `seed` 生成 `len` 个病例. 每个病例含 `0..=MAX_ROIS` 个 ROI,
    /// 类别按 `CLASS_WEIGHTS` 抽取, 因此类别 3 明显稀少.
    pub fn synthetic(seed: u64, len: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        // 权重为常量且全部为正.
        let classes = WeightedIndex::new(CLASS_WEIGHTS).unwrap();

        let ids: Vec<String> = (0..len).map(|i| format!("case_{i:04}")).collect();
        let table = ids
            .iter()
            .map(|id| {
                let n = rng.gen_range(0..=MAX_ROIS);
                let targets = (0..n)
                    .map(|_| classes.sample(&mut rng) as u32 + 1)
                    .collect();
                (id.clone(), targets)
            })
            .collect();
        Self {
            ids,
            table,
            num_classes: CLASS_WEIGHTS.len() as u32,
        }
    }

    /// 从已有的标识和类别表构造. 类别数取表中出现的最大标签.
    pub fn from_table(ids: Vec<String>, table: ClassTable<String>) -> Self {
        let num_classes = table.values().flatten().copied().max().unwrap_or(1);
        Self {
            ids,
            table,
            num_classes,
        }
    }
}
