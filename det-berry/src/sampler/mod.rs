//! 类别均衡的病例批采样.
//!
//! 每个病例可以包含若干个 ROI, 每个 ROI 带有一个前景类别标签 (`1..=num_classes`).
//! [`BalancedSampler`] 逐个填充批次中的位置, 每个位置优先选择包含
//! "当前批次中最稀有类别" 的病例. 批次开头 `random_ratio` 比例的位置放宽挑选条件.
//!
//! 这是一个贪心的启发式方法, 并不保证批次中各类别严格均衡.

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

mod distribution;
mod stats;
mod subsets;

pub use distribution::target_distribution;
pub use stats::SamplerStats;
pub use subsets::{subset_stats, CohortStats, SubsetStats};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 病例标识 -> 该病例每个 ROI 的类别标签.
pub type ClassTable<K> = HashMap<K, Vec<u32>>;

/// 采样错误.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SampleError {
    /// 批大小为 0.
    ZeroBatchSize,

    /// 类别数为 0.
    ZeroClasses,

    /// 随机位置比例不在 `[0, 1]` 内.
    RatioOutOfRange(f64),

    /// 候选病例为空.
    EmptyPool,

    /// 候选列表中第 `.0` 个病例在类别表中没有记录.
    MissingTargets(usize),

    /// 候选列表中第 `.0` 个病例含有越界的类别标签 `.1`.
    LabelOutOfRange(usize, u32),

    /// 所有候选病例都不含前景 ROI, 无法计算分布.
    NoForeground,

    /// 类别表中出现越界的类别标签. 有多个时给出最小的一个.
    InvalidClass(u32),

    /// 第 `subset` 个子集中的第 `index` 个病例在类别表中没有记录.
    MissingSubsetTargets { subset: usize, index: usize },
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroBatchSize => write!(f, "batch size must be positive"),
            Self::ZeroClasses => write!(f, "num_classes must be positive"),
            Self::RatioOutOfRange(r) => write!(f, "random ratio {r} is outside [0, 1]"),
            Self::EmptyPool => write!(f, "no eligible patients to sample from"),
            Self::MissingTargets(i) => write!(f, "eligible patient #{i} has no class targets"),
            Self::LabelOutOfRange(i, c) => {
                write!(f, "eligible patient #{i} carries class {c} outside the label domain")
            }
            Self::NoForeground => write!(f, "no eligible patient contains a foreground roi"),
            Self::InvalidClass(c) => write!(f, "class table carries class {c} outside the label domain"),
            Self::MissingSubsetTargets { subset, index } => {
                write!(f, "patient #{index} of subset #{subset} has no class targets")
            }
        }
    }
}

impl std::error::Error for SampleError {}

/// 采样运行时错误.
pub type SampleResult<T> = Result<T, SampleError>;

/// 采样器配置.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SamplerConfig {
    /// 批大小.
    pub batch_size: usize,

    /// 前景类别数, 类别标签取值为 `1..=num_classes`.
    pub num_classes: u32,

    /// 批次开头不做 "自身最稀有类别" 检查的位置所占比例, 取值 `[0, 1]`.
    pub random_ratio: f64,
}

impl SamplerConfig {
    #[inline]
    pub const fn new(batch_size: usize, num_classes: u32, random_ratio: f64) -> Self {
        Self {
            batch_size,
            num_classes,
            random_ratio,
        }
    }

    /// 检查配置是否有效.
    pub fn check(&self) -> SampleResult<()> {
        if self.batch_size == 0 {
            return Err(SampleError::ZeroBatchSize);
        }
        if self.num_classes == 0 {
            return Err(SampleError::ZeroClasses);
        }
        if !(0.0..=1.0).contains(&self.random_ratio) {
            return Err(SampleError::RatioOutOfRange(self.random_ratio));
        }
        Ok(())
    }

    /// 批次开头不做自身最稀有类别检查的位置个数, 向下取整.
    #[inline]
    pub fn random_slots(&self) -> usize {
        (self.batch_size as f64 * self.random_ratio) as usize
    }
}

/// 采样过程中出现的可恢复情况.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SampleNote {
    /// 候选池在填充第 `slot` 个位置前耗尽, 已用全部候选重新填充,
    /// 因此该批次中可能出现重复病例.
    PoolRecycled { slot: usize },

    /// 类别 `class` 在候选病例中不存在, 对应位置退化为取打乱后的第一个病例.
    /// 每个批次最多记录一次.
    ClassNotRepresented { class: u32 },
}

/// 一个采样批次.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch<K> {
    /// 按位置排列的病例标识. 长度等于批大小.
    pub ids: Vec<K>,

    /// 批次中各类别的 ROI 数. `class_counts[c - 1]` 对应类别 `c`.
    pub class_counts: Vec<usize>,

    /// 采样过程中出现的可恢复情况.
    pub notes: Vec<SampleNote>,
}

impl<K> Batch<K> {
    /// 类别 `class` 在批次中的 ROI 数. 越界类别返回 0.
    #[inline]
    pub fn count_of(&self, class: u32) -> usize {
        class
            .checked_sub(1)
            .and_then(|i| self.class_counts.get(i as usize))
            .copied()
            .unwrap_or(0)
    }

    /// 候选池是否被重新填充过.
    pub fn is_recycled(&self) -> bool {
        self.notes
            .iter()
            .any(|n| matches!(n, SampleNote::PoolRecycled { .. }))
    }
}

/// 类别均衡采样器.
///
/// 采样器持有自己的随机数生成器, 相同种子和相同输入会得到相同的批次序列.
pub struct BalancedSampler<R = ChaCha8Rng> {
    config: SamplerConfig,
    rng: R,
}

impl BalancedSampler<ChaCha8Rng> {
    /// 以种子 `seed` 创建采样器.
    pub fn seeded(config: SamplerConfig, seed: u64) -> SampleResult<Self> {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> BalancedSampler<R> {
    /// 使用给定的随机数生成器创建采样器.
    pub fn with_rng(config: SamplerConfig, rng: R) -> SampleResult<Self> {
        config.check()?;
        Ok(Self { config, rng })
    }

    #[inline]
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// 从 `eligible` 中抽取一个批次.
    ///
    /// 每个位置先打乱候选池, 然后扫描包含当前最稀有类别的病例:
    /// 前 `random_slots` 个位置直接接受第一个这样的病例; 其余位置要求病例自身的最稀有类别
    /// 与之不同, 找不到时取最后一个包含该类别的病例. 没有任何候选包含该类别时,
    /// 取打乱后的第一个病例.
    ///
    /// 选中的病例会从候选池中移除 (`eligible` 中的重复项一并移除).
    /// 候选池耗尽时用全部候选重新填充, 并记录 [`SampleNote::PoolRecycled`].
    ///
    /// # 注意
    ///
    /// `eligible` 中的每个病例都必须在 `table` 中有记录.
    /// 不含 ROI 的病例用空列表表示.
    pub fn sample_batch<K>(&mut self, eligible: &[K], table: &ClassTable<K>) -> SampleResult<Batch<K>>
    where
        K: Clone + Eq + Hash,
    {
        if eligible.is_empty() {
            return Err(SampleError::EmptyPool);
        }
        let num_classes = self.config.num_classes;
        let histograms = eligible
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let targets = table.get(id).ok_or(SampleError::MissingTargets(i))?;
                class_histogram(targets, num_classes).map_err(|c| SampleError::LabelOutOfRange(i, c))
            })
            .collect::<SampleResult<Vec<_>>>()?;

        let random_slots = self.config.random_slots();
        let mut counts = vec![0usize; num_classes as usize];
        let mut rarest = self.rng.gen_range(1..=num_classes);
        let mut pool: Vec<usize> = (0..eligible.len()).collect();
        let mut ids = Vec::with_capacity(self.config.batch_size);
        let mut notes = Vec::new();
        let mut unrepresented_noted = false;

        for slot in 0..self.config.batch_size {
            if pool.is_empty() {
                warn!("patient pool exhausted at slot {slot}, recycling all eligible patients");
                notes.push(SampleNote::PoolRecycled { slot });
                pool.extend(0..eligible.len());
            }

            pool.shuffle(&mut self.rng);
            let chosen =
                pick_for_class(&pool, &histograms, rarest, slot < random_slots).unwrap_or(pool[0]);

            counts
                .iter_mut()
                .zip(histograms[chosen].iter())
                .for_each(|(total, c)| *total += c);
            ids.push(eligible[chosen].clone());
            pool.retain(|&p| eligible[p] != eligible[chosen]);

            if slot >= random_slots && counts[(rarest - 1) as usize] == 0 && !unrepresented_noted {
                warn!("class {rarest} is not represented among eligible patients");
                notes.push(SampleNote::ClassNotRepresented { class: rarest });
                unrepresented_noted = true;
            }
            rarest = argmin_class(&counts);
        }

        debug!("sampled batch class counts: {counts:?}");
        Ok(Batch {
            ids,
            class_counts: counts,
            notes,
        })
    }
}

/// 统计 `targets` 中各类别出现次数, 下标 `c - 1` 对应类别 `c`.
/// 出现越界标签时返回该标签.
fn class_histogram(targets: &[u32], num_classes: u32) -> Result<Vec<usize>, u32> {
    let mut hist = vec![0usize; num_classes as usize];
    for &t in targets {
        if t == 0 || t > num_classes {
            return Err(t);
        }
        hist[(t - 1) as usize] += 1;
    }
    Ok(hist)
}

/// 计数最少的类别. 并列时取编号最小者.
#[inline]
fn argmin_class(hist: &[usize]) -> u32 {
    hist.iter()
        .enumerate()
        .min_by_key(|(_, c)| **c)
        .map_or(1, |(i, _)| i as u32 + 1)
}

/// 在候选池中为类别 `rarest` 挑选病例. `first_hit` 为真时直接接受第一个包含该类别的病例.
fn pick_for_class(
    pool: &[usize],
    histograms: &[Vec<usize>],
    rarest: u32,
    first_hit: bool,
) -> Option<usize> {
    let class = (rarest - 1) as usize;
    let mut pick = None;
    for &cand in pool {
        let hist = &histograms[cand];
        if hist[class] == 0 {
            continue;
        }
        pick = Some(cand);
        if first_hit || argmin_class(hist) != rarest {
            break;
        }
    }
    pick
}
