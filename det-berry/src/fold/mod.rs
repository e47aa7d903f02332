//! 交叉验证划分.
//!
//! 以给定随机种子打乱标识符, 然后按 "测试集 <- 验证集 <- 训练集" 的方向轮转,
//! 生成 `n_splits` 组 (训练, 验证, 测试) 子集. 每组内三个子集互不相交且并集为全部标识符;
//! 所有划分中, 每个标识符恰好担任一次测试样本.
//!
//! 这种带内层测试集的划分方式适用于数据量有限、但又希望在足够多病例上报告测试指标的场景.
//! 如果已有独立的测试集, 请使用 [`random_chunks`] 只做 train/val 划分.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt;

mod chunks;

pub use chunks::random_chunks;

cfg_if::cfg_if! {
    if #[cfg(feature = "serde")] {
        mod persist;

        pub use persist::{load_folds, load_or_generate, save_folds, PersistError};
        use serde::{Deserialize, Serialize};
    }
}

/// 划分配置错误.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FoldError {
    /// 划分数为 0.
    ZeroSplits,

    /// 标识符个数少于划分数.
    ///
    /// 第一个参数为标识符个数, 第二个参数为划分数.
    TooFewIds(usize, usize),

    /// 轮转方案在该配置下无法保证每个标识符恰好测试一次.
    /// 仅在 `n_splits` 为 2 或 3 且 `len % n_splits == 1` 时出现.
    ///
    /// 第一个参数为标识符个数, 第二个参数为划分数.
    UnsupportedRemainder(usize, usize),
}

impl fmt::Display for FoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSplits => write!(f, "n_splits must be positive"),
            Self::TooFewIds(len, n) => write!(f, "{len} identifiers cannot fill {n} folds"),
            Self::UnsupportedRemainder(len, n) => write!(
                f,
                "{len} identifiers over {n} folds leaves remainder 1, which the rotation cannot partition"
            ),
        }
    }
}

impl std::error::Error for FoldError {}

/// 划分运行时错误.
pub type FoldResult<T> = Result<T, FoldError>;

/// 单个交叉验证划分.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fold<T> {
    /// 训练集.
    pub train: Vec<T>,

    /// 验证集.
    pub val: Vec<T>,

    /// 测试集.
    pub test: Vec<T>,

    /// 划分序号, 从 0 开始.
    pub index: usize,
}

impl<T> Fold<T> {
    /// 三个子集的元素总数.
    #[inline]
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    /// 三个子集是否都为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 依次迭代训练集, 验证集, 测试集中的所有元素.
    #[inline]
    pub fn iter_all(&self) -> impl Iterator<Item = &T> {
        self.train.iter().chain(self.val.iter()).chain(self.test.iter())
    }

    /// 带名字的三个子集, 顺序为 `train`, `val`, `test`.
    #[inline]
    pub fn named_subsets(&self) -> [(&'static str, &[T]); 3] {
        [
            ("train", self.train.as_slice()),
            ("val", self.val.as_slice()),
            ("test", self.test.as_slice()),
        ]
    }
}

/// 交叉验证划分生成器.
///
/// 生成器本身不携带游标状态: 每次调用 [`Self::folds`] 都会从头生成完整的划分序列,
/// 相同种子的结果在不同运行、不同平台之间逐字节一致.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FoldGenerator {
    seed: u64,
    n_splits: usize,
}

impl FoldGenerator {
    /// 以随机种子 `seed` 和划分数 `n_splits` 创建生成器.
    /// 参数在生成时才检查.
    #[inline]
    pub const fn new(seed: u64, n_splits: usize) -> Self {
        Self { seed, n_splits }
    }

    /// 随机种子.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 划分数.
    #[inline]
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// 检查 `len` 个标识符能否按当前配置划分.
    pub fn check(&self, len: usize) -> FoldResult<()> {
        let n = self.n_splits;
        if n == 0 {
            return Err(FoldError::ZeroSplits);
        }
        if len < n {
            return Err(FoldError::TooFewIds(len, n));
        }
        if matches!(n, 2 | 3) && len % n == 1 {
            return Err(FoldError::UnsupportedRemainder(len, n));
        }
        Ok(())
    }

    /// 以种子确定性地打乱 `ids` 的副本.
    pub fn shuffled<T: Clone>(&self, ids: &[T]) -> Vec<T> {
        let mut ans = ids.to_vec();
        ans.shuffle(&mut ChaCha8Rng::seed_from_u64(self.seed));
        ans
    }

    /// 获取按划分序号升序迭代所有划分的迭代器.
    pub fn folds<T: Clone>(&self, ids: &[T]) -> FoldResult<FoldIter<T>> {
        self.check(ids.len())?;
        Ok(FoldIter {
            rotation: Rotation::new(ids.len(), self.n_splits),
            ids: self.shuffled(ids),
            fold: 0,
            n_splits: self.n_splits,
        })
    }

    /// 一次性生成全部 `n_splits` 个划分.
    #[inline]
    pub fn generate<T: Clone>(&self, ids: &[T]) -> FoldResult<Vec<Fold<T>>> {
        Ok(self.folds(ids)?.collect())
    }

    /// 以 `0..len` 作为标识符生成全部划分.
    pub fn generate_from_len(&self, len: usize) -> FoldResult<Vec<Fold<usize>>> {
        let ids: Vec<usize> = (0..len).collect();
        self.generate(&ids)
    }

    /// 获取第 `index` 个划分. `index` 越界时返回 `Ok(None)`.
    #[inline]
    pub fn fold_at<T: Clone>(&self, ids: &[T], index: usize) -> FoldResult<Option<Fold<T>>> {
        Ok(self.folds(ids)?.nth(index))
    }
}

/// 轮转方案. 内部只记录打乱后序列中的位置.
#[derive(Clone, Debug)]
struct Rotation {
    train: Vec<usize>,
    val: Vec<usize>,
    test: Vec<usize>,

    /// 向上取整的子集长度.
    slicer: usize,

    /// `len % n_splits`.
    remainder: usize,

    /// 前 `missing` 次轮转取出的验证集比 `slicer` 少一个元素.
    missing: usize,

    n_splits: usize,
}

impl Rotation {
    fn new(len: usize, n_splits: usize) -> Self {
        let slicer = len.div_ceil(n_splits);
        let remainder = len % n_splits;
        let missing = if remainder > 0 { n_splits - remainder } else { 0 };

        let val_end = (2 * slicer).min(len);
        Self {
            test: (0..slicer).collect(),
            val: (slicer..val_end).collect(),
            train: (val_end..len).collect(),
            slicer,
            remainder,
            missing,
            n_splits,
        }
    }

    /// 从第 `fold` 个划分推进到下一个: 验证集成为测试集, 训练集头部成为验证集,
    /// 旧测试集追加到训练集尾部.
    fn advance(&mut self, fold: usize) {
        let slicer = if fold < self.missing {
            self.slicer - 1
        } else {
            self.slicer
        };

        let mut outgoing = std::mem::take(&mut self.test);
        // 余数为 1 时, 两个向上取整的子集都会轮转到同一个测试集里.
        // 在倒数第二次轮转时从验证集尾部挪出一个元素, 以免最后一个测试集重复.
        if self.remainder == 1 && fold + 2 == self.n_splits {
            outgoing.extend(self.val.pop());
        }

        self.test = std::mem::take(&mut self.val);
        let rest = self.train.split_off(slicer.min(self.train.len()));
        self.val = std::mem::replace(&mut self.train, rest);
        self.train.extend(outgoing);
    }
}

/// 划分迭代器. 由 [`FoldGenerator::folds`] 创建.
#[derive(Clone, Debug)]
pub struct FoldIter<T> {
    ids: Vec<T>,
    rotation: Rotation,
    fold: usize,
    n_splits: usize,
}

impl<T: Clone> FoldIter<T> {
    fn pick(&self, positions: &[usize]) -> Vec<T> {
        positions.iter().map(|&p| self.ids[p].clone()).collect()
    }
}

impl<T: Clone> Iterator for FoldIter<T> {
    type Item = Fold<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fold == self.n_splits {
            return None;
        }
        let ans = Fold {
            train: self.pick(&self.rotation.train),
            val: self.pick(&self.rotation.val),
            test: self.pick(&self.rotation.test),
            index: self.fold,
        };
        self.rotation.advance(self.fold);
        self.fold += 1;
        Some(ans)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.n_splits - self.fold;
        (n, Some(n))
    }
}

impl<T: Clone> ExactSizeIterator for FoldIter<T> {}
