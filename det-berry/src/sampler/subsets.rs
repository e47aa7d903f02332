//! 病例集合的 ROI 统计.
//!
//! 用于检查划分后各子集 (例如某一折的 train/val/test) 的类别分布是否与全体一致.

use super::{ClassTable, SampleError, SampleResult};
use std::hash::Hash;
use std::io::{self, Write};

/// 一组病例的 ROI 统计.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubsetStats {
    /// 子集名.
    pub name: String,

    /// 病例数.
    pub patients: usize,

    /// 不含 ROI 的病例数.
    pub empty_patients: usize,

    /// 各类别 ROI 数, `roi_counts[c - 1]` 对应类别 `c`.
    pub roi_counts: Vec<u64>,
}

impl SubsetStats {
    fn new(name: &str, num_classes: u32) -> Self {
        Self {
            name: name.to_string(),
            patients: 0,
            empty_patients: 0,
            roi_counts: vec![0; num_classes as usize],
        }
    }

    /// 累计一个病例. 标签必须已经检查过.
    fn add(&mut self, targets: &[u32]) {
        self.patients += 1;
        if targets.is_empty() {
            self.empty_patients += 1;
        }
        for &c in targets {
            self.roi_counts[(c - 1) as usize] += 1;
        }
    }

    #[inline]
    pub fn total_rois(&self) -> u64 {
        self.roi_counts.iter().sum()
    }

    /// 类别 `class` 的 ROI 占子集全部 ROI 的比例. 子集没有 ROI 时返回 `None`.
    pub fn roi_fraction(&self, class: u32) -> Option<f64> {
        let total = self.total_rois();
        let n = *self.roi_counts.get(class.checked_sub(1)? as usize)?;
        (total > 0).then(|| n as f64 / total as f64)
    }

    /// 将统计写入 `w`.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(
            w,
            "{}: {} patients, {} without rois",
            self.name, self.patients, self.empty_patients
        )?;
        for (k, n) in self.roi_counts.iter().enumerate() {
            let class = k as u32 + 1;
            let frac = self.roi_fraction(class).unwrap_or(0.0);
            writeln!(w, "\tclass {class}: {n} rois ({:.2}%)", frac * 100.0)?;
        }
        Ok(())
    }
}

/// 全体病例及各子集的 ROI 统计.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CohortStats {
    /// 类别表中的全部病例.
    pub overall: SubsetStats,

    /// 按传入顺序排列的各子集.
    pub subsets: Vec<SubsetStats>,
}

impl CohortStats {
    /// 按名字查找子集. 重名时返回第一个.
    pub fn subset(&self, name: &str) -> Option<&SubsetStats> {
        self.subsets.iter().find(|s| s.name == name)
    }

    /// 依次写入全体和各子集的统计.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.overall.describe_into(w)?;
        for s in self.subsets.iter() {
            s.describe_into(w)?;
        }
        Ok(())
    }
}

/// 统计类别表 `table` 中全部病例, 以及 `subsets` 中每个具名子集的 ROI 数.
///
/// 子集之间可以重叠, 也不必覆盖全部病例.
///
/// # 注意
///
/// 类别表中的标签必须在 `1..=num_classes` 内, 子集中的病例必须都在类别表中有记录.
pub fn subset_stats<K: Eq + Hash>(
    table: &ClassTable<K>,
    subsets: &[(&str, &[K])],
    num_classes: u32,
) -> SampleResult<CohortStats> {
    if num_classes == 0 {
        return Err(SampleError::ZeroClasses);
    }
    if let Some(c) = table
        .values()
        .flatten()
        .copied()
        .filter(|&c| c == 0 || c > num_classes)
        .min()
    {
        return Err(SampleError::InvalidClass(c));
    }

    let mut overall = SubsetStats::new("overall", num_classes);
    table.values().for_each(|targets| overall.add(targets));

    let subsets = subsets
        .iter()
        .enumerate()
        .map(|(subset, &(name, ids))| {
            let mut stats = SubsetStats::new(name, num_classes);
            for (index, id) in ids.iter().enumerate() {
                let targets = table
                    .get(id)
                    .ok_or(SampleError::MissingSubsetTargets { subset, index })?;
                stats.add(targets);
            }
            Ok(stats)
        })
        .collect::<SampleResult<Vec<_>>>()?;
    Ok(CohortStats { overall, subsets })
}
