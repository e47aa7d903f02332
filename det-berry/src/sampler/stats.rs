use super::{Batch, ClassTable, SampleError, SampleNote, SampleResult};
use std::hash::Hash;
use std::io::{self, Write};

/// 多个批次的累计采样统计.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// 各类别累计 ROI 数, `roi_counts[c - 1]` 对应类别 `c`.
    pub roi_counts: Vec<u64>,

    /// 不含任何 ROI 的样本数.
    pub empty_samples: u64,

    /// 累计样本数.
    pub samples: u64,

    /// 累计批次数.
    pub batches: u64,

    /// 发生过候选池重新填充的批次数.
    pub recycled_batches: u64,

    /// 出现过 "类别不存在" 的批次数.
    pub unrepresented_batches: u64,
}

impl SamplerStats {
    /// 创建 `num_classes` 个类别的空统计.
    pub fn new(num_classes: u32) -> Self {
        Self {
            roi_counts: vec![0; num_classes as usize],
            ..Default::default()
        }
    }

    /// 累计一个批次. 批次中的病例必须都在 `table` 中有记录.
    pub fn record<K: Eq + Hash>(&mut self, batch: &Batch<K>, table: &ClassTable<K>) -> SampleResult<()> {
        for (i, id) in batch.ids.iter().enumerate() {
            let targets = table.get(id).ok_or(SampleError::MissingTargets(i))?;
            if targets.is_empty() {
                self.empty_samples += 1;
            }
            for &c in targets {
                let slot = c
                    .checked_sub(1)
                    .and_then(|k| self.roi_counts.get_mut(k as usize))
                    .ok_or(SampleError::LabelOutOfRange(i, c))?;
                *slot += 1;
            }
        }
        self.samples += batch.ids.len() as u64;
        self.batches += 1;
        if batch.is_recycled() {
            self.recycled_batches += 1;
        }
        if batch
            .notes
            .iter()
            .any(|n| matches!(n, SampleNote::ClassNotRepresented { .. }))
        {
            self.unrepresented_batches += 1;
        }
        Ok(())
    }

    /// 类别 `class` 的 ROI 占全部 ROI 的比例. 尚无 ROI 时返回 `None`.
    pub fn roi_fraction(&self, class: u32) -> Option<f64> {
        let total: u64 = self.roi_counts.iter().sum();
        let n = *self.roi_counts.get(class.checked_sub(1)? as usize)?;
        (total > 0).then(|| n as f64 / total as f64)
    }

    /// 不含 ROI 的样本比例. 尚无样本时返回 `None`.
    pub fn empty_fraction(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.empty_samples as f64 / self.samples as f64)
    }

    /// 合并另一份统计. 类别数不同时按较多者对齐.
    pub fn merge(&mut self, other: &Self) {
        if self.roi_counts.len() < other.roi_counts.len() {
            self.roi_counts.resize(other.roi_counts.len(), 0);
        }
        for (a, b) in self.roi_counts.iter_mut().zip(other.roi_counts.iter()) {
            *a += b;
        }
        self.empty_samples += other.empty_samples;
        self.samples += other.samples;
        self.batches += other.batches;
        self.recycled_batches += other.recycled_batches;
        self.unrepresented_batches += other.unrepresented_batches;
    }

    /// 将统计写入 `w`.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "batches: {}, samples: {}", self.batches, self.samples)?;
        for (k, n) in self.roi_counts.iter().enumerate() {
            let class = k as u32 + 1;
            let frac = self.roi_fraction(class).unwrap_or(0.0);
            writeln!(w, "\tclass {class}: {n} rois ({:.2}%)", frac * 100.0)?;
        }
        writeln!(
            w,
            "\tempty samples: {} ({:.2}%)",
            self.empty_samples,
            self.empty_fraction().unwrap_or(0.0) * 100.0
        )?;
        writeln!(
            w,
            "\trecycled batches: {}, batches with missing classes: {}",
            self.recycled_batches, self.unrepresented_batches
        )
    }
}
