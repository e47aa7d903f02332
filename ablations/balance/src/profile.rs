//! 采样运行统计.

use det_berry::sampler::SamplerStats;
use std::time::{Duration, Instant};

/// ablation 计时器, 支持多段计时累加.
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时.
    #[inline]
    fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    #[inline]
    fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    #[inline]
    fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    #[inline]
    fn total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

/// 单个采样策略的运行统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 批次内容统计.
    stats: SamplerStats,

    /// 采样本身花费的时间.
    sample_time: AccTimer,

    /// 整个任务花费的总时间, 包括准备采样器.
    real_time: AccTimer,

    /// 最耗时的一次采样. 尚未采样时为 `None`.
    most: Option<Duration>,
}

impl Profile {
    pub fn new(num_classes: u32) -> Self {
        Self {
            stats: SamplerStats::new(num_classes),
            sample_time: AccTimer::new(),
            real_time: AccTimer::new(),
            most: None,
        }
    }

    /// 开始一次采样计时.
    #[inline]
    pub fn batch_start(&mut self) {
        self.sample_time.start();
    }

    /// 结束一次采样计时.
    #[inline]
    pub fn batch_elapsed(&mut self) {
        let d = self.sample_time.elapsed();
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
    }

    #[inline]
    pub fn stats_mut(&mut self) -> &mut SamplerStats {
        &mut self.stats
    }

    #[inline]
    pub fn stats(&self) -> &SamplerStats {
        &self.stats
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    #[inline]
    pub fn sample_time_us(&self) -> u64 {
        self.sample_time.total_us()
    }

    #[inline]
    pub fn real_time_us(&self) -> u64 {
        self.real_time.total_us()
    }

    /// 每个批次的平均采样时间 (微秒).
    pub fn avg_batch_time_us(&self) -> Option<f64> {
        match self.stats.batches {
            0 => None,
            n => Some(self.sample_time_us() as f64 / n as f64),
        }
    }

    #[inline]
    pub fn most_time_consuming(&self) -> Option<Duration> {
        self.most
    }
}
