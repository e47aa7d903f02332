//! 程序运行函数.

use crate::cohort::Cohort;
use crate::profile::Profile;
use crate::result::AblationResult;
use det_berry::consts::DEFAULT_N_SPLITS;
use det_berry::fold::{self, FoldGenerator};
use det_berry::sampler::{
    subset_stats, target_distribution, BalancedSampler, Batch, SamplerConfig,
};
use log::{info, warn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::io;
use std::iter;
use std::thread;
use utils::loader;

/// 批大小.
const BATCH_SIZE: usize = 8;

/// 参与比较的随机位置比例. 1.0 时每个位置都接受第一个包含最稀有类别的病例.
const RANDOM_RATIOS: [f64; 4] = [0.0, 0.3, 0.6, 1.0];

/// 优先加载磁盘上的病例目录, 否则生成合成病例.
fn load_cohort(seed: u64) -> Cohort {
    if let Some(dir) = loader::cohort_dir_from_env_or_home().filter(|d| d.is_dir()) {
        match loader::load_cohort(&dir) {
            Ok((ids, table)) if !ids.is_empty() => {
                info!("loaded {} cases from {}", ids.len(), dir.display());
                return Cohort::from_table(ids, table);
            }
            Ok(_) => warn!("no cases found in {}", dir.display()),
            Err(e) => warn!("cannot load cohort from {}: {e}", dir.display()),
        }
    }
    let len = loader::var_or("DET_BERRY_COHORT_LEN", 400usize);
    info!("using a synthetic cohort of {len} cases");
    Cohort::synthetic(seed, len)
}

/// 用 [`BalancedSampler`] 采样 `batches` 个批次.
fn balanced(cohort: &Cohort, train: &[String], ratio: f64, seed: u64, batches: usize) -> Profile {
    let mut profile = Profile::new(cohort.num_classes);
    let config = SamplerConfig::new(BATCH_SIZE, cohort.num_classes, ratio);
    let mut sampler = BalancedSampler::seeded(config, seed).expect("Sampler config error");

    for _ in 0..batches {
        profile.batch_start();
        let batch = sampler
            .sample_batch(train, &cohort.table)
            .expect("Sampling error");
        profile.batch_elapsed();
        profile
            .stats_mut()
            .record(&batch, &cohort.table)
            .expect("Recording error");
    }
    profile.finish()
}

/// 按病例级逆频率分布有放回地采样 `batches` 个批次.
fn weighted(cohort: &Cohort, train: &[String], seed: u64, batches: usize) -> Profile {
    let mut profile = Profile::new(cohort.num_classes);
    let weights = target_distribution(train, &cohort.table).expect("Distribution error");
    let dist = WeightedIndex::new(&weights).expect("Invalid weights");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    for _ in 0..batches {
        profile.batch_start();
        let ids: Vec<String> = (0..BATCH_SIZE)
            .map(|_| train[dist.sample(&mut rng)].clone())
            .collect();
        profile.batch_elapsed();

        let mut class_counts = vec![0; cohort.num_classes as usize];
        for &c in ids.iter().flat_map(|id| cohort.table[id].iter()) {
            class_counts[c as usize - 1] += 1;
        }
        let batch = Batch {
            ids,
            class_counts,
            notes: Vec::new(),
        };
        profile
            .stats_mut()
            .record(&batch, &cohort.table)
            .expect("Recording error");
    }
    profile.finish()
}

/// 实际运行.
pub fn run() -> AblationResult {
    let seed = loader::seed_from_env();
    let batches = loader::var_or("DET_BERRY_BATCHES", 500usize);
    let cohort = load_cohort(seed);

    let generator = FoldGenerator::new(seed, DEFAULT_N_SPLITS);
    let fold_file = std::env::temp_dir().join(format!(
        "balance-folds-{seed}-{}-{}.bin",
        cohort.ids.len(),
        DEFAULT_N_SPLITS
    ));
    let folds =
        fold::load_or_generate(&fold_file, &generator, &cohort.ids).expect("Generating folds error");
    let train = folds[0].train.as_slice();
    let cohort = &cohort;

    utils::sep();
    subset_stats(&cohort.table, &folds[0].named_subsets(), cohort.num_classes)
        .expect("Fold statistics error")
        .describe_into(&mut io::stdout().lock())
        .expect("Writing fold statistics error");
    utils::sep();
    println!(
        "Running sampling ablations on {} training cases ({} cpus)...",
        train.len(),
        utils::cpus()
    );
    thread::scope(|s| {
        let handles: Vec<_> = RANDOM_RATIOS
            .iter()
            .map(|&r| {
                let th = s.spawn(move || balanced(cohort, train, r, seed, batches));
                (format!("ratio={r:.1}"), th)
            })
            .chain(iter::once((
                "weighted".to_string(),
                s.spawn(move || weighted(cohort, train, seed, batches)),
            )))
            .collect();

        AblationResult::from_iter(
            handles
                .into_iter()
                .map(|(name, th)| (name, th.join().expect("Thread joining error"))),
        )
    })
}
