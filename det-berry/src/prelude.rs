//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Span;

pub use crate::consts::{BACKGROUND, DEFAULT_MIN_OVERLAP, DEFAULT_N_SPLITS};

pub use crate::data::{
    compute_patches, extract, label_components, pad_nd, BBoxConfig, ClassTargets, Connectivity,
    PadMode, PadSpec, PatchCoords, PatchGrid, RoiBatch, RoiBox, SegBatch,
};

#[cfg(feature = "rayon")]
pub use crate::data::par_extract;

pub use crate::fold::{random_chunks, Fold, FoldGenerator};

#[cfg(feature = "serde")]
pub use crate::fold::load_or_generate;

pub use crate::sampler::{
    subset_stats, target_distribution, BalancedSampler, Batch, SamplerConfig, SamplerStats,
};

pub use crate::dataset::{self, case_identifiers, home_dataset_dir_with};
