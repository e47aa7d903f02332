//! 数组层面的数据准备: patch 网格, 填充, 连通域标记, 检测框提取.

pub mod bbox;
pub mod label;
pub mod pad;
pub mod patch;

pub use bbox::{
    extract, extract_sample, BBoxConfig, BBoxError, BBoxResult, ClassTargets, RoiBatch, RoiBox,
    SampleRois, SegBatch,
};
pub use label::{label_components, Connectivity};
pub use pad::{pad_nd, pad_widths, Divisor, PadError, PadMode, PadResult, PadSpec, Padded};
pub use patch::{axis_bounds, compute_patches, PatchCoords, PatchError, PatchGrid, PatchResult};

#[cfg(feature = "rayon")]
pub use bbox::par_extract;
