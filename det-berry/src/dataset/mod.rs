//! 数据集操作.
//!
//! 预处理后的数据集目录中, 每个病例一个 `{病例标识}.npz` 文件.

use crate::consts::CASE_EXTENSION;
use crate::sampler::ClassTable;
use log::debug;
use ndarray::Ix1;
use std::io;
use std::path::{Path, PathBuf};

mod npz_database;

pub use npz_database::{NpzArchive, OpenArchiveError, MAX_WORKERS};

/// 病例文件中存放 ROI 类别的数组名. 要求为一维 `u32` 数组 (`<u4`).
pub const CLASS_TARGETS_ENTRY: &str = "class_targets.npy";

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    home_dataset_dir_with::<&str, _>([])
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 列出目录 `dir` 中所有病例文件的标识 (去掉扩展名的文件名), 按字典序排列.
pub fn case_identifiers<P: AsRef<Path>>(dir: P) -> io::Result<Vec<String>> {
    let mut ans = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(CASE_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            ans.push(stem.to_string());
        }
    }
    ans.sort_unstable();
    debug!("found {} cases in {}", ans.len(), dir.as_ref().display());
    Ok(ans)
}

/// 读取目录 `dir` 中给定病例的 ROI 类别, 构成采样器使用的类别表.
pub fn read_class_table<P: AsRef<Path>>(
    dir: P,
    ids: &[String],
) -> Result<ClassTable<String>, OpenArchiveError> {
    let dir = dir.as_ref();
    ids.iter()
        .map(|id| {
            let path = dir.join(format!("{id}.{CASE_EXTENSION}"));
            let targets = NpzArchive::open(path)?
                .array_by_name::<u32, Ix1>(CLASS_TARGETS_ENTRY)
                .map_err(OpenArchiveError::ReadNpzError)?;
            Ok((id.clone(), targets.to_vec()))
        })
        .collect()
}
