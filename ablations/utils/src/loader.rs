//! 对 `det-berry::dataset` 的更一层封装. 从环境变量读取实验配置, 加载病例类别表.

use det_berry::dataset::{self, OpenArchiveError};
use det_berry::sampler::ClassTable;
use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 加载病例目录错误.
#[derive(Debug)]
pub enum LoadCohortError {
    /// 无法列出目录.
    Io(io::Error),

    /// 病例文件读取错误.
    Archive(OpenArchiveError),
}

impl fmt::Display for LoadCohortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "listing cohort: {e}"),
            Self::Archive(e) => write!(f, "reading cohort: {e}"),
        }
    }
}

impl std::error::Error for LoadCohortError {}

/// 获取病例目录.
///
/// 1. 若环境变量 `$DET_BERRY_COHORT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/cohort`. 无法确定主目录时返回 `None`.
pub fn cohort_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("DET_BERRY_COHORT_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => dataset::home_dataset_dir_with(["cohort"]),
    }
}

/// 读取环境变量 `key` 并解析, 未设置或无法解析时返回 `default`.
pub fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// 实验随机种子, 来自 `$DET_BERRY_SEED`, 默认 42.
#[inline]
pub fn seed_from_env() -> u64 {
    var_or("DET_BERRY_SEED", 42)
}

/// 加载目录 `dir` 下所有病例的标识和类别表.
pub fn load_cohort<P: AsRef<Path>>(dir: P) -> Result<(Vec<String>, ClassTable<String>), LoadCohortError> {
    let ids = dataset::case_identifiers(dir.as_ref()).map_err(LoadCohortError::Io)?;
    let table = dataset::read_class_table(dir.as_ref(), &ids).map_err(LoadCohortError::Archive)?;
    Ok((ids, table))
}
