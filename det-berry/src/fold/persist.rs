//! 划分结果的持久化. 相同的划分文件可以在多次实验之间复用.

use super::{Fold, FoldError, FoldGenerator};
use log::{debug, info};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

/// 读写划分文件时的错误.
#[derive(Debug)]
pub enum PersistError {
    /// 文件读写错误.
    Io(io::Error),

    /// 编解码错误.
    Codec(bincode::Error),

    /// 需要重新生成划分, 但配置无效.
    Fold(FoldError),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "fold file i/o: {e}"),
            Self::Codec(e) => write!(f, "fold file codec: {e}"),
            Self::Fold(e) => write!(f, "fold generation: {e}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Codec(e) => Some(e),
            Self::Fold(e) => Some(e),
        }
    }
}

/// 将划分写入 `path`, 已存在的文件会被覆盖.
pub fn save_folds<T: Serialize, P: AsRef<Path>>(
    path: P,
    folds: &[Fold<T>],
) -> Result<(), PersistError> {
    let file = File::create(path.as_ref()).map_err(PersistError::Io)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, folds).map_err(PersistError::Codec)?;
    writer.flush().map_err(PersistError::Io)
}

/// 从 `path` 读取由 [`save_folds`] 写入的划分.
pub fn load_folds<T: DeserializeOwned, P: AsRef<Path>>(
    path: P,
) -> Result<Vec<Fold<T>>, PersistError> {
    let file = File::open(path.as_ref()).map_err(PersistError::Io)?;
    bincode::deserialize_from(BufReader::new(file)).map_err(PersistError::Codec)
}

/// 若 `path` 已存在则直接读取其中的划分, 否则用 `generator` 生成并写入 `path`.
///
/// # 注意
///
/// 读取已有文件时不会检查其内容是否与 `generator` 或 `ids` 一致.
pub fn load_or_generate<T, P>(
    path: P,
    generator: &FoldGenerator,
    ids: &[T],
) -> Result<Vec<Fold<T>>, PersistError>
where
    T: Clone + Serialize + DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_file() {
        debug!("loading stored folds from {}", path.display());
        return load_folds(path);
    }

    let folds = generator.generate(ids).map_err(PersistError::Fold)?;
    save_folds(path, &folds)?;
    info!(
        "generated {} folds over {} ids, stored at {}",
        folds.len(),
        ids.len(),
        path.display()
    );
    Ok(folds)
}
