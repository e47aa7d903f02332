use ndarray::{ArrayBase, Dimension, IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpzError, ReadableElement};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 最多同时打开的句柄数.
pub const MAX_WORKERS: usize = 64;

/// 打开 `NpzArchive` 错误.
#[derive(Debug)]
pub enum OpenArchiveError {
    /// workers 太大. 最多支持 [`MAX_WORKERS`].
    TooManyWorkers(usize),

    /// 打开 npz 文件错误.
    ReadNpzError(ReadNpzError),

    /// 其他底层 I/O 错误.
    IoError(std::io::Error),
}

impl fmt::Display for OpenArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyWorkers(n) => write!(f, "{n} workers requested, at most {MAX_WORKERS}"),
            Self::ReadNpzError(e) => write!(f, "npz: {e}"),
            Self::IoError(e) => write!(f, "i/o: {e}"),
        }
    }
}

impl std::error::Error for OpenArchiveError {}

/// Npz 文件归档.
///
/// 同一个文件被打开多次, 每个句柄由一把锁保护, 读取时轮流使用各个句柄,
/// 以便多个线程同时读取同一病例文件中的不同数组.
pub struct NpzArchive {
    entries: Vec<Mutex<NpzReader<File>>>,
    turn: AtomicUsize,
}

impl NpzArchive {
    /// 从路径 `p` 打开 `workers` 个句柄.
    pub fn new<P: AsRef<Path>>(workers: NonZeroUsize, p: P) -> Result<Self, OpenArchiveError> {
        let workers = workers.get();
        if workers > MAX_WORKERS {
            return Err(OpenArchiveError::TooManyWorkers(workers));
        }
        let entries = (0..workers)
            .map(|_| {
                let file = OpenOptions::new()
                    .read(true)
                    .open(p.as_ref())
                    .map_err(OpenArchiveError::IoError)?;
                NpzReader::new(file)
                    .map(Mutex::new)
                    .map_err(OpenArchiveError::ReadNpzError)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            entries,
            turn: AtomicUsize::new(0),
        })
    }

    /// 只打开一个句柄.
    #[inline]
    pub fn open<P: AsRef<Path>>(p: P) -> Result<Self, OpenArchiveError> {
        Self::new(NonZeroUsize::MIN, p)
    }

    /// 通过归档内文件名 `name` (例如 `"seg.npy"`) 读取数组.
    /// 元素类型 `A` 必须与文件中的 dtype 完全一致.
    pub fn array_by_name<A, D>(&self, name: &str) -> Result<ArrayBase<OwnedRepr<A>, D>, ReadNpzError>
    where
        A: ReadableElement,
        D: Dimension,
    {
        self.lock_next().by_name::<OwnedRepr<A>, D>(name)
    }

    /// 通过数组名 `{key}.npy` 读取动态维数数组.
    pub fn array_by_key<A: ReadableElement>(
        &self,
        key: &str,
    ) -> Result<ArrayBase<OwnedRepr<A>, IxDyn>, ReadNpzError> {
        self.array_by_name(&format!("{key}.npy"))
    }

    /// 通过归档内数值索引读取数组.
    pub fn array_by_index<A, D>(&self, index: usize) -> Result<ArrayBase<OwnedRepr<A>, D>, ReadNpzError>
    where
        A: ReadableElement,
        D: Dimension,
    {
        self.lock_next().by_index::<OwnedRepr<A>, D>(index)
    }

    /// 归档内的所有文件名.
    pub fn names(&self) -> Result<Vec<String>, ReadNpzError> {
        self.lock_next().names()
    }

    /// 工作通道个数.
    #[inline]
    pub fn worker_len(&self) -> usize {
        self.entries.len()
    }

    /// 归档内的数组个数.
    pub fn len(&self) -> usize {
        self.lock_next().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 锁住下一个句柄. 读取失败不会破坏句柄状态, 因此忽略锁中毒.
    fn lock_next(&self) -> MutexGuard<'_, NpzReader<File>> {
        let slot = self.turn.fetch_add(1, Ordering::Relaxed) % self.worker_len();
        self.entries[slot]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
