use super::{FoldError, FoldResult};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// 以种子 `seed` 打乱 `ids` 后切成 `n_splits` 段, 各段长度相差不超过 1,
/// 较长的段排在前面.
///
/// 适用于已有独立测试集、只需要 train/val 轮换的场景:
/// 第 `k` 段作为验证集, 其余段拼接为训练集.
pub fn random_chunks<T: Clone>(seed: u64, n_splits: usize, ids: &[T]) -> FoldResult<Vec<Vec<T>>> {
    if n_splits == 0 {
        return Err(FoldError::ZeroSplits);
    }
    if ids.len() < n_splits {
        return Err(FoldError::TooFewIds(ids.len(), n_splits));
    }

    let mut shuffled = ids.to_vec();
    shuffled.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let base = ids.len() / n_splits;
    let longer = ids.len() % n_splits;
    let mut rest = shuffled.as_slice();
    let mut ans = Vec::with_capacity(n_splits);
    for k in 0..n_splits {
        let (head, tail) = rest.split_at(base + usize::from(k < longer));
        ans.push(head.to_vec());
        rest = tail;
    }
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::random_chunks;
    use crate::fold::FoldError;

    #[test]
    fn test_chunk_sizes() {
        let ids: Vec<usize> = (0..10).collect();
        let chunks = random_chunks(3, 4, &ids).unwrap();
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, [3, 3, 2, 2]);

        let mut all: Vec<usize> = chunks.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, ids);
    }

    #[test]
    fn test_chunks_deterministic() {
        let ids: Vec<usize> = (0..25).collect();
        assert_eq!(
            random_chunks(8, 5, &ids).unwrap(),
            random_chunks(8, 5, &ids).unwrap()
        );
    }

    #[test]
    fn test_chunk_errors() {
        assert_eq!(random_chunks(0, 0, &[1]).unwrap_err(), FoldError::ZeroSplits);
        assert_eq!(
            random_chunks(0, 3, &[1, 2]).unwrap_err(),
            FoldError::TooFewIds(2, 3)
        );
    }
}
