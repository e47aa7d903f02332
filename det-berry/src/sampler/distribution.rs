use super::{ClassTable, SampleError, SampleResult};
use crate::consts::is_foreground;
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;
use std::hash::Hash;

/// 计算一个病例级别的抽样分布, 使按该分布抽样时各前景类别出现的病例数大致相等.
///
/// 每个类别的权重与包含该类别的病例数成反比; 病例的权重取其所含类别权重的最大值.
/// 不含前景 ROI 的病例权重为 0. 返回值与 `ids` 一一对应, 和为 1.
pub fn target_distribution<K: Eq + Hash>(ids: &[K], table: &ClassTable<K>) -> SampleResult<Vec<f64>> {
    let per_patient = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let mut classes: Vec<u32> = table
                .get(id)
                .ok_or(SampleError::MissingTargets(i))?
                .iter()
                .copied()
                .filter(|&c| is_foreground(c))
                .collect();
            classes.sort_unstable();
            classes.dedup();
            Ok(classes)
        })
        .collect::<SampleResult<Vec<_>>>()?;

    let mut patients_per_class: BTreeMap<u32, usize> = BTreeMap::new();
    for &c in per_patient.iter().flatten() {
        *patients_per_class.entry(c).or_default() += 1;
    }
    if patients_per_class.is_empty() {
        return Err(SampleError::NoForeground);
    }

    let total: usize = patients_per_class.values().sum();
    let raw: BTreeMap<u32, f64> = patients_per_class
        .iter()
        .map(|(&c, &n)| (c, total as f64 / n as f64))
        .collect();
    let norm: f64 = raw.values().sum();

    let weights: Vec<f64> = per_patient
        .iter()
        .map(|classes| {
            classes
                .iter()
                .map(|c| OrderedFloat(raw[c] / norm))
                .max()
                .map_or(0.0, |w| w.0)
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / sum).collect())
}

#[cfg(test)]
mod tests {
    use super::target_distribution;
    use crate::sampler::{ClassTable, SampleError};

    #[test]
    fn test_inverse_frequency_weights() {
        let table: ClassTable<u32> = [
            (1, vec![1]),
            (2, vec![1, 1]),
            (3, vec![2]),
            (4, vec![]),
        ]
        .into_iter()
        .collect();
        let p = target_distribution(&[1, 2, 3, 4], &table).unwrap();
        let expected = [0.25, 0.25, 0.5, 0.0];
        for (a, b) in p.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12, "{p:?}");
        }
    }

    #[test]
    fn test_mixed_patient_takes_rarest_weight() {
        let table: ClassTable<&str> = [("a", vec![1, 2]), ("b", vec![1]), ("c", vec![1])]
            .into_iter()
            .collect();
        let p = target_distribution(&["a", "b", "c"], &table).unwrap();
        assert!(p[0] > p[1]);
        assert!((p[1] - p[2]).abs() < 1e-12);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_foreground() {
        let table: ClassTable<u8> = [(0, vec![]), (1, vec![0])].into_iter().collect();
        assert_eq!(
            target_distribution(&[0, 1], &table),
            Err(SampleError::NoForeground)
        );
        assert_eq!(
            target_distribution(&[0, 9], &table),
            Err(SampleError::MissingTargets(1))
        );
    }
}
