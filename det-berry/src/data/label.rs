//! N 维连通域标记.

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use num::Zero;
use std::collections::VecDeque;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 连通性.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Connectivity {
    /// 仅共面相邻 (2D 四邻域, 3D 六邻域).
    #[default]
    Face,

    /// 共面, 共边, 共点均视为相邻 (2D 八邻域, 3D 二十六邻域).
    Full,
}

impl Connectivity {
    /// 所有邻居的坐标偏移.
    fn offsets(self, ndim: usize) -> Vec<Vec<isize>> {
        match self {
            Self::Face => (0..ndim)
                .flat_map(|axis| {
                    [-1, 1].into_iter().map(move |d| {
                        let mut off = vec![0; ndim];
                        off[axis] = d;
                        off
                    })
                })
                .collect(),
            Self::Full => {
                let mut ans = vec![vec![]];
                for _ in 0..ndim {
                    ans = ans
                        .into_iter()
                        .flat_map(|prefix: Vec<isize>| {
                            [-1, 0, 1].into_iter().map(move |d| {
                                let mut off = prefix.clone();
                                off.push(d);
                                off
                            })
                        })
                        .collect();
                }
                ans.retain(|off| off.iter().any(|&d| d != 0));
                ans
            }
        }
    }
}

/// 标记 `mask` 中所有非零元素构成的连通域.
///
/// 返回与 `mask` 同形状的标签数组和连通域个数. 背景为 0, 连通域按其首个元素
/// 在行优先顺序下出现的先后编号为 `1..=n`.
pub fn label_components<A>(mask: ArrayViewD<'_, A>, connectivity: Connectivity) -> (ArrayD<u32>, usize)
where
    A: Zero,
{
    let shape = mask.shape().to_vec();
    let ndim = shape.len();
    let fg: Vec<bool> = mask.iter().map(|v| !v.is_zero()).collect();

    let mut strides = vec![1usize; ndim];
    for axis in (0..ndim.saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    let offsets = connectivity.offsets(ndim);

    let mut labels = vec![0u32; fg.len()];
    let mut n = 0u32;
    let mut bfs_q = VecDeque::with_capacity(16);
    let mut coord = vec![0usize; ndim];

    for start in 0..fg.len() {
        if !fg[start] || labels[start] != 0 {
            continue;
        }
        n += 1;
        labels[start] = n;
        bfs_q.push_back(start);

        while let Some(cur) = bfs_q.pop_front() {
            let mut rest = cur;
            for (c, &s) in coord.iter_mut().zip(strides.iter()) {
                *c = rest / s;
                rest %= s;
            }

            'neighbour: for off in offsets.iter() {
                let mut next = 0;
                for axis in 0..ndim {
                    let c = coord[axis] as isize + off[axis];
                    if c < 0 || c >= shape[axis] as isize {
                        continue 'neighbour;
                    }
                    next += c as usize * strides[axis];
                }
                if fg[next] && labels[next] == 0 {
                    labels[next] = n;
                    bfs_q.push_back(next);
                }
            }
        }
    }

    // 标签按行优先顺序生成, 长度与形状一致, 不会失败.
    let labels = ArrayD::from_shape_vec(IxDyn(&shape), labels).unwrap();
    (labels, n as usize)
}
