//! 核心库. 为 2D/3D 医学图像目标检测的训练流程提供数据准备工具:
//! 交叉验证划分, 类别均衡采样, patch 网格切分, 数组填充, 以及由分割掩码生成检测框.
//!
//! 所有组件都是同步的纯函数或仅持有自身状态的小对象, 不负责读取图像或增强.
//!
//! # 注意
//!
//! 1. 空间维度约定为 2 或 3. 数组轴顺序为 `(batch, channel, y, x[, z])`,
//!   检测框坐标按 `[y1, x1, y2, x2(, z1, z2)]` 给出.
//! 2. 标签 0 永远表示背景, 前景类别从 1 开始编号.
//! 3. 配置错误一律返回 `Err`, 不会 panic. 数据中可恢复的异常 (例如采样池耗尽)
//!   通过 `log` 记录并在返回值中标注.
//!
//! # 开发计划
//!
//! ### 交叉验证划分 ✅
//!
//! 带内层测试集的 `n` 折轮转划分, 以及只做 train/val 的随机分段.
//! 划分结果可以序列化到磁盘, 重复实验时直接读取.
//!
//! 实现位于 `det-berry/src/fold`.
//!
//! ### 类别均衡采样 ✅
//!
//! 1. 贪心的批内最稀有类别补偿. ✅
//! 2. 病例级逆频率抽样分布. ✅
//! 3. 批次统计 (各类 ROI 数, 空样本比例). ✅
//! 4. 全体及各划分子集的 ROI 统计, 用于检查划分后的类别分布. ✅
//!
//! 采样策略的消融实验位于 `ablations/balance`.
//!
//! 实现位于 `det-berry/src/sampler`.
//!
//! ### patch 网格 ✅
//!
//! 大尺寸图像按最小重叠切分, 支持 3D 逐层模式.
//!
//! 实现位于 `det-berry/src/data/patch.rs`.
//!
//! ### N 维填充 ✅
//!
//! 常数/边缘/镜像三种模式, 支持整除约束, 可截回原数组.
//!
//! 实现位于 `det-berry/src/data/pad.rs`.
//!
//! ### 检测框提取 ✅
//!
//! 实例掩码和类别图两种输入, 类别图模式下做 N 维连通域标记.
//! 开启 `rayon` feature 时提供逐样本并行版本.
//!
//! 实现位于 `det-berry/src/data/bbox.rs` 和 `det-berry/src/data/label.rs`.
//!
//! ### 数据集工具 ✅
//!
//! 预处理目录中病例标识的枚举, 多句柄 npz 读取.
//!
//! 实现位于 `det-berry/src/dataset`.

/// 半开区间 `[lo, hi)`, 用于 patch 边界和填充位置.
pub type Span = (usize, usize);

pub mod consts;
pub mod data;
pub mod dataset;
pub mod fold;
pub mod prelude;
pub mod sampler;
