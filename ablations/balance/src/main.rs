//! 采样策略消融实验: 比较不同随机位置比例下, 批次中各类别 ROI 的占比.

mod cohort;
mod profile;
mod result;
mod runner;

fn main() {
    simple_logger::init_with_level(log::Level::Info).unwrap();
    runner::run().analyze();
}
