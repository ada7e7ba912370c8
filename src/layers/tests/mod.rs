mod relu;

use crate::tensor::Tensor;

/// 梯度检验统一使用的有限差分步长
const H: f64 = 1e-5;

/// 可复现的测试数据：元素均匀分布在`[low, high]`内，同一`seed`总是得到同一张量。
/// 连续分布下元素落在ReLU折点或最大池化并列值的步长`H`邻域内的概率可以忽略。
fn sample_tensor(shape: &[usize], seed: u64, low: f64, high: f64) -> Tensor {
    Tensor::new_random_seeded(low, high, shape, seed)
}
