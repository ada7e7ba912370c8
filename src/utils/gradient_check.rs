/*
 * @Description  : 数值梯度检验（有限差分）。
 *                 用中心差分 (f(x+h) - f(x-h)) / 2h 逐元素估计梯度，
 *                 再与各层`*_backward`给出的解析梯度比较相对误差。
 */

use crate::tensor::Tensor;

/// 对返回纯数的函数`f`，在`x`处逐元素估计数值梯度，结果形状与`x`相同。
/// 常用于损失函数，如`|x| softmax_loss(x, &y).unwrap().0`。
pub fn eval_numerical_gradient<F>(mut f: F, x: &Tensor, h: f64) -> Tensor
where
    F: FnMut(&Tensor) -> f64,
{
    let mut grad = Tensor::zeros(x.shape());
    let mut probe = x.clone();
    for i in 0..x.size() {
        let old_value = probe.get_flat(i);

        probe.set_flat(i, old_value + h);
        let f_plus = f(&probe);
        probe.set_flat(i, old_value - h);
        let f_minus = f(&probe);
        probe.set_flat(i, old_value);

        grad.set_flat(i, (f_plus - f_minus) / (2.0 * h));
    }
    grad
}

/// 对返回张量的函数`f`，给定上游梯度`df`（形状与`f`的输出相同），
/// 在`x`处逐元素估计 `sum(f(x) * df)` 对`x`的数值梯度。
pub fn eval_numerical_gradient_array<F>(mut f: F, x: &Tensor, df: &Tensor, h: f64) -> Tensor
where
    F: FnMut(&Tensor) -> Tensor,
{
    let mut grad = Tensor::zeros(x.shape());
    let mut probe = x.clone();
    for i in 0..x.size() {
        let old_value = probe.get_flat(i);

        probe.set_flat(i, old_value + h);
        let pos = f(&probe);
        probe.set_flat(i, old_value - h);
        let neg = f(&probe);
        probe.set_flat(i, old_value);

        grad.set_flat(i, (pos - neg).dot_sum(df) / (2.0 * h));
    }
    grad
}

/// 两个同形状张量之间的最大相对误差：max(|x - y| / max(1e-8, |x| + |y|))
pub fn rel_error(x: &Tensor, y: &Tensor) -> f64 {
    assert!(
        x.is_same_shape(y),
        "计算相对误差的两个张量形状必须相同，实际为{:?}和{:?}",
        x.shape(),
        y.shape()
    );
    x.to_vec()
        .into_iter()
        .zip(y.to_vec())
        .map(|(a, b)| (a - b).abs() / (a.abs() + b.abs()).max(1e-8))
        .fold(0.0, f64::max)
}
