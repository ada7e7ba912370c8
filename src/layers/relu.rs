use super::check_shape;
use crate::errors::LayerError;
use crate::tensor::Tensor;

/// ReLU层的缓存：前向传播的输入`x`
#[derive(Debug, Clone)]
pub struct ReluCache {
    pub(crate) x: Tensor,
}

/// ReLU前向传播：逐元素计算`max(0, x)`，输入可以是任意形状
pub fn relu_forward(x: &Tensor) -> (Tensor, ReluCache) {
    let out = x.where_with_f64(|v| v > 0.0, |v| v, |_| 0.0);
    (out, ReluCache { x: x.clone() })
}

/// ReLU反向传播：`x > 0`处透传上游梯度，其余（含`x == 0`这一次梯度点）为0
pub fn relu_backward(dout: &Tensor, cache: &ReluCache) -> Result<Tensor, LayerError> {
    let x = &cache.x;
    check_shape(dout, x.shape(), "ReLU上游梯度的形状须与输入相同")?;
    Ok(x.where_with_tensor(dout, |v, _| v > 0.0, |_, g| g, |_, _| 0.0))
}
