/*
 * @Description  : 仿射（全连接）层。
 *                 输入形状为`[N, d_1, ..., d_k]`，每个样本先展平为长度`D = d_1 * ... * d_k`的向量，
 *                 再变换为长度为`M`的输出：out = x_flat · w + b。
 */

use super::{check_dimension, check_shape};
use crate::errors::LayerError;
use crate::tensor::Tensor;

/// 仿射层的缓存：(x, w, b)
#[derive(Debug, Clone)]
pub struct AffineCache {
    pub(crate) x: Tensor,
    pub(crate) w: Tensor,
    pub(crate) b: Tensor,
}

/// 仿射层前向传播
///
/// # 形状约定
/// - `x`: `[N, d_1, ..., d_k]`
/// - `w`: `[D, M]`
/// - `b`: `[M]`
/// - 输出: `[N, M]`
pub fn affine_forward(
    x: &Tensor,
    w: &Tensor,
    b: &Tensor,
) -> Result<(Tensor, AffineCache), LayerError> {
    if x.dimension() == 0 {
        return Err(LayerError::DimensionMismatch {
            expected: 1,
            got: 0,
            message: "仿射层的输入至少需要包含批（N）维度".to_string(),
        });
    }
    let x_flat = x.flatten_batch();
    let (n, d) = (x_flat.shape()[0], x_flat.shape()[1]);

    check_dimension(w, 2, "仿射层的权重必须是2阶张量[D, M]")?;
    let m = w.shape()[1];
    check_shape(w, &[d, m], "仿射层的权重行数须等于输入展平后的特征数D")?;
    check_shape(b, &[m], "仿射层的偏置形状须为[M]")?;

    let mut out = x_flat.mat_mul(w);
    for i in 0..n {
        for j in 0..m {
            out[[i, j]] += b[[j]];
        }
    }

    let cache = AffineCache {
        x: x.clone(),
        w: w.clone(),
        b: b.clone(),
    };
    Ok((out, cache))
}

/// 仿射层反向传播，返回`(dx, dw, db)`，形状分别与`x`、`w`、`b`相同
///
/// - dx = dout · wᵀ（再还原为`x`的原始形状）
/// - dw = x_flatᵀ · dout
/// - db = dout 按列求和
pub fn affine_backward(
    dout: &Tensor,
    cache: &AffineCache,
) -> Result<(Tensor, Tensor, Tensor), LayerError> {
    let AffineCache { x, w, b } = cache;
    let n = x.shape()[0];
    check_shape(dout, &[n, b.size()], "仿射层上游梯度的形状须为[N, M]")?;

    let dx = dout.mat_mul(&w.transpose()).reshape(x.shape());
    let dw = x.flatten_batch().transpose().mat_mul(dout);
    let db = dout.sum_axis(0);
    Ok((dx, dw, db))
}
