/*
 * @Description  : 空间批归一化：批归一化在4阶张量[N, C, H, W]上的特化。
 *                 每个通道的统计量在批次与两个空间维度上联合计算（而不是逐像素），
 *                 实现上把输入重排为[N*H*W, C]后直接复用普通批归一化的公式。
 *
 * 已知限制：这里不维护滑动统计量，前向传播总是使用当前批次的统计量，
 *          eps 固定为`SPATIAL_BN_EPS`。
 */

use super::batch_norm::{batch_statistics, batchnorm_backward_alt, check_bn_inputs, normalize};
use super::config::Mode;
use super::{BatchNormCache, check_dimension, check_shape, dims4};
use crate::errors::LayerError;
use crate::tensor::Tensor;

/// 空间批归一化内部固定使用的数值稳定常数
pub const SPATIAL_BN_EPS: f64 = 1e-9;

/// 空间批归一化的缓存：重排为[N*H*W, C]后的批归一化缓存，以及原始输入形状
#[derive(Debug, Clone)]
pub struct SpatialBatchNormCache {
    pub(crate) inner: BatchNormCache,
    input_shape: Vec<usize>,
}

/// 空间批归一化前向传播
///
/// # 形状约定
/// - `x`: `[N, C, H, W]`
/// - `gamma`、`beta`: `[C]`
/// - 输出: `[N, C, H, W]`
pub fn spatial_batchnorm_forward(
    x: &Tensor,
    gamma: &Tensor,
    beta: &Tensor,
) -> Result<(Tensor, SpatialBatchNormCache), LayerError> {
    check_dimension(x, 4, "空间批归一化的输入必须是4阶张量[N, C, H, W]")?;
    let x_rows = to_rows(x);
    let (rows, _) = check_bn_inputs(&x_rows, gamma, beta)?;
    if rows == 0 {
        return Err(LayerError::InvalidOutputSize(format!(
            "空间批归一化的输入{:?}不含任何元素，无法计算统计量",
            x.shape()
        )));
    }

    let (sample_mean, sample_var) = batch_statistics(&x_rows);
    let out_rows = normalize(&x_rows, &sample_mean, &sample_var, gamma, beta, SPATIAL_BN_EPS);
    let out = from_rows(&out_rows, x.shape());

    let cache = SpatialBatchNormCache {
        inner: BatchNormCache {
            mode: Mode::Train,
            x: x_rows,
            gamma: gamma.clone(),
            beta: beta.clone(),
            sample_mean,
            sample_var,
            eps: SPATIAL_BN_EPS,
        },
        input_shape: x.shape().to_vec(),
    };
    Ok((out, cache))
}

/// 空间批归一化反向传播，返回`(dx, dgamma, dbeta)`，形状分别为`[N, C, H, W]`、`[C]`、`[C]`
pub fn spatial_batchnorm_backward(
    dout: &Tensor,
    cache: &SpatialBatchNormCache,
) -> Result<(Tensor, Tensor, Tensor), LayerError> {
    check_shape(dout, &cache.input_shape, "空间批归一化上游梯度的形状须与输入相同")?;
    let (dx_rows, dgamma, dbeta) = batchnorm_backward_alt(&to_rows(dout), &cache.inner)?;
    Ok((from_rows(&dx_rows, &cache.input_shape), dgamma, dbeta))
}

// [N, C, H, W] -> [N*H*W, C]
fn to_rows(x: &Tensor) -> Tensor {
    let (n, c, h, w) = dims4(x);
    x.permute(&[0, 2, 3, 1]).reshape(&[n * h * w, c])
}

// [N*H*W, C] -> [N, C, H, W]
fn from_rows(rows: &Tensor, shape: &[usize]) -> Tensor {
    let (n, c, h, w) = (shape[0], shape[1], shape[2], shape[3]);
    rows.reshape(&[n, h, w, c]).permute(&[0, 3, 1, 2])
}
