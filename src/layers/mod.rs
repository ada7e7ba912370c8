//! # 网络层
//!
//! 每种层都是一对纯函数：
//! - `*_forward` 由输入与参数计算输出，并返回供反向传播使用的缓存（cache）；
//! - `*_backward` 接收上游梯度与同一次前向传播产生的缓存，返回对输入/参数的梯度。
//!
//! 所有函数都不会修改传入的输入或参数；唯一的可变状态是批归一化的[`RunningStats`]，
//! 它由调用方持有并以`&mut`传入。形状不符时返回[`LayerError`]，不做任何隐式广播。

mod affine;
mod batch_norm;
mod config;
mod conv;
mod dropout;
mod loss;
mod max_pool;
mod relu;
mod spatial_batch_norm;

#[cfg(test)]
mod tests;

pub use affine::{AffineCache, affine_backward, affine_forward};
pub use batch_norm::{BatchNormCache, batchnorm_backward, batchnorm_backward_alt, batchnorm_forward};
pub use config::{BatchNormParam, ConvParam, DropoutParam, LayerConfig, Mode, PoolParam, RunningStats};
pub use conv::{ConvCache, conv_backward_naive, conv_forward_naive};
pub use dropout::{DropoutCache, dropout_backward, dropout_forward};
pub use loss::{softmax, softmax_loss, svm_loss};
pub use max_pool::{MaxPoolCache, max_pool_backward_naive, max_pool_forward_naive};
pub use relu::{ReluCache, relu_backward, relu_forward};
pub use spatial_batch_norm::{
    SPATIAL_BN_EPS, SpatialBatchNormCache, spatial_batchnorm_backward, spatial_batchnorm_forward,
};

use crate::errors::LayerError;
use crate::tensor::Tensor;

/// 检查张量的维数
fn check_dimension(tensor: &Tensor, expected: usize, message: &str) -> Result<(), LayerError> {
    if tensor.dimension() == expected {
        Ok(())
    } else {
        Err(LayerError::DimensionMismatch {
            expected,
            got: tensor.dimension(),
            message: message.to_string(),
        })
    }
}

/// 检查张量的形状是否严格等于`expected`
fn check_shape(tensor: &Tensor, expected: &[usize], message: &str) -> Result<(), LayerError> {
    if tensor.shape() == expected {
        Ok(())
    } else {
        Err(LayerError::ShapeMismatch {
            expected: expected.to_vec(),
            got: tensor.shape().to_vec(),
            message: message.to_string(),
        })
    }
}

/// 取出4阶张量的各维大小
fn dims4(tensor: &Tensor) -> (usize, usize, usize, usize) {
    let shape = tensor.shape();
    (shape[0], shape[1], shape[2], shape[3])
}
