/*
 * @Description  : 朴素最大池化层
 *
 * 设计决策：
 * - 前向传播时记录每个窗口最大值在输入中的位置，反向传播只把梯度路由到该位置（稀疏梯度）
 * - 多个位置并列最大时，取窗口内按行优先扫描到的第一个
 * - 窗口重叠（stride < 池化窗口）时梯度累加
 * - 无填充；输入必须是 4D [N, C, H, W]，输出为 [N, C, H', W']，
 *   H' = 1 + (H - pool_height) / stride，W' = 1 + (W - pool_width) / stride
 */

use log::trace;

use super::config::{LayerConfig, PoolParam};
use super::{check_dimension, check_shape, dims4};
use crate::errors::LayerError;
use crate::tensor::Tensor;

/// 最大池化的缓存
#[derive(Debug, Clone)]
pub struct MaxPoolCache {
    pub(crate) x: Tensor,
    pub(crate) pool_param: PoolParam,
    /// 每个输出元素对应的最大值在其输入平面中的位置(h, w)，按[N, C, H', W']行优先排列
    max_positions: Vec<(usize, usize)>,
}

/// 朴素最大池化前向传播，每个通道独立地取窗口内最大值
pub fn max_pool_forward_naive(
    x: &Tensor,
    pool_param: &PoolParam,
) -> Result<(Tensor, MaxPoolCache), LayerError> {
    pool_param.validate()?;
    check_dimension(x, 4, "最大池化的输入必须是4阶张量[N, C, H, W]")?;
    let (n, c, h, w) = dims4(x);
    let (out_h, out_w) = output_size(h, w, pool_param)?;
    let PoolParam {
        pool_height,
        pool_width,
        stride,
    } = *pool_param;
    trace!("最大池化前向传播：输入{:?}，输出[{n}, {c}, {out_h}, {out_w}]", x.shape());

    let mut out = Tensor::zeros(&[n, c, out_h, out_w]);
    let mut max_positions = Vec::with_capacity(n * c * out_h * out_w);
    for ni in 0..n {
        for ci in 0..c {
            for oh in 0..out_h {
                for ow in 0..out_w {
                    let (h_start, w_start) = (oh * stride, ow * stride);
                    let mut max_pos = (h_start, w_start);
                    let mut max_val = x[[ni, ci, h_start, w_start]];
                    for ph in 0..pool_height {
                        for pw in 0..pool_width {
                            let val = x[[ni, ci, h_start + ph, w_start + pw]];
                            // 严格大于：并列时保留先扫描到的位置
                            if val > max_val {
                                max_val = val;
                                max_pos = (h_start + ph, w_start + pw);
                            }
                        }
                    }
                    out[[ni, ci, oh, ow]] = max_val;
                    max_positions.push(max_pos);
                }
            }
        }
    }

    let cache = MaxPoolCache {
        x: x.clone(),
        pool_param: *pool_param,
        max_positions,
    };
    Ok((out, cache))
}

/// 朴素最大池化反向传播，返回与`x`同形状的`dx`
pub fn max_pool_backward_naive(dout: &Tensor, cache: &MaxPoolCache) -> Result<Tensor, LayerError> {
    let (n, c, h, w) = dims4(&cache.x);
    let (out_h, out_w) = output_size(h, w, &cache.pool_param)?;
    check_shape(dout, &[n, c, out_h, out_w], "最大池化上游梯度的形状须为[N, C, H', W']")?;

    let mut dx = Tensor::zeros(cache.x.shape());
    let mut positions = cache.max_positions.iter();
    for ni in 0..n {
        for ci in 0..c {
            for oh in 0..out_h {
                for ow in 0..out_w {
                    if let Some(&(mh, mw)) = positions.next() {
                        dx[[ni, ci, mh, mw]] += dout[[ni, ci, oh, ow]];
                    }
                }
            }
        }
    }
    Ok(dx)
}

fn output_size(h: usize, w: usize, pool_param: &PoolParam) -> Result<(usize, usize), LayerError> {
    let PoolParam {
        pool_height,
        pool_width,
        stride,
    } = *pool_param;
    if pool_height > h || pool_width > w {
        return Err(LayerError::InvalidOutputSize(format!(
            "池化窗口 {pool_height}x{pool_width} 超出输入尺寸 {h}x{w}"
        )));
    }
    Ok((1 + (h - pool_height) / stride, 1 + (w - pool_width) / stride))
}
