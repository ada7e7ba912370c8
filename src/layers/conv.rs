/*
 * @Description  : 朴素（滑动窗口）卷积层
 *
 * 设计决策：
 * - 直接按嵌套循环做互相关，不转成矩阵乘法（im2col）
 * - 单个卷积核跨越全部输入通道
 * - Batch-First 格式：输入必须是 4D [N, C, H, W]
 * - 输出格式：[N, F, H', W']，其中
 *     H' = 1 + (H + 2 * pad - HH) / stride
 *     W' = 1 + (W + 2 * pad - WW) / stride
 *   （整数除法向下取整）
 * - 反向传播时落在零填充区域的位置不会向 dx 传递梯度
 */

use log::trace;

use super::config::{ConvParam, LayerConfig};
use super::{check_dimension, check_shape, dims4};
use crate::errors::LayerError;
use crate::tensor::Tensor;

/// 卷积层的缓存：(x, w, b, conv_param)
#[derive(Debug, Clone)]
pub struct ConvCache {
    pub(crate) x: Tensor,
    pub(crate) w: Tensor,
    pub(crate) b: Tensor,
    pub(crate) conv_param: ConvParam,
}

/// 朴素卷积前向传播
///
/// # 形状约定
/// - `x`: `[N, C, H, W]`
/// - `w`: `[F, C, HH, WW]`
/// - `b`: `[F]`
/// - 输出: `[N, F, H', W']`
pub fn conv_forward_naive(
    x: &Tensor,
    w: &Tensor,
    b: &Tensor,
    conv_param: &ConvParam,
) -> Result<(Tensor, ConvCache), LayerError> {
    conv_param.validate()?;
    check_dimension(x, 4, "卷积层的输入必须是4阶张量[N, C, H, W]")?;
    check_dimension(w, 4, "卷积核必须是4阶张量[F, C, HH, WW]")?;

    let (n, c, h, wd) = dims4(x);
    let (f, _, hh, ww) = dims4(w);
    check_shape(w, &[f, c, hh, ww], "卷积核的输入通道数须与输入一致")?;
    check_shape(b, &[f], "卷积层的偏置形状须为[F]")?;

    let ConvParam { stride, pad } = *conv_param;
    let (out_h, out_w) = output_size(h, wd, hh, ww, conv_param)?;
    trace!("卷积前向传播：输入{:?}，卷积核{:?}，输出[{n}, {f}, {out_h}, {out_w}]", x.shape(), w.shape());

    let padded = pad_input(x, pad);
    let mut out = Tensor::zeros(&[n, f, out_h, out_w]);
    for ni in 0..n {
        for fi in 0..f {
            for oh in 0..out_h {
                for ow in 0..out_w {
                    let h_start = oh * stride;
                    let w_start = ow * stride;
                    let mut sum = b[[fi]];
                    for ci in 0..c {
                        for kh in 0..hh {
                            for kw in 0..ww {
                                sum += padded[[ni, ci, h_start + kh, w_start + kw]]
                                    * w[[fi, ci, kh, kw]];
                            }
                        }
                    }
                    out[[ni, fi, oh, ow]] = sum;
                }
            }
        }
    }

    let cache = ConvCache {
        x: x.clone(),
        w: w.clone(),
        b: b.clone(),
        conv_param: *conv_param,
    };
    Ok((out, cache))
}

/// 朴素卷积反向传播，返回`(dx, dw, db)`，形状分别与`x`、`w`、`b`相同
///
/// 对每个样本、卷积核、输出位置及核内位置，若对应的（未填充）输入坐标在界内：
/// - dx += w * dout
/// - dw += x * dout
///
/// db 为每个卷积核在所有样本、所有输出位置上的上游梯度之和。
pub fn conv_backward_naive(
    dout: &Tensor,
    cache: &ConvCache,
) -> Result<(Tensor, Tensor, Tensor), LayerError> {
    let ConvCache {
        x,
        w,
        b,
        conv_param,
    } = cache;
    let (n, c, h, wd) = dims4(x);
    let (f, _, hh, ww) = dims4(w);
    let (out_h, out_w) = output_size(h, wd, hh, ww, conv_param)?;
    check_shape(dout, &[n, f, out_h, out_w], "卷积层上游梯度的形状须为[N, F, H', W']")?;

    let (stride, pad) = (conv_param.stride as isize, conv_param.pad as isize);
    let mut dx = Tensor::zeros(x.shape());
    let mut dw = Tensor::zeros(w.shape());
    let mut db = Tensor::zeros(b.shape());

    for ni in 0..n {
        for fi in 0..f {
            for oh in 0..out_h {
                for ow in 0..out_w {
                    let grad_val = dout[[ni, fi, oh, ow]];
                    db[[fi]] += grad_val;
                    for kh in 0..hh {
                        for kw in 0..ww {
                            let orig_h = oh as isize * stride + kh as isize - pad;
                            let orig_w = ow as isize * stride + kw as isize - pad;
                            if orig_h < 0
                                || orig_h >= h as isize
                                || orig_w < 0
                                || orig_w >= wd as isize
                            {
                                continue;
                            }
                            let (ih, iw) = (orig_h as usize, orig_w as usize);
                            for ci in 0..c {
                                dx[[ni, ci, ih, iw]] += w[[fi, ci, kh, kw]] * grad_val;
                                dw[[fi, ci, kh, kw]] += x[[ni, ci, ih, iw]] * grad_val;
                            }
                        }
                    }
                }
            }
        }
    }

    Ok((dx, dw, db))
}

/// 计算输出的空间尺寸(H', W')；卷积核比填充后的输入还大时报错
fn output_size(
    h: usize,
    w: usize,
    hh: usize,
    ww: usize,
    conv_param: &ConvParam,
) -> Result<(usize, usize), LayerError> {
    let ConvParam { stride, pad } = *conv_param;
    let (padded_h, padded_w) = (h + 2 * pad, w + 2 * pad);
    if hh == 0 || ww == 0 || hh > padded_h || ww > padded_w {
        return Err(LayerError::InvalidOutputSize(format!(
            "输入 {h}x{w}（填充 {pad}），卷积核 {hh}x{ww}，步长 {stride}"
        )));
    }
    Ok((1 + (padded_h - hh) / stride, 1 + (padded_w - ww) / stride))
}

/// 对输入的两个空间维度在四周各补`pad`个零
fn pad_input(x: &Tensor, pad: usize) -> Tensor {
    if pad == 0 {
        return x.clone();
    }
    let (n, c, h, w) = dims4(x);
    let mut padded = Tensor::zeros(&[n, c, h + 2 * pad, w + 2 * pad]);
    for ni in 0..n {
        for ci in 0..c {
            for hi in 0..h {
                for wi in 0..w {
                    padded[[ni, ci, hi + pad, wi + pad]] = x[[ni, ci, hi, wi]];
                }
            }
        }
    }
    padded
}
