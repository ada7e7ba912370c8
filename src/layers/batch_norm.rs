/*
 * @Description  : 批归一化（Batch Normalization）。
 *
 * 训练模式：用当前批次的均值与（有偏）方差归一化，再做缩放（gamma）和平移（beta），
 *          同时以指数滑动平均更新调用方持有的滑动统计量：
 *              running_mean = momentum * running_mean + (1 - momentum) * sample_mean
 *              running_var  = momentum * running_var  + (1 - momentum) * sample_var
 * 测试模式：直接用滑动统计量归一化，不修改任何状态。
 *
 * 反向传播提供两种等价实现：
 * - `batchnorm_backward`：逐特征、逐样本地按链式法则展开，显式计入均值/方差对整个批次的依赖；
 * - `batchnorm_backward_alt`：化简后的闭式解，只用到按批次求和的两个量。
 */

use super::{RunningStats, check_dimension, check_shape};
use super::config::{BatchNormParam, LayerConfig, Mode};
use crate::errors::{ComparisonOperator, LayerError};
use crate::tensor::Tensor;

/// 批归一化的缓存
///
/// 训练模式下`sample_mean`/`sample_var`为批次统计量；
/// 测试模式下为前向传播时所用的滑动统计量（此时它们与输入无关，视为常量）。
#[derive(Debug, Clone)]
pub struct BatchNormCache {
    pub(crate) mode: Mode,
    pub(crate) x: Tensor,
    pub(crate) gamma: Tensor,
    pub(crate) beta: Tensor,
    pub(crate) sample_mean: Tensor,
    pub(crate) sample_var: Tensor,
    pub(crate) eps: f64,
}

/// 批归一化前向传播
///
/// # 形状约定
/// - `x`: `[N, D]`
/// - `gamma`、`beta`: `[D]`
/// - 输出: `[N, D]`
///
/// `running`若由`RunningStats::default()`创建，会在首次训练模式调用时按`D`全零初始化；
/// 测试模式只读取它（未初始化时按全零统计量处理）。
pub fn batchnorm_forward(
    x: &Tensor,
    gamma: &Tensor,
    beta: &Tensor,
    bn_param: &BatchNormParam,
    running: &mut RunningStats,
) -> Result<(Tensor, BatchNormCache), LayerError> {
    bn_param.validate()?;
    let (n, d) = check_bn_inputs(x, gamma, beta)?;

    let (mean, var) = match bn_param.mode {
        Mode::Train => {
            if n == 0 {
                return Err(LayerError::ValueMustSatisfyComparison {
                    value_name: "训练模式下的批大小N".to_string(),
                    operator: ComparisonOperator::GreaterOrEqual,
                    threshold: 1.0,
                    value: 0.0,
                });
            }
            running.ensure_initialized(d)?;
            let (sample_mean, sample_var) = batch_statistics(x);
            running.update(&sample_mean, &sample_var, bn_param.momentum);
            (sample_mean, sample_var)
        }
        Mode::Test => {
            running.check_len(d)?;
            running.snapshot(d)
        }
    };

    let out = normalize(x, &mean, &var, gamma, beta, bn_param.eps);
    let cache = BatchNormCache {
        mode: bn_param.mode,
        x: x.clone(),
        gamma: gamma.clone(),
        beta: beta.clone(),
        sample_mean: mean,
        sample_var: var,
        eps: bn_param.eps,
    };
    Ok((out, cache))
}

/// 批归一化反向传播（逐元素展开版），返回`(dx, dgamma, dbeta)`
///
/// 对第`d`个特征，记 σ = sqrt(var + eps)，则
/// ∂y_k/∂x_i = gamma * ((δ_ki - 1/N) * σ - (x_k - μ) * (x_i - μ) / (N * σ)) / σ²，
/// dx_i = Σ_k dout_k * ∂y_k/∂x_i。
pub fn batchnorm_backward(
    dout: &Tensor,
    cache: &BatchNormCache,
) -> Result<(Tensor, Tensor, Tensor), LayerError> {
    check_shape(dout, cache.x.shape(), "批归一化上游梯度的形状须与输入相同")?;
    if cache.mode == Mode::Test {
        return Ok(backward_with_fixed_stats(dout, cache));
    }

    let BatchNormCache {
        x,
        gamma,
        sample_mean,
        sample_var,
        eps,
        ..
    } = cache;
    let (n, d) = (x.shape()[0], x.shape()[1]);
    let inv_n = 1.0 / n as f64;
    let mut dx = Tensor::zeros(x.shape());

    for j in 0..d {
        let mu = sample_mean[[j]];
        let denom = (sample_var[[j]] + eps).sqrt();
        for i in 0..n {
            let ddenom = (x[[i, j]] - mu) / denom * inv_n;
            let mut acc = 0.0;
            for k in 0..n {
                let dnum = if k == i { 1.0 - inv_n } else { -inv_n };
                let num = x[[k, j]] - mu;
                let doutdx = gamma[[j]] * (denom * dnum - num * ddenom) / (denom * denom);
                acc += dout[[k, j]] * doutdx;
            }
            dx[[i, j]] = acc;
        }
    }

    let (dgamma, dbeta) = param_gradients(dout, cache);
    Ok((dx, dgamma, dbeta))
}

/// 批归一化反向传播（闭式解版），输入输出同`batchnorm_backward`
///
/// 记 A = Σ_k (x_k - μ) * dout_k，B = Σ_k dout_k，则
/// dx_i = gamma * ((dout_i - B/N) / σ - (x_i - μ) * A / (N * σ³))。
pub fn batchnorm_backward_alt(
    dout: &Tensor,
    cache: &BatchNormCache,
) -> Result<(Tensor, Tensor, Tensor), LayerError> {
    check_shape(dout, cache.x.shape(), "批归一化上游梯度的形状须与输入相同")?;
    if cache.mode == Mode::Test {
        return Ok(backward_with_fixed_stats(dout, cache));
    }

    let BatchNormCache {
        x,
        gamma,
        sample_mean,
        sample_var,
        eps,
        ..
    } = cache;
    let (n, d) = (x.shape()[0], x.shape()[1]);
    let inv_n = 1.0 / n as f64;
    let mut dx = Tensor::zeros(x.shape());

    for j in 0..d {
        let mu = sample_mean[[j]];
        let denom = (sample_var[[j]] + eps).sqrt();
        let denom3 = denom.powi(3);
        let (mut a, mut b) = (0.0, 0.0);
        for k in 0..n {
            a += (x[[k, j]] - mu) * dout[[k, j]];
            b += dout[[k, j]];
        }
        for i in 0..n {
            let sum1 = (dout[[i, j]] - inv_n * b) / denom;
            let sum2 = -inv_n * (x[[i, j]] - mu) * a / denom3;
            dx[[i, j]] = gamma[[j]] * (sum1 + sum2);
        }
    }

    let (dgamma, dbeta) = param_gradients(dout, cache);
    Ok((dx, dgamma, dbeta))
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓与空间批归一化共用↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/

/// 校验`x: [N, D]`、`gamma/beta: [D]`，返回`(N, D)`
pub(crate) fn check_bn_inputs(
    x: &Tensor,
    gamma: &Tensor,
    beta: &Tensor,
) -> Result<(usize, usize), LayerError> {
    check_dimension(x, 2, "批归一化的输入必须是2阶张量[N, D]")?;
    let (n, d) = (x.shape()[0], x.shape()[1]);
    check_shape(gamma, &[d], "批归一化的gamma形状须为[D]")?;
    check_shape(beta, &[d], "批归一化的beta形状须为[D]")?;
    Ok((n, d))
}

/// 按批次（第0维）计算每个特征的均值与有偏方差
pub(crate) fn batch_statistics(x: &Tensor) -> (Tensor, Tensor) {
    (x.mean_axis(0), x.var_axis(0))
}

/// gamma * (x - mean) / sqrt(var + eps) + beta
pub(crate) fn normalize(
    x: &Tensor,
    mean: &Tensor,
    var: &Tensor,
    gamma: &Tensor,
    beta: &Tensor,
    eps: f64,
) -> Tensor {
    let (n, d) = (x.shape()[0], x.shape()[1]);
    let mut out = Tensor::zeros(x.shape());
    for j in 0..d {
        let denom = (var[[j]] + eps).sqrt();
        for i in 0..n {
            out[[i, j]] = gamma[[j]] * (x[[i, j]] - mean[[j]]) / denom + beta[[j]];
        }
    }
    out
}

/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑与空间批归一化共用↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/// dgamma = Σ dout * x_norm，dbeta = Σ dout（均沿批次维求和）
fn param_gradients(dout: &Tensor, cache: &BatchNormCache) -> (Tensor, Tensor) {
    let (n, d) = (cache.x.shape()[0], cache.x.shape()[1]);
    let mut dgamma = Tensor::zeros(&[d]);
    for j in 0..d {
        let denom = (cache.sample_var[[j]] + cache.eps).sqrt();
        for i in 0..n {
            let x_norm = (cache.x[[i, j]] - cache.sample_mean[[j]]) / denom;
            dgamma[[j]] += dout[[i, j]] * x_norm;
        }
    }
    (dgamma, dout.sum_axis(0))
}

// 测试模式下统计量是常量，归一化退化为逐元素的仿射变换
fn backward_with_fixed_stats(dout: &Tensor, cache: &BatchNormCache) -> (Tensor, Tensor, Tensor) {
    let (n, d) = (cache.x.shape()[0], cache.x.shape()[1]);
    let mut dx = Tensor::zeros(cache.x.shape());
    for j in 0..d {
        let scale = cache.gamma[[j]] / (cache.sample_var[[j]] + cache.eps).sqrt();
        for i in 0..n {
            dx[[i, j]] = dout[[i, j]] * scale;
        }
    }
    let (dgamma, dbeta) = param_gradients(dout, cache);
    (dx, dgamma, dbeta)
}
