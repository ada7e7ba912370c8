/*
 * @Description  : 反向（inverted）dropout。
 *                 训练时以概率`p`丢弃每个元素，并把保留下来的元素放大`1 / (1 - p)`倍，
 *                 使输出的期望与输入一致；因此测试时无需任何缩放，直接恒等输出。
 */

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::check_shape;
use super::config::{DropoutParam, LayerConfig, Mode};
use crate::errors::LayerError;
use crate::tensor::Tensor;

/// Dropout的缓存：配置与掩码。训练模式下掩码由0/1组成，测试模式下为`None`
#[derive(Debug, Clone)]
pub struct DropoutCache {
    pub(crate) dropout_param: DropoutParam,
    pub(crate) mask: Option<Tensor>,
    input_shape: Vec<usize>,
}

impl DropoutCache {
    pub fn mask(&self) -> Option<&Tensor> {
        self.mask.as_ref()
    }
}

/// Dropout前向传播，输入可以是任意形状
///
/// 设置了`seed`时掩码可复现（梯度检验需要这一点）；否则每次调用都从系统熵重新取种子。
pub fn dropout_forward(
    x: &Tensor,
    dropout_param: &DropoutParam,
) -> Result<(Tensor, DropoutCache), LayerError> {
    dropout_param.validate()?;
    let p = dropout_param.p;

    let (out, mask) = match dropout_param.mode {
        Mode::Train => {
            let mut rng = match dropout_param.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mask_data = (0..x.size())
                .map(|_| if rng.r#gen::<f64>() > p { 1.0 } else { 0.0 })
                .collect::<Vec<_>>();
            let mask = Tensor::new(&mask_data, x.shape());
            debug!(
                "dropout掩码已生成：保留{}/{}个元素（p={p}）",
                mask.sum(),
                mask.size()
            );
            ((x * &mask) / (1.0 - p), Some(mask))
        }
        Mode::Test => (x.clone(), None),
    };

    let cache = DropoutCache {
        dropout_param: *dropout_param,
        mask,
        input_shape: x.shape().to_vec(),
    };
    Ok((out, cache))
}

/// Dropout反向传播：训练模式下乘以同一掩码并放大`1 / (1 - p)`倍，测试模式下原样透传
pub fn dropout_backward(dout: &Tensor, cache: &DropoutCache) -> Result<Tensor, LayerError> {
    check_shape(dout, &cache.input_shape, "dropout上游梯度的形状须与输入相同")?;
    Ok(match &cache.mask {
        Some(mask) => (dout * mask) / (1.0 - cache.dropout_param.p),
        None => dout.clone(),
    })
}
