use ndarray::{Array, IxDyn};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;

mod ops {
    pub mod add;
    pub mod div;
    pub mod mat_mul;
    pub mod mul;
    pub mod others;
    pub mod sub;
}

mod filter;
mod index;
mod print;
mod property;
mod shape;


/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 注：为了让有限差分的数值梯度足够精确，这里的元素类型统一为`f64`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tensor {
    data: Array<f64, IxDyn>,
}

impl Tensor {
    /// 创建一个张量，若为标量，`shape`可以是[]、[1]、[1,1]、[1,1,1]...
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为更高维度的数组，`shape`可以是[c,n,m,...]；
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等，否则会panic。
    pub fn new(data: &[f64], shape: &[usize]) -> Self {
        let expected_len: usize = shape.iter().product();
        assert!(
            data.len() == expected_len,
            "{}",
            TensorError::DataLengthMismatch {
                data_len: data.len(),
                shape: shape.to_vec(),
            }
        );
        let data = Array::from_shape_vec(IxDyn(shape), data.to_vec()).unwrap();
        Self { data }
    }

    /// 创建一个所有元素均为0的张量
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: Array::zeros(IxDyn(shape)),
        }
    }

    /// 创建一个所有元素均为1的张量
    pub fn ones(shape: &[usize]) -> Self {
        Self {
            data: Array::ones(IxDyn(shape)),
        }
    }

    /// 创建一个所有元素均为`value`的张量
    pub fn full(value: f64, shape: &[usize]) -> Self {
        Self {
            data: Array::from_elem(IxDyn(shape), value),
        }
    }

    /// 创建一个随机张量，其值在[min, max]的闭区间
    pub fn new_random(min: f64, max: f64, shape: &[usize]) -> Self {
        Self::random_with_rng(min, max, shape, &mut rand::thread_rng())
    }

    /// 同`new_random`，但使用固定种子，便于（梯度检验等）测试复现
    pub fn new_random_seeded(min: f64, max: f64, shape: &[usize], seed: u64) -> Self {
        Self::random_with_rng(min, max, shape, &mut StdRng::seed_from_u64(seed))
    }

    /// 创建一个服从正态分布的随机张量
    pub fn new_normal(mean: f64, std_dev: f64, shape: &[usize]) -> Self {
        Self::normal_with_rng(mean, std_dev, shape, &mut rand::thread_rng())
    }

    /// 同`new_normal`，但使用固定种子
    pub fn new_normal_seeded(mean: f64, std_dev: f64, shape: &[usize], seed: u64) -> Self {
        Self::normal_with_rng(mean, std_dev, shape, &mut StdRng::seed_from_u64(seed))
    }

    /// 直接由`ndarray`的动态维数组构造张量
    pub fn from_array(data: Array<f64, IxDyn>) -> Self {
        Self { data }
    }
}

// 私有方法
impl Tensor {
    fn random_with_rng<R: Rng>(min: f64, max: f64, shape: &[usize], rng: &mut R) -> Self {
        let uniform = Uniform::from(min..=max);
        let data = (0..shape.iter().product::<usize>())
            .map(|_| uniform.sample(rng))
            .collect::<Vec<_>>();
        Self::new(&data, shape)
    }

    // Box-Muller变换
    fn normal_with_rng<R: Rng>(mean: f64, std_dev: f64, shape: &[usize], rng: &mut R) -> Self {
        let data_len = shape.iter().product::<usize>();
        let mut data = Vec::with_capacity(data_len);

        while data.len() < data_len {
            let u1: f64 = rng.r#gen();
            let u2: f64 = rng.r#gen();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f64::consts::PI * u2;
            let z0 = mean + std_dev * r * theta.cos();
            let z1 = mean + std_dev * r * theta.sin();

            if z0.is_finite() {
                data.push(z0);
            }
            if data.len() < data_len && z1.is_finite() {
                data.push(z1);
            }
        }

        Self::new(&data, shape)
    }
}
