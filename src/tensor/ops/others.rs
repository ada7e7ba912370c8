use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::Axis;
use std::cmp::PartialEq;

impl From<f64> for Tensor {
    /// 实现 From<f64> trait 用于将`f64`类型转换为形状为`[1]`的张量
    fn from(scalar: f64) -> Self {
        Self::new(&[scalar], &[1])
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Tensor {
    /// 对张量中的所有元素求和，返回纯数
    pub fn sum(&self) -> f64 {
        self.data.sum()
    }

    /// 沿`axis`维求和，结果中该维度被移除，如形状为[N, D]的张量沿0维求和得到形状为[D]的张量
    pub fn sum_axis(&self, axis: usize) -> Self {
        Self {
            data: self.data.sum_axis(Axis(axis)),
        }
    }

    /// 沿`axis`维求均值，结果中该维度被移除
    pub fn mean_axis(&self, axis: usize) -> Self {
        let len = self.shape()[axis] as f64;
        self.sum_axis(axis) / len
    }

    /// 沿`axis`维求有偏方差（除以该维长度），结果中该维度被移除；该维长度须不为0
    pub fn var_axis(&self, axis: usize) -> Self {
        Self {
            data: self.data.var_axis(Axis(axis), 0.0),
        }
    }

    /// 逐元素地应用`f`，返回新的张量
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            data: self.data.mapv(f),
        }
    }

    /// 所有元素中绝对值的最大值；空张量返回0
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()))
    }

    /// 对两个形状严格一致的张量进行逐元素相乘，然后对结果求和
    pub fn dot_sum(&self, other: &Self) -> f64 {
        self.assert_same_shape_for(Operator::Mul, other);
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    pub(in crate::tensor) fn assert_same_shape_for(&self, operator: Operator, other: &Self) {
        assert!(
            self.is_same_shape(other),
            "{}",
            TensorError::OperatorError {
                operator,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            }
        );
    }
}
