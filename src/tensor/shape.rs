use super::Tensor;
use crate::errors::TensorError;
use std::collections::HashSet;

impl Tensor {
    /// 在元素总数不变的前提下改变张量形状（按行优先顺序重排），否则会panic
    pub fn reshape(&self, shape: &[usize]) -> Self {
        let total_elements: usize = self.data.len();
        let new_total_elements: usize = shape.iter().product();
        assert!(
            total_elements == new_total_elements,
            "{}",
            TensorError::IncompatibleShape
        );
        // 先转为标准布局，保证重排按逻辑上的行优先顺序进行
        let data = self.data.as_standard_layout().to_owned();
        Self {
            data: data.into_shape(shape).unwrap(),
        }
    }

    /// 按`axes`给出的顺序交换张量的各个维度，`axes`须是[0, 维数)的一个排列
    pub fn permute(&self, axes: &[usize]) -> Self {
        assert!(
            axes.len() == self.dimension(),
            "{}",
            TensorError::PermuteNeedSameDims
        );
        let unique_axes = axes.iter().copied().collect::<HashSet<_>>();
        assert!(
            unique_axes.len() == axes.len() && axes.iter().all(|&a| a < self.dimension()),
            "{}",
            TensorError::PermuteNeedUniqueAndInRange
        );
        Self {
            data: self
                .data
                .clone()
                .permuted_axes(axes.to_vec())
                .as_standard_layout()
                .to_owned(),
        }
    }

    /// 2阶张量（矩阵）的转置
    pub fn transpose(&self) -> Self {
        assert!(self.dimension() == 2, "{}", TensorError::MatMulNeed2Dims);
        self.permute(&[1, 0])
    }

    /// 保留首个（batch）维度，把其余维度展平成一维，得到形状为`[N, D]`的矩阵
    pub fn flatten_batch(&self) -> Self {
        let n = self.shape().first().copied().unwrap_or(1);
        let d = self.shape().iter().skip(1).product();
        self.reshape(&[n, d])
    }
}
