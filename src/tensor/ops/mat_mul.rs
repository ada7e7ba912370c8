use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::Ix2;

impl Tensor {
    /// 实现矩阵乘法。只接受2阶张量，否则会触发panic。
    /// 需要保证前一个张量的列数（col）等于后一个张量的行数（row），否则也会触发panic。
    pub fn mat_mul(&self, other: &Self) -> Self {
        assert!(
            self.dimension() == 2 && other.dimension() == 2,
            "{}",
            TensorError::MatMulNeed2Dims
        );
        assert!(
            self.shape()[1] == other.shape()[0],
            "{}",
            TensorError::OperatorError {
                operator: Operator::MatMul,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            }
        );
        // 将动态维度数组转换为常量维度数组
        let self_data = self.data.view().into_dimensionality::<Ix2>().unwrap();
        let other_data = other.data.view().into_dimensionality::<Ix2>().unwrap();
        Self {
            data: self_data.dot(&other_data).into_dyn(),
        }
    }
}
