/*
 * @Description  : 错误类型。
 *                 `TensorError`用于张量自身的误用（以panic消息的形式出现）；
 *                 `LayerError`则是各网络层前向/反向函数通过`Result`返回的错误。
 */

use thiserror::Error;
mod ops;
pub use self::ops::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    // 张量二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },

    #[error("张量的数据长度{data_len}与形状{shape:?}所需的元素个数不一致")]
    DataLengthMismatch { data_len: usize, shape: Vec<usize> },
    #[error("张量形状不兼容")]
    IncompatibleShape,
    #[error("交换张量时，输入的维度数必须与张量维数一致")]
    PermuteNeedSameDims,
    #[error("需要交换的维度必须是唯一且在[0, <张量维数>)范围内")]
    PermuteNeedUniqueAndInRange,
    #[error("输入的张量维度必须为2")]
    MatMulNeed2Dims,
}

/// 网络层前向/反向传播中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    /// 无法识别的模式字符串（仅支持`train`与`test`）
    #[error("无效的模式\"{0}\"，仅支持\"train\"或\"test\"")]
    InvalidMode(String),
    #[error("{message}：期望形状为{expected:?}，实际为{got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    #[error("{message}：期望{expected}维，实际为{got}维")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        message: String,
    },
    #[error("标签{label}超出类别范围[0, {num_classes})")]
    LabelOutOfRange { label: usize, num_classes: usize },
    // 超参数检查用
    #[error("{value_name}须{operator}{threshold}，实际为{value}")]
    ValueMustSatisfyComparison {
        value_name: String,
        operator: ComparisonOperator,
        threshold: f64,
        value: f64,
    },
    /// 卷积核/池化窗口比（填充后的）输入还大
    #[error("输出尺寸无效：{0}")]
    InvalidOutputSize(String),
    #[error("配置解析失败：{0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for LayerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
