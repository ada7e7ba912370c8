/*
 * @Description  : 各层的配置与批归一化的滑动统计量。
 *                 配置均为带命名字段与默认值的结构体，可直接构造，也可由JSON解析（如`{"mode": "train", "p": 0.5}`）。
 */

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{ComparisonOperator, LayerError};
use crate::tensor::Tensor;

/// 批归一化与dropout的运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Mode {
    Train,
    Test,
}

impl FromStr for Mode {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Self::Train),
            "test" => Ok(Self::Test),
            other => Err(LayerError::InvalidMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for Mode {
    type Error = LayerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// 所有层配置的公共行为：合法性校验，以及从JSON构造（构造后立即校验）
pub trait LayerConfig: DeserializeOwned {
    fn validate(&self) -> Result<(), LayerError>;

    fn from_json(json: &str) -> Result<Self, LayerError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        // 未知的模式字符串单独报告为`InvalidMode`
        if let Some(mode) = value.get("mode").and_then(serde_json::Value::as_str) {
            mode.parse::<Mode>()?;
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓批归一化↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
const fn default_eps() -> f64 {
    1e-5
}
const fn default_momentum() -> f64 {
    0.9
}

/// 批归一化配置。`mode`必填，`eps`默认1e-5，`momentum`默认0.9
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchNormParam {
    pub mode: Mode,
    #[serde(default = "default_eps")]
    pub eps: f64,
    #[serde(default = "default_momentum")]
    pub momentum: f64,
}

impl BatchNormParam {
    pub const fn new(mode: Mode) -> Self {
        Self {
            mode,
            eps: default_eps(),
            momentum: default_momentum(),
        }
    }
}

impl LayerConfig for BatchNormParam {
    fn validate(&self) -> Result<(), LayerError> {
        check("eps", self.eps, ComparisonOperator::GreaterThan, 0.0)?;
        check("momentum", self.momentum, ComparisonOperator::GreaterOrEqual, 0.0)?;
        check("momentum", self.momentum, ComparisonOperator::LessOrEqual, 1.0)
    }
}

/// 批归一化的滑动均值/方差，由调用方持有，训练模式下每次前向传播都会被原地更新，测试模式下只读。
///
/// 注：同一份`RunningStats`只能被单个调用方顺序使用（`&mut`借用已在编译期保证这一点）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    running_mean: Option<Tensor>,
    running_var: Option<Tensor>,
}

impl RunningStats {
    /// 创建特征数为`d`、全零初始化的滑动统计量
    pub fn new(d: usize) -> Self {
        Self {
            running_mean: Some(Tensor::zeros(&[d])),
            running_var: Some(Tensor::zeros(&[d])),
        }
    }

    pub fn running_mean(&self) -> Option<&Tensor> {
        self.running_mean.as_ref()
    }

    pub fn running_var(&self) -> Option<&Tensor> {
        self.running_var.as_ref()
    }

    /// 检查已初始化的统计量形状是否为`[d]`，不做任何修改
    pub(crate) fn check_len(&self, d: usize) -> Result<(), LayerError> {
        for t in [&self.running_mean, &self.running_var].into_iter().flatten() {
            if t.shape() != [d].as_slice() {
                return Err(LayerError::ShapeMismatch {
                    expected: vec![d],
                    got: t.shape().to_vec(),
                    message: "滑动统计量的形状与特征数不一致".to_string(),
                });
            }
        }
        Ok(())
    }

    /// 先检查两项统计量的形状，全部通过后再把未初始化的项按特征数`d`全零初始化
    pub(crate) fn ensure_initialized(&mut self, d: usize) -> Result<(), LayerError> {
        self.check_len(d)?;
        for stat in [&mut self.running_mean, &mut self.running_var] {
            stat.get_or_insert_with(|| Tensor::zeros(&[d]));
        }
        Ok(())
    }

    /// 返回（均值，方差）的拷贝，未初始化的项视为全零
    pub(crate) fn snapshot(&self, d: usize) -> (Tensor, Tensor) {
        let zeros = || Tensor::zeros(&[d]);
        (
            self.running_mean.clone().unwrap_or_else(zeros),
            self.running_var.clone().unwrap_or_else(zeros),
        )
    }

    /// 指数滑动平均：running = momentum * running + (1 - momentum) * batch_stat
    pub(crate) fn update(&mut self, sample_mean: &Tensor, sample_var: &Tensor, momentum: f64) {
        let d = sample_mean.size();
        let (mean, var) = self.snapshot(d);
        self.running_mean = Some(mean * momentum + sample_mean * (1.0 - momentum));
        self.running_var = Some(var * momentum + sample_var * (1.0 - momentum));
        debug!("批归一化滑动统计量已更新（特征数={d}，momentum={momentum}）");
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑批归一化↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/// Dropout配置。`p`为丢弃概率，`seed`用于梯度检验时复现相同的掩码
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropoutParam {
    pub p: f64,
    pub mode: Mode,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl DropoutParam {
    pub const fn new(p: f64, mode: Mode) -> Self {
        Self { p, mode, seed: None }
    }

    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl LayerConfig for DropoutParam {
    /// 测试模式下dropout恒等输出，不读取`p`
    fn validate(&self) -> Result<(), LayerError> {
        if self.mode == Mode::Test {
            return Ok(());
        }
        check("p", self.p, ComparisonOperator::GreaterOrEqual, 0.0)?;
        check("p", self.p, ComparisonOperator::LessThan, 1.0)
    }
}

/// 卷积配置，默认`stride = 1`、`pad = 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvParam {
    pub stride: usize,
    pub pad: usize,
}

impl Default for ConvParam {
    fn default() -> Self {
        Self { stride: 1, pad: 0 }
    }
}

impl LayerConfig for ConvParam {
    fn validate(&self) -> Result<(), LayerError> {
        check(
            "stride",
            self.stride as f64,
            ComparisonOperator::GreaterOrEqual,
            1.0,
        )
    }
}

/// 最大池化配置（无填充），默认2x2窗口、步长2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolParam {
    pub pool_height: usize,
    pub pool_width: usize,
    pub stride: usize,
}

impl Default for PoolParam {
    fn default() -> Self {
        Self {
            pool_height: 2,
            pool_width: 2,
            stride: 2,
        }
    }
}

impl LayerConfig for PoolParam {
    fn validate(&self) -> Result<(), LayerError> {
        for (name, value) in [
            ("pool_height", self.pool_height),
            ("pool_width", self.pool_width),
            ("stride", self.stride),
        ] {
            check(name, value as f64, ComparisonOperator::GreaterOrEqual, 1.0)?;
        }
        Ok(())
    }
}

fn check(
    value_name: &str,
    value: f64,
    operator: ComparisonOperator,
    threshold: f64,
) -> Result<(), LayerError> {
    let satisfied = match operator {
        ComparisonOperator::GreaterOrEqual => value >= threshold,
        ComparisonOperator::LessOrEqual => value <= threshold,
        ComparisonOperator::GreaterThan => value > threshold,
        ComparisonOperator::LessThan => value < threshold,
    };
    if satisfied {
        Ok(())
    } else {
        Err(LayerError::ValueMustSatisfyComparison {
            value_name: value_name.to_string(),
            operator,
            threshold,
            value,
        })
    }
}
