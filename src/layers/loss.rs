/*
 * @Description  : 分类损失函数。
 *                 输入`x`为[N, C]的分数矩阵（x[i, j]是第i个样本在第j类上的得分），
 *                 `y`为长度为N的标签，须满足 0 <= y[i] < C。
 *                 均返回(平均损失, 损失对x的梯度)。
 */

use super::check_dimension;
use crate::errors::{ComparisonOperator, LayerError};
use crate::tensor::Tensor;

/// 多分类SVM（hinge）损失，间隔为1
///
/// 对每个样本，错误类别j的间隔为`max(0, x[j] - x[y] + 1)`，损失为所有正间隔之和在批次上的均值；
/// 梯度在每个正间隔的类别上为`+1`，在正确类别上为`-正间隔个数`，最后整体除以N。
pub fn svm_loss(x: &Tensor, y: &[usize]) -> Result<(f64, Tensor), LayerError> {
    let (n, c) = check_scores_and_labels(x, y)?;

    let mut loss = 0.0;
    let mut dx = Tensor::zeros(x.shape());
    for (i, &label) in y.iter().enumerate() {
        let correct_score = x[[i, label]];
        let mut num_pos = 0.0;
        for j in (0..c).filter(|&j| j != label) {
            let margin = x[[i, j]] - correct_score + 1.0;
            if margin > 0.0 {
                loss += margin;
                dx[[i, j]] = 1.0;
                num_pos += 1.0;
            }
        }
        dx[[i, label]] -= num_pos;
    }

    let n = n as f64;
    Ok((loss / n, dx / n))
}

/// Softmax交叉熵损失
///
/// 先减去每行最大值再求对数概率（数值稳定），损失为正确类别负对数概率的均值，
/// 梯度为`(softmax(x) - one_hot(y)) / N`。
pub fn softmax_loss(x: &Tensor, y: &[usize]) -> Result<(f64, Tensor), LayerError> {
    let (n, c) = check_scores_and_labels(x, y)?;

    let mut loss = 0.0;
    let mut dx = Tensor::zeros(x.shape());
    for (i, &label) in y.iter().enumerate() {
        let max_val = row_max(x, i, c);
        let log_sum_exp = (0..c)
            .map(|j| (x[[i, j]] - max_val).exp())
            .sum::<f64>()
            .ln();
        for j in 0..c {
            let log_prob = x[[i, j]] - max_val - log_sum_exp;
            dx[[i, j]] = log_prob.exp();
            if j == label {
                loss -= log_prob;
                dx[[i, j]] -= 1.0;
            }
        }
    }

    let n = n as f64;
    Ok((loss / n, dx / n))
}

/// 数值稳定的softmax，`x`为[N, C]，返回每行和为1的概率矩阵
pub fn softmax(x: &Tensor) -> Result<Tensor, LayerError> {
    check_dimension(x, 2, "softmax的输入必须是2阶张量[N, C]")?;
    let (n, c) = (x.shape()[0], x.shape()[1]);

    let mut probs = Tensor::zeros(x.shape());
    for i in 0..n {
        let max_val = row_max(x, i, c);
        let mut sum_exp = 0.0;
        for j in 0..c {
            let exp_val = (x[[i, j]] - max_val).exp();
            probs[[i, j]] = exp_val;
            sum_exp += exp_val;
        }
        for j in 0..c {
            probs[[i, j]] /= sum_exp;
        }
    }
    Ok(probs)
}

fn row_max(x: &Tensor, row: usize, cols: usize) -> f64 {
    (0..cols)
        .map(|j| x[[row, j]])
        .fold(f64::NEG_INFINITY, f64::max)
}

/// 校验`x: [N, C]`与`y: [N]`，且每个标签都在[0, C)内；返回`(N, C)`
fn check_scores_and_labels(x: &Tensor, y: &[usize]) -> Result<(usize, usize), LayerError> {
    check_dimension(x, 2, "损失函数的输入必须是2阶张量[N, C]")?;
    let (n, c) = (x.shape()[0], x.shape()[1]);
    if y.len() != n {
        return Err(LayerError::ShapeMismatch {
            expected: vec![n],
            got: vec![y.len()],
            message: "标签个数须与样本数N一致".to_string(),
        });
    }
    if n == 0 {
        return Err(LayerError::ValueMustSatisfyComparison {
            value_name: "样本数N".to_string(),
            operator: ComparisonOperator::GreaterOrEqual,
            threshold: 1.0,
            value: 0.0,
        });
    }
    if let Some(&label) = y.iter().find(|&&label| label >= c) {
        return Err(LayerError::LabelOutOfRange {
            label,
            num_classes: c,
        });
    }
    Ok((n, c))
}
