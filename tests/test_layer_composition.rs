/*
 * @Description  : 多个层首尾相接的组合测试。
 *                 网络结构：conv -> spatial_batchnorm -> relu -> max_pool
 *                          -> affine -> batchnorm -> dropout -> affine -> softmax_loss
 *                 手工串联各层的`*_backward`得到端到端梯度，再与数值梯度比较。
 */
use only_layers::errors::LayerError;
use only_layers::layers::{
    BatchNormParam, ConvParam, DropoutParam, LayerConfig, Mode, PoolParam, RunningStats,
    affine_backward, affine_forward, batchnorm_backward_alt, batchnorm_forward,
    conv_backward_naive, conv_forward_naive, dropout_backward, dropout_forward,
    max_pool_backward_naive, max_pool_forward_naive, relu_backward, relu_forward,
    softmax_loss, spatial_batchnorm_backward, spatial_batchnorm_forward, svm_loss,
};
use only_layers::tensor::Tensor;
use only_layers::utils::gradient_check::{eval_numerical_gradient, rel_error};

const N: usize = 4;
const H: f64 = 1e-5;

#[derive(Clone)]
struct Params {
    conv_w: Tensor,
    conv_b: Tensor,
    sbn_gamma: Tensor,
    sbn_beta: Tensor,
    w1: Tensor,
    b1: Tensor,
    bn_gamma: Tensor,
    bn_beta: Tensor,
    w2: Tensor,
    b2: Tensor,
}

impl Params {
    fn new() -> Self {
        Self {
            conv_w: Tensor::new_random_seeded(-0.5, 0.5, &[4, 3, 3, 3], 101),
            conv_b: Tensor::new_random_seeded(-0.1, 0.1, &[4], 102),
            sbn_gamma: Tensor::new_random_seeded(0.5, 1.5, &[4], 103),
            sbn_beta: Tensor::new_random_seeded(-0.5, 0.5, &[4], 104),
            w1: Tensor::new_random_seeded(-0.5, 0.5, &[16, 6], 105),
            b1: Tensor::new_random_seeded(-0.1, 0.1, &[6], 106),
            bn_gamma: Tensor::new_random_seeded(0.5, 1.5, &[6], 107),
            bn_beta: Tensor::new_random_seeded(-0.5, 0.5, &[6], 108),
            w2: Tensor::new_random_seeded(-0.5, 0.5, &[6, 3], 109),
            b2: Tensor::new_random_seeded(-0.1, 0.1, &[3], 110),
        }
    }
}

struct Grads {
    dx: Tensor,
    dconv_w: Tensor,
    dw1: Tensor,
    dbn_gamma: Tensor,
}

/// 前向传播得到损失；`with_grads`为真时再逐层反向传播
fn run(
    x: &Tensor,
    params: &Params,
    y: &[usize],
    dropout_param: &DropoutParam,
    running: &mut RunningStats,
    with_grads: bool,
) -> Result<(f64, Option<Grads>), LayerError> {
    let conv_param = ConvParam { stride: 1, pad: 1 };
    let bn_param = BatchNormParam::new(Mode::Train);

    let (a, conv_cache) = conv_forward_naive(x, &params.conv_w, &params.conv_b, &conv_param)?;
    let (s, sbn_cache) = spatial_batchnorm_forward(&a, &params.sbn_gamma, &params.sbn_beta)?;
    let (r, relu_cache) = relu_forward(&s);
    let (p, pool_cache) = max_pool_forward_naive(&r, &PoolParam::default())?;
    let (h, affine1_cache) = affine_forward(&p, &params.w1, &params.b1)?;
    let (hn, bn_cache) =
        batchnorm_forward(&h, &params.bn_gamma, &params.bn_beta, &bn_param, running)?;
    let (hd, dropout_cache) = dropout_forward(&hn, dropout_param)?;
    let (scores, affine2_cache) = affine_forward(&hd, &params.w2, &params.b2)?;
    let (loss, dscores) = softmax_loss(&scores, y)?;
    if !with_grads {
        return Ok((loss, None));
    }

    let (dhd, _, _) = affine_backward(&dscores, &affine2_cache)?;
    let dhn = dropout_backward(&dhd, &dropout_cache)?;
    let (dh, dbn_gamma, _) = batchnorm_backward_alt(&dhn, &bn_cache)?;
    let (dp, dw1, _) = affine_backward(&dh, &affine1_cache)?;
    let dr = max_pool_backward_naive(&dp, &pool_cache)?;
    let ds = relu_backward(&dr, &relu_cache)?;
    let (da, _, _) = spatial_batchnorm_backward(&ds, &sbn_cache)?;
    let (dx, dconv_w, _) = conv_backward_naive(&da, &conv_cache)?;

    let grads = Grads {
        dx,
        dconv_w,
        dw1,
        dbn_gamma,
    };
    Ok((loss, Some(grads)))
}

#[test]
fn test_end_to_end_gradient_check() -> Result<(), LayerError> {
    let x = Tensor::new_random_seeded(-1., 1., &[N, 3, 4, 4], 100);
    let y = [1, 2, 0, 1];
    let params = Params::new();
    let dropout_param = DropoutParam::new(0.3, Mode::Train).with_seed(7);

    let mut running = RunningStats::default();
    let (loss, grads) = run(&x, &params, &y, &dropout_param, &mut running, true)?;
    assert!(loss > 0. && loss.is_finite());
    let grads = grads.ok_or_else(|| LayerError::InvalidConfig("缺少梯度".to_string()))?;

    // 训练模式下滑动统计量不影响输出，数值梯度的每次前向都用新的
    let loss_of = |params: &Params, x: &Tensor| {
        run(x, params, &y, &dropout_param, &mut RunningStats::default(), false)
            .map(|(loss, _)| loss)
            .unwrap_or(f64::NAN)
    };

    let dx_num = eval_numerical_gradient(|x| loss_of(&params, x), &x, H);
    assert!(rel_error(&grads.dx, &dx_num) < 1e-4);

    let dconv_w_num = eval_numerical_gradient(
        |w| {
            let mut p = params.clone();
            p.conv_w = w.clone();
            loss_of(&p, &x)
        },
        &params.conv_w,
        H,
    );
    assert!(rel_error(&grads.dconv_w, &dconv_w_num) < 1e-5);

    let dw1_num = eval_numerical_gradient(
        |w| {
            let mut p = params.clone();
            p.w1 = w.clone();
            loss_of(&p, &x)
        },
        &params.w1,
        H,
    );
    assert!(rel_error(&grads.dw1, &dw1_num) < 1e-5);

    let dbn_gamma_num = eval_numerical_gradient(
        |gamma| {
            let mut p = params.clone();
            p.bn_gamma = gamma.clone();
            loss_of(&p, &x)
        },
        &params.bn_gamma,
        H,
    );
    assert!(rel_error(&grads.dbn_gamma, &dbn_gamma_num) < 1e-5);
    Ok(())
}

#[test]
fn test_test_mode_pass_is_deterministic() -> Result<(), LayerError> {
    let x = Tensor::new_random_seeded(-1., 1., &[N, 3, 4, 4], 200);
    let y = [0, 1, 2, 0];
    let params = Params::new();

    // 先用若干个训练批次积累滑动统计量
    let mut running = RunningStats::default();
    let train_dropout = DropoutParam::new(0.5, Mode::Train);
    for seed in 0..5 {
        let batch = Tensor::new_random_seeded(-1., 1., &[N, 3, 4, 4], 300 + seed);
        run(&batch, &params, &y, &train_dropout, &mut running, false)?;
    }
    let trained = running.clone();
    assert_eq!(trained.running_mean().unwrap().shape(), &[6]);

    // 测试模式：dropout恒等，批归一化只读滑动统计量，结果可重复
    let test_dropout = DropoutParam::from_json(r#"{"mode": "test", "p": 0.5}"#)?;
    let bn_param = BatchNormParam::from_json(r#"{"mode": "test"}"#)?;
    let forward = |running: &mut RunningStats| -> Result<Tensor, LayerError> {
        let (a, _) = conv_forward_naive(
            &x,
            &params.conv_w,
            &params.conv_b,
            &ConvParam::from_json(r#"{"pad": 1}"#)?,
        )?;
        let (s, _) = spatial_batchnorm_forward(&a, &params.sbn_gamma, &params.sbn_beta)?;
        let (r, _) = relu_forward(&s);
        let (p, _) = max_pool_forward_naive(&r, &PoolParam::from_json("{}")?)?;
        let (h, _) = affine_forward(&p, &params.w1, &params.b1)?;
        let (hn, _) = batchnorm_forward(&h, &params.bn_gamma, &params.bn_beta, &bn_param, running)?;
        let (hd, _) = dropout_forward(&hn, &test_dropout)?;
        Ok(affine_forward(&hd, &params.w2, &params.b2)?.0)
    };
    let scores1 = forward(&mut running)?;
    let scores2 = forward(&mut running)?;
    assert_eq!(scores1, scores2);
    assert_eq!(running, trained);
    assert_eq!(scores1.shape(), &[N, 3]);
    Ok(())
}

#[test]
fn test_gradient_descent_reduces_svm_loss() -> Result<(), LayerError> {
    // affine -> batchnorm -> relu -> affine -> svm_loss 上的朴素梯度下降
    let x = Tensor::new_random_seeded(-1., 1., &[8, 5], 400);
    let y = [0, 1, 2, 0, 1, 2, 0, 1];
    let mut w1 = Tensor::new_random_seeded(-0.5, 0.5, &[5, 7], 401);
    let mut b1 = Tensor::zeros(&[7]);
    let mut gamma = Tensor::ones(&[7]);
    let mut beta = Tensor::zeros(&[7]);
    let mut w2 = Tensor::new_random_seeded(-0.5, 0.5, &[7, 3], 402);
    let mut b2 = Tensor::zeros(&[3]);
    let bn_param = BatchNormParam::new(Mode::Train);
    let mut running = RunningStats::default();
    let learning_rate = 0.1;

    let mut losses = Vec::new();
    for _ in 0..30 {
        let (h, affine1_cache) = affine_forward(&x, &w1, &b1)?;
        let (hn, bn_cache) = batchnorm_forward(&h, &gamma, &beta, &bn_param, &mut running)?;
        let (r, relu_cache) = relu_forward(&hn);
        let (scores, affine2_cache) = affine_forward(&r, &w2, &b2)?;
        let (loss, dscores) = svm_loss(&scores, &y)?;
        losses.push(loss);

        let (dr, dw2, db2) = affine_backward(&dscores, &affine2_cache)?;
        let dhn = relu_backward(&dr, &relu_cache)?;
        let (dh, dgamma, dbeta) = batchnorm_backward_alt(&dhn, &bn_cache)?;
        let (_, dw1, db1) = affine_backward(&dh, &affine1_cache)?;

        w1 = &w1 - &(dw1 * learning_rate);
        b1 = &b1 - &(db1 * learning_rate);
        gamma = &gamma - &(dgamma * learning_rate);
        beta = &beta - &(dbeta * learning_rate);
        w2 = &w2 - &(dw2 * learning_rate);
        b2 = &b2 - &(db2 * learning_rate);
    }

    let (first, last) = (losses[0], losses[losses.len() - 1]);
    assert!(last < first * 0.5, "损失没有明显下降：{first} -> {last}");
    Ok(())
}
