use super::{H, sample_tensor};
use crate::assert_err;
use crate::errors::LayerError;
use crate::layers::{relu_backward, relu_forward};
use crate::tensor::Tensor;
use crate::utils::gradient_check::{eval_numerical_gradient_array, rel_error};

#[test]
fn test_relu_forward() {
    let x = Tensor::new(&[-2., -0.5, 0., 0.5, 2., -1.], &[2, 3]);
    let (out, _) = relu_forward(&x);
    assert_eq!(out, Tensor::new(&[0., 0., 0., 0.5, 2., 0.], &[2, 3]));
}

#[test]
fn test_relu_forward_keeps_high_order_shape() {
    let x = sample_tensor(&[2, 3, 4], 7, -1., 1.);
    let (out, _) = relu_forward(&x);
    assert_eq!(out.shape(), x.shape());
    assert!(out.to_vec().iter().all(|&v| v >= 0.));
}

#[test]
fn test_relu_backward_routes_only_positive_inputs() {
    // x == 0 处梯度取0
    let x = Tensor::new(&[-1., 0., 2., 3.], &[4]);
    let dout = Tensor::new(&[10., 20., 30., 40.], &[4]);
    let (_, cache) = relu_forward(&x);
    let dx = relu_backward(&dout, &cache).unwrap();
    assert_eq!(dx, Tensor::new(&[0., 0., 30., 40.], &[4]));
}

#[test]
fn test_relu_backward_gradient_check() {
    let x = sample_tensor(&[4, 5], 5, -1., 1.);
    let dout = sample_tensor(&[4, 5], 6, -1., 1.);
    let (_, cache) = relu_forward(&x);
    let dx = relu_backward(&dout, &cache).unwrap();
    let dx_num = eval_numerical_gradient_array(|x| relu_forward(x).0, &x, &dout, H);
    assert!(rel_error(&dx, &dx_num) < 1e-7);
}

#[test]
fn test_relu_backward_with_wrong_dout_shape() {
    let (_, cache) = relu_forward(&Tensor::zeros(&[2, 3]));
    assert_err!(
        relu_backward(&Tensor::zeros(&[3, 2]), &cache),
        LayerError::ShapeMismatch([2, 3], [3, 2])
    );
}
