//! # Only Layers
//!
//! `only_layers`用纯rust实现了一组神经网络层的前向/反向传播：
//! 仿射、ReLU、批归一化、dropout、卷积、最大池化、空间批归一化，
//! 以及多分类SVM与softmax两种损失函数。
//!
//! 每个层都是一对纯函数（`*_forward`返回输出与缓存，`*_backward`消费缓存并返回梯度），
//! 配合[`utils::gradient_check`]中的有限差分工具，可以逐层手工验证反向传播的正确性。
//! 训练循环、优化器、模型组装等均不在本库范围内。
//!
//! ```
//! use only_layers::layers::{affine_backward, affine_forward};
//! use only_layers::tensor::Tensor;
//!
//! let x = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
//! let w = Tensor::new(&[1.0, 0.0, 0.0, 1.0], &[2, 2]);
//! let b = Tensor::new(&[0.5, -0.5], &[2]);
//! let (out, cache) = affine_forward(&x, &w, &b).unwrap();
//! assert_eq!(out, Tensor::new(&[1.5, 1.5, 3.5, 3.5], &[2, 2]));
//!
//! let (dx, dw, db) = affine_backward(&Tensor::ones(&[2, 2]), &cache).unwrap();
//! assert_eq!(dx.shape(), x.shape());
//! assert_eq!(dw.shape(), w.shape());
//! assert_eq!(db, Tensor::new(&[2.0, 2.0], &[2]));
//! ```

pub mod errors;
pub mod layers;
pub mod tensor;
pub mod utils;
