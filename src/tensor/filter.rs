use super::Tensor;

impl Tensor {
    /// 通用的条件过滤函数，可以灵活处理张量中的元素
    ///
    /// # 参数
    /// * `condition` - 条件函数，接收元素值并返回bool
    /// * `true_fn` - 当条件为true时的值转换函数
    /// * `false_fn` - 当条件为false时的值转换函数
    ///
    /// # 示例
    /// ```
    /// use only_layers::tensor::Tensor;
    /// let t = Tensor::new(&[-1.0, 0.0, 1.0], &[3]);
    ///
    /// // 类似 np.where(x > 0.0, x, 0.0)
    /// let result = t.where_with_f64(|x| x > 0.0, |x| x, |_| 0.0);
    /// assert_eq!(result, Tensor::new(&[0.0, 0.0, 1.0], &[3]));
    /// ```
    pub fn where_with_f64<F, T, U>(&self, condition: F, true_fn: T, false_fn: U) -> Self
    where
        F: Fn(f64) -> bool,
        T: Fn(f64) -> f64,
        U: Fn(f64) -> f64,
    {
        Self {
            data: self.data.mapv(|x| {
                if x.is_nan() {
                    f64::NAN
                } else if condition(x) {
                    true_fn(x)
                } else {
                    false_fn(x)
                }
            }),
        }
    }

    /// 基于另一个张量的条件过滤函数，`other`的形状必须与当前张量相同
    ///
    /// # 示例
    /// ```
    /// use only_layers::tensor::Tensor;
    /// let x = Tensor::new(&[-1.0, 0.0, 1.0], &[3]);
    /// let dout = Tensor::new(&[5.0, 6.0, 7.0], &[3]);
    ///
    /// // 类似 np.where(x > 0, dout, 0)
    /// let result = x.where_with_tensor(&dout, |x, _| x > 0.0, |_, d| d, |_, _| 0.0);
    /// assert_eq!(result, Tensor::new(&[0.0, 0.0, 7.0], &[3]));
    /// ```
    pub fn where_with_tensor<F, T, U>(
        &self,
        other: &Self,
        condition: F,
        true_fn: T,
        false_fn: U,
    ) -> Self
    where
        F: Fn(f64, f64) -> bool,
        T: Fn(f64, f64) -> f64,
        U: Fn(f64, f64) -> f64,
    {
        assert!(
            self.is_same_shape(other),
            "两个张量的形状必须相同，当前张量形状为{:?}，比较张量形状为{:?}",
            self.shape(),
            other.shape()
        );

        let result = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&x, &y)| {
                if x.is_nan() || y.is_nan() {
                    f64::NAN
                } else if condition(x, y) {
                    true_fn(x, y)
                } else {
                    false_fn(x, y)
                }
            })
            .collect::<Vec<_>>();

        Self::new(&result, self.shape())
    }
}
