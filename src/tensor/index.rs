use super::Tensor;
use std::ops::{Index, IndexMut};

// 引用式索引，如`x[[n, c, h, w]]`；索引个数须与张量维数一致，越界则panic
impl<const N: usize> Index<[usize; N]> for Tensor {
    type Output = f64;

    fn index(&self, index: [usize; N]) -> &Self::Output {
        &self.data[&index[..]]
    }
}

impl<const N: usize> IndexMut<[usize; N]> for Tensor {
    fn index_mut(&mut self, index: [usize; N]) -> &mut Self::Output {
        &mut self.data[&index[..]]
    }
}

// 按行优先的扁平序号访问，数值梯度检验中逐个扰动元素时使用
impl Tensor {
    /// 第`i`个元素（行优先顺序），越界则panic
    pub fn get_flat(&self, i: usize) -> f64 {
        *self.data.iter().nth(i).unwrap_or_else(|| {
            panic!("扁平索引{i}越界，张量共有{}个元素", self.size())
        })
    }

    /// 设置第`i`个元素（行优先顺序）的值，越界则panic
    pub fn set_flat(&mut self, i: usize, value: f64) {
        let size = self.size();
        let elem = self
            .data
            .iter_mut()
            .nth(i)
            .unwrap_or_else(|| panic!("扁平索引{i}越界，张量共有{size}个元素"));
        *elem = value;
    }
}
