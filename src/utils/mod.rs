//! # 常用接口模块
//!
//! 本模块提供数值梯度检验工具，以及单元测试中常用的断言宏

pub mod gradient_check;
pub mod macro_for_unit_test;
