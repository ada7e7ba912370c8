use crate::tensor::Tensor;
use ndarray::{ArrayViewD, Axis};
use std::fmt;

impl fmt::Display for Tensor {
    /// 阶数不大于2时直接按行打印；阶数更高时，按前导索引逐个打印末尾的二维切片，
    /// 如形状为[2, 3, 4, 4]的张量会打印出`(0, 0, :, :)`到`(1, 2, :, :)`共6个4x4切片
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn write_matrix(f: &mut fmt::Formatter, view: &ArrayViewD<f64>) -> fmt::Result {
            match view.ndim() {
                0 => match view.iter().next() {
                    Some(v) => write!(f, "{v:8.4}"),
                    None => Ok(()),
                },
                1 => {
                    write!(f, "[")?;
                    for (i, v) in view.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{v:8.4}")?;
                    }
                    write!(f, "]")
                }
                _ => {
                    write!(f, "[")?;
                    for (i, row) in view.axis_iter(Axis(0)).enumerate() {
                        if i > 0 {
                            write!(f, ",\n ")?;
                        }
                        write_matrix(f, &row)?;
                    }
                    write!(f, "]")
                }
            }
        }

        fn write_slices(
            f: &mut fmt::Formatter,
            view: ArrayViewD<f64>,
            prefix: &mut Vec<usize>,
        ) -> fmt::Result {
            if view.ndim() <= 2 {
                let lead = prefix
                    .iter()
                    .map(|i| i.to_string())
                    .chain(std::iter::repeat(":".to_string()).take(view.ndim()))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(f, "({lead})")?;
                write_matrix(f, &view)?;
                return writeln!(f);
            }
            for (i, sub) in view.axis_iter(Axis(0)).enumerate() {
                prefix.push(i);
                write_slices(f, sub, prefix)?;
                prefix.pop();
            }
            Ok(())
        }

        let shape = self.shape();
        if shape.len() <= 2 {
            write_matrix(f, &self.data.view())?;
            writeln!(f)?;
        } else {
            write_slices(f, self.data.view(), &mut Vec::new())?;
        }
        writeln!(f, "形状: {shape:?}")
    }
}
