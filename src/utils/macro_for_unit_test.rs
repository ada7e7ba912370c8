/// 错误断言宏 - 灵活粒度验证 Result 错误
///
/// # 用法
/// - `assert_err!(expr)`：只验证是 Err
/// - `assert_err!(expr, Variant(literal))`：验证错误类型 + 精确消息（String 变体）
/// - `assert_err!(expr, ShapeMismatch(exp, got))`：验证 ShapeMismatch 的期望/实际形状
/// - `assert_err!(expr, Pattern { .. })`：验证错误类型
/// - `assert_err!(expr, Pattern { field, .. } if condition)`：验证类型 + 条件
///
/// # 示例
/// ```ignore
/// assert_err!(result, LayerError::InvalidMode("eval"));
/// assert_err!(result, LayerError::ShapeMismatch([3, 4], [4, 4]));
/// assert_err!(result, LayerError::DimensionMismatch { expected: 4, .. });
/// ```
#[macro_export]
macro_rules! assert_err {
    // 只验证是 Err
    ($expr:expr) => {
        assert!($expr.is_err(), "预期 Err，实际得到 {:?}", $expr);
    };
    // 简洁语法：Variant(字符串字面量) - 精确匹配 String 内容
    ($expr:expr, $err_type:ident :: $variant:ident ( $expected:literal )) => {
        match &$expr {
            Err($err_type::$variant(actual)) => assert_eq!(
                actual, $expected,
                "错误消息不匹配：预期 `{}`，实际得到 `{}`",
                $expected, actual
            ),
            Err(e) => panic!(
                "错误类型不匹配：预期 `{}::{}`，实际得到 `{:?}`",
                stringify!($err_type), stringify!($variant), e
            ),
            Ok(_) => panic!(
                "预期 Err({}::{})，实际得到 Ok",
                stringify!($err_type), stringify!($variant)
            ),
        }
    };
    // 简洁语法：ShapeMismatch(expected, got)，不比较 message
    ($expr:expr, $err_type:ident :: ShapeMismatch ( $exp:expr, $got:expr )) => {
        match &$expr {
            Err($err_type::ShapeMismatch { expected, got, .. }) => {
                assert_eq!(expected.as_slice(), &$exp, "expected 不匹配");
                assert_eq!(got.as_slice(), &$got, "got 不匹配");
            }
            Err(e) => panic!(
                "错误类型不匹配：预期 `{}::ShapeMismatch`，实际得到 `{:?}`",
                stringify!($err_type), e
            ),
            Ok(_) => panic!(
                "预期 Err({}::ShapeMismatch)，实际得到 Ok",
                stringify!($err_type)
            ),
        }
    };
    // 通用模式匹配（带 if guard 或复杂 pattern）
    ($expr:expr, $($pattern:tt)+) => {
        match &$expr {
            Err(e) => assert!(
                matches!(e, $($pattern)+),
                "错误类型不匹配：预期 `{}`，实际得到 `{:?}`",
                stringify!($($pattern)+),
                e
            ),
            Ok(_) => panic!(
                "预期 Err 匹配 `{}`，实际得到 Ok",
                stringify!($($pattern)+)
            ),
        }
    };
}

/// 断言表达式会panic，可选地校验panic消息
#[macro_export]
macro_rules! assert_panic {
    ($expr:expr) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| $expr)) {
            Ok(_) => panic!("表达式没有触发panic"),
            Err(_) => (),
        }
    };
    ($expr:expr, $expected_msg:expr) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| $expr)) {
            Ok(_) => panic!("表达式没有触发panic"),
            Err(err) => {
                let expected_msg_str = $expected_msg.to_string();
                if let Some(msg) = err.downcast_ref::<&'static str>() {
                    assert_eq!(*msg, expected_msg_str, "panic消息与预期不符");
                } else if let Some(msg) = err.downcast_ref::<String>() {
                    assert_eq!(*msg, expected_msg_str, "panic消息与预期不符");
                } else {
                    panic!(
                        "未找到预期的panic消息，预期的panic消息为: {}",
                        expected_msg_str
                    );
                }
            }
        }
    };
}
