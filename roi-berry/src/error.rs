//! 运行时错误.

use std::fmt::{Display, Formatter};

/// 格点生成或 patch 提取的运行时错误.
///
/// 所有错误都代表调用方违反了接口约定.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoiError {
    /// 输入掩膜/输出图像缺失或形状退化 (某个轴长度为 0).
    InvalidInput(&'static str),

    /// 步长或半径非正 (或为 NaN).
    Configuration(&'static str),

    /// 操作顺序不符合状态机约束, 或输出图像与掩膜的范围不一致.
    InvalidState(&'static str),
}

impl RoiError {
    /// 错误附带的简短描述.
    #[inline]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidInput(r) | Self::Configuration(r) | Self::InvalidState(r) => r,
        }
    }
}

impl Display for RoiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(r) => write!(f, "非法输入: {r}"),
            Self::Configuration(r) => write!(f, "非法配置: {r}"),
            Self::InvalidState(r) => write!(f, "非法状态: {r}"),
        }
    }
}

impl std::error::Error for RoiError {}
