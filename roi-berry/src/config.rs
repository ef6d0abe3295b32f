//! patch 提取配置.

use std::env;

use log::debug;

use crate::consts::env::{RADIUS, SHAPE, STEP, UNIT};
use crate::{PatchShape, RoiError, RoiResult, Unit};

/// 格点 ROI 提取的完整配置.
///
/// `radius` 和 `step` 使用同一单位 `unit`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoiConfig {
    /// 邻域半径.
    pub radius: f64,

    /// 格点步长.
    pub step: f64,

    /// `radius` 和 `step` 的单位.
    pub unit: Unit,

    /// 邻域形状.
    pub shape: PatchShape,
}

impl Default for RoiConfig {
    /// 半径 1, 步长 1, 体素单位, 超长方体邻域.
    fn default() -> Self {
        Self {
            radius: 1.0,
            step: 1.0,
            unit: Unit::Voxel,
            shape: PatchShape::Box,
        }
    }
}

impl RoiConfig {
    /// 以体素为单位、超长方体邻域创建配置.
    #[inline]
    pub fn new(radius: f64, step: f64) -> Self {
        Self {
            radius,
            step,
            ..Default::default()
        }
    }

    /// 替换单位.
    #[inline]
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// 替换邻域形状.
    #[inline]
    pub fn with_shape(mut self, shape: PatchShape) -> Self {
        self.shape = shape;
        self
    }

    /// 检查半径和步长是否为有限正数.
    pub fn validate(&self) -> RoiResult<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(RoiError::Configuration("邻域半径必须为有限正数"));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(RoiError::Configuration("格点步长必须为有限正数"));
        }
        Ok(())
    }

    /// 从环境变量读取配置.
    ///
    /// 依次读取 `$ROI_RADIUS`, `$ROI_STEP`, `$ROI_UNIT`, `$ROI_SHAPE`.
    /// 未设置或无法解析的项使用 [`RoiConfig::default`] 中的值.
    #[inline]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 与 [`Self::from_env_or_default`] 相同, 但通过 `lookup` 获取各项的值.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let default = Self::default();
        let cfg = Self {
            radius: parse_or(&lookup, RADIUS, default.radius),
            step: parse_or(&lookup, STEP, default.step),
            unit: parse_or(&lookup, UNIT, default.unit),
            shape: parse_or(&lookup, SHAPE, default.shape),
        };
        debug!("ROI 配置: {cfg:?}");
        cfg
    }
}

fn parse_or<F, V>(lookup: &F, key: &str, default: V) -> V
where
    F: Fn(&str) -> Option<String>,
    V: std::str::FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
