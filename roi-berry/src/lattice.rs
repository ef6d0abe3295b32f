//! 格点生成.
//!
//! 在掩膜的有效索引空间上, 沿前三个空间轴以固定步长行走 (更高的轴步长恒为 1),
//! 收集所有落在前景体素上的位置. 结果按行优先 (最外层轴变化最慢) 排列,
//! 对同一 `(mask, step)` 重复调用得到完全相同的序列.

use log::{debug, warn};
use ndarray::{Axis, Dimension, IntoDimension, Slice};
use num::Zero;

use crate::consts::{HIGHER_AXIS_RADIUS, SPATIAL_AXES};
use crate::{GridAttr, LabelImage, RoiError, RoiResult};

/// 步长与半径的单位. 两者总是使用同一种单位.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    /// 以体素为单位. 数值四舍五入到整数.
    #[default]
    Voxel,

    /// 以物理长度 (与分辨率同单位, 一般为毫米) 为单位,
    /// 在每个轴上按该轴分辨率换算成体素数后四舍五入.
    Physical,
}

impl std::str::FromStr for Unit {
    type Err = RoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "voxel" | "vox" => Ok(Self::Voxel),
            "mm" | "physical" => Ok(Self::Physical),
            _ => Err(RoiError::Configuration("未知的长度单位")),
        }
    }
}

impl Unit {
    /// 将长度 `len` 换算到第 `axis` 个轴上的体素数 (四舍五入).
    #[inline]
    fn to_voxels(self, len: f64, spacing: &[f64], axis: usize) -> usize {
        match self {
            Self::Voxel => len.round() as usize,
            Self::Physical => (len / spacing[axis]).round() as usize,
        }
    }

    /// 计算各轴的格点步长 (体素数). 前三个轴至少为 1, 更高的轴恒为 1.
    pub fn strides(self, step: f64, spacing: &[f64]) -> Vec<usize> {
        (0..spacing.len())
            .map(|axis| {
                if axis < SPATIAL_AXES {
                    self.to_voxels(step, spacing, axis).max(1)
                } else {
                    1
                }
            })
            .collect()
    }

    /// 计算各轴的邻域半径 (体素数). 第三个轴之后的半径被钳制为
    /// [`HIGHER_AXIS_RADIUS`].
    pub fn radius(self, radius: f64, spacing: &[f64]) -> Vec<usize> {
        (0..spacing.len())
            .map(|axis| {
                if axis < SPATIAL_AXES {
                    self.to_voxels(radius, spacing, axis)
                } else {
                    HIGHER_AXIS_RADIUS
                }
            })
            .collect()
    }
}

/// 一次格点生成的结果. 生成后不可变.
///
/// 每个格点是相对于掩膜起始索引的数组索引.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lattice<D: Dimension> {
    points: Vec<D>,
    strides: Vec<usize>,
}

impl<D: Dimension> Lattice<D> {
    /// 格点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 是否没有任何格点.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 全部格点, 按生成顺序.
    #[inline]
    pub fn points(&self) -> &[D] {
        &self.points
    }

    /// 第 `i` 个格点. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&D> {
        self.points.get(i)
    }

    /// 生成时各轴实际使用的步长 (体素数). 超过轴长的步长被钳制为轴长.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// 按生成顺序迭代格点.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, D> {
        self.points.iter()
    }
}

impl<'a, D: Dimension> IntoIterator for &'a Lattice<D> {
    type Item = &'a D;
    type IntoIter = std::slice::Iter<'a, D>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// 在 `mask` 上以步长 `step` (单位 `unit`) 生成格点.
///
/// 仅保留落在前景 (非零) 体素上的跨步位置.
///
/// # 返回值
///
/// - `step` 非正或为 NaN 时, 返回 `Err(RoiError::Configuration)`;
/// - `mask` 为 `None` 时, 返回 `Err(RoiError::InvalidInput)`;
/// - 掩膜范围退化或跨步网格上没有前景时, 返回空格点;
/// - 各轴实际步长不超过该轴长度, 见 [`Lattice::strides`];
/// - 其他情况下返回按行优先排列的格点.
pub fn generate_lattice<T, D>(
    mask: Option<&LabelImage<T, D>>,
    step: f64,
    unit: Unit,
) -> RoiResult<Lattice<D>>
where
    T: Clone + Zero,
    D: Dimension,
{
    if !(step.is_finite() && step > 0.0) {
        return Err(RoiError::Configuration("格点步长必须为有限正数"));
    }
    let mask = mask.ok_or(RoiError::InvalidInput("掩膜未设置"))?;

    // 步长不小于轴长时只会选中索引 0.
    let strides: Vec<usize> = unit
        .strides(step, mask.spacing())
        .into_iter()
        .zip(mask.shape())
        .map(|(s, &n)| s.min(n.max(1)))
        .collect();
    if mask.is_degenerate() {
        warn!("掩膜范围退化 {:?}, 格点为空", mask.shape());
        return Ok(Lattice {
            points: vec![],
            strides,
        });
    }

    let mut view = mask.data();
    for (axis, &s) in strides.iter().enumerate() {
        view.slice_axis_inplace(Axis(axis), Slice::new(0, None, s as isize));
    }

    let points: Vec<D> = view
        .indexed_iter()
        .filter(|(_, p)| !p.is_zero())
        .map(|(pos, _)| {
            let mut idx = pos.into_dimension();
            for (axis, &s) in strides.iter().enumerate() {
                idx[axis] *= s;
            }
            idx
        })
        .collect();

    debug!(
        "格点生成完成: shape = {:?}, strides = {:?}, 格点数 = {}",
        mask.shape(),
        strides,
        points.len()
    );
    Ok(Lattice { points, strides })
}

/// 格点生成实现块
impl<T: Clone + Zero, D: Dimension> LabelImage<T, D> {
    /// 以 `self` 为掩膜生成格点. 见 [`generate_lattice`].
    #[inline]
    pub fn lattice(&self, step: f64, unit: Unit) -> RoiResult<Lattice<D>> {
        generate_lattice(Some(self), step, unit)
    }
}
