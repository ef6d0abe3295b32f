//! patch 邻域形状.

use itertools::Itertools;

/// 以格点为中心的邻域形状. 每个轴的半径由 [`crate::Unit::radius`] 给出.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PatchShape {
    /// 超长方体, 第 `i` 轴半宽为 `r[i]`. 理论体素数为 `∏(2 r[i] + 1)`.
    #[default]
    Box,

    /// 中心加上沿各轴的十字臂. 理论体素数为 `1 + Σ 2 r[i]`.
    Cross,

    /// 内切于 `Box` 的椭球, 即满足 `Σ (o[i] / r[i])^2 <= 1` 的偏移.
    /// 半径为 0 的轴上偏移只能为 0.
    Ellipsoid,
}

impl std::str::FromStr for PatchShape {
    type Err = crate::RoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "box" => Ok(Self::Box),
            "cross" => Ok(Self::Cross),
            "ellipsoid" | "ball" => Ok(Self::Ellipsoid),
            _ => Err(crate::RoiError::Configuration("未知的邻域形状")),
        }
    }
}

impl PatchShape {
    /// 生成相对中心的全部偏移量, 按行优先 (最后一个轴变化最快) 排列.
    ///
    /// 返回值的长度就是该形状的理论体素数, 即 patch 权重的分母.
    /// `radius` 应先通过 [`Self::voxel_count`] 检查.
    pub fn offsets(&self, radius: &[usize]) -> Vec<Vec<isize>> {
        match self {
            Self::Box => box_offsets(radius).collect(),
            Self::Cross => cross_offsets(radius),
            Self::Ellipsoid => box_offsets(radius)
                .filter(|o| inside_ellipsoid(o, radius))
                .collect(),
        }
    }

    /// 理论体素数, 与 [`Self::offsets`] 的长度一致.
    ///
    /// 任一轴半径超出 `isize` 或计数溢出 `usize` 时返回 `None`.
    pub fn voxel_count(&self, radius: &[usize]) -> Option<usize> {
        if radius.iter().any(|&r| isize::try_from(r).is_err()) {
            return None;
        }
        match self {
            Self::Box => box_count(radius),
            Self::Cross => radius
                .iter()
                .try_fold(1usize, |acc, &r| r.checked_mul(2)?.checked_add(acc)),
            Self::Ellipsoid => {
                box_count(radius)?;
                Some(
                    box_offsets(radius)
                        .filter(|o| inside_ellipsoid(o, radius))
                        .count(),
                )
            }
        }
    }
}

/// `∏(2 r[i] + 1)`, 溢出时返回 `None`.
fn box_count(radius: &[usize]) -> Option<usize> {
    radius.iter().try_fold(1usize, |acc, &r| {
        r.checked_mul(2)?.checked_add(1)?.checked_mul(acc)
    })
}

/// 超长方体内的全部偏移.
fn box_offsets(radius: &[usize]) -> impl Iterator<Item = Vec<isize>> + '_ {
    radius
        .iter()
        .map(|&r| -(r as isize)..=r as isize)
        .multi_cartesian_product()
}

/// 十字形偏移. 中心只出现一次.
fn cross_offsets(radius: &[usize]) -> Vec<Vec<isize>> {
    let ndim = radius.len();
    let cap = PatchShape::Cross.voxel_count(radius).unwrap_or(1);
    let mut ans = Vec::with_capacity(cap);
    ans.push(vec![0; ndim]);
    for (axis, &r) in radius.iter().enumerate() {
        for d in 1..=r as isize {
            for o in [-d, d] {
                let mut off = vec![0; ndim];
                off[axis] = o;
                ans.push(off);
            }
        }
    }
    ans
}

#[inline]
fn inside_ellipsoid(off: &[isize], radius: &[usize]) -> bool {
    off.iter()
        .zip(radius)
        .filter(|&(_, &r)| r != 0)
        .map(|(&o, &r)| (o as f64 / r as f64).powi(2))
        .sum::<f64>()
        <= 1.0 + 1e-9
}
