//! 格点 ROI patch 提取.
//!
//! [`RoiExtractor`] 持有一个只读掩膜, 在 [`RoiExtractor::configure`] 时生成格点,
//! 然后以只进不退的游标逐个把格点邻域写入调用方提供的输出图像:
//!
//! ```
//! use ndarray::Array2;
//! use roi_berry::{LabelImage, RoiExtractor};
//!
//! let mask = LabelImage::new(Array2::<u8>::ones((10, 10)));
//! let mut out = LabelImage::<u8, _>::zeros_like(&mask);
//! let mut ex = RoiExtractor::new(&mask).unwrap();
//! ex.configure(1.0, 5.0).unwrap();
//!
//! let mut weights = vec![];
//! loop {
//!     out.clear();
//!     weights.push(ex.populate_patch(&mut out).unwrap());
//!     if !ex.has_next() {
//!         break;
//!     }
//!     ex.advance().unwrap();
//! }
//! assert_eq!(weights.len(), 4);
//! ```
//!
//! 状态机为 `Unconfigured -> Iterating -> Exhausted`, 只有重新配置能回到起点.

use log::{debug, trace, warn};
use ndarray::Dimension;
use num::{One, Zero};

use crate::consts::SPATIAL_AXES;
use crate::{GridAttr, LabelImage, Lattice, RoiConfig, RoiError, RoiResult};

mod shape;

pub use shape::PatchShape;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        mod par;
    }
}

/// 提取器所处的阶段.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// 未绑定掩膜或尚未配置.
    Unconfigured,

    /// 游标指向一个有效格点.
    Iterating,

    /// 游标已越过最后一个格点 (或格点为空).
    Exhausted,
}

/// 一次配置产生的全部迭代状态. 重新配置时整体替换.
#[derive(Debug)]
struct Plan<D: Dimension> {
    lattice: Lattice<D>,
    radius: Vec<usize>,
    /// 邻域偏移表, 长度即理论体素数.
    offsets: Vec<Vec<isize>>,
    cursor: usize,
}

impl<D: Dimension> Plan<D> {
    #[inline]
    fn current(&self) -> Option<&D> {
        self.lattice.get(self.cursor)
    }

    /// 以 `center` 为中心, 迭代落在 `shape` 范围内的邻域体素索引.
    fn voxels<'s>(&'s self, center: &'s D, shape: &'s [usize]) -> impl Iterator<Item = D> + 's {
        self.offsets
            .iter()
            .filter_map(move |off| shift(center, off, shape))
    }

    /// `center` 处 patch 的权重: 有效体素数 / 理论体素数.
    fn weight(&self, center: &D, shape: &[usize]) -> f64 {
        if self.offsets.is_empty() {
            return 0.0;
        }
        self.voxels(center, shape).count() as f64 / self.offsets.len() as f64
    }
}

/// 计算 `center + off`. 任一轴越出 `[0, shape)` 时返回 `None`.
#[inline]
fn shift<D: Dimension>(center: &D, off: &[isize], shape: &[usize]) -> Option<D> {
    let mut idx = center.clone();
    for (axis, &o) in off.iter().enumerate() {
        let v = idx[axis].checked_add_signed(o)?;
        if v >= shape[axis] {
            return None;
        }
        idx[axis] = v;
    }
    Some(idx)
}

/// 基于格点的 ROI patch 提取器.
///
/// 每个实例只应被一个调用方按 "绑定 -> 配置 -> 迭代" 的顺序使用.
/// 多个实例可以并行地共享同一个只读掩膜.
#[derive(Debug)]
pub struct RoiExtractor<'a, T, D: Dimension> {
    mask: Option<&'a LabelImage<T, D>>,
    config: RoiConfig,
    plan: Option<Plan<D>>,
}

impl<'a, T, D> RoiExtractor<'a, T, D>
where
    T: Clone + Zero + One,
    D: Dimension,
{
    /// 创建一个尚未绑定掩膜的提取器.
    #[inline]
    pub fn unbound() -> Self {
        Self {
            mask: None,
            config: RoiConfig::default(),
            plan: None,
        }
    }

    /// 创建并绑定到 `mask`. 掩膜范围退化时返回 `Err(RoiError::InvalidInput)`.
    pub fn new(mask: &'a LabelImage<T, D>) -> RoiResult<Self> {
        let mut ex = Self::unbound();
        ex.bind(mask)?;
        Ok(ex)
    }

    /// 绑定到新的掩膜, 并丢弃已有的迭代状态 (回到 `Unconfigured`).
    ///
    /// 掩膜范围退化时返回 `Err(RoiError::InvalidInput)`, 此时原状态保持不变.
    pub fn bind(&mut self, mask: &'a LabelImage<T, D>) -> RoiResult<()> {
        if mask.is_degenerate() {
            return Err(RoiError::InvalidInput("掩膜范围退化"));
        }
        self.mask = Some(mask);
        self.plan = None;
        Ok(())
    }

    /// 设置 [`Self::configure`] 使用的单位和邻域形状. 不影响已有的迭代状态.
    #[inline]
    pub fn with_config(mut self, config: RoiConfig) -> Self {
        self.config = config;
        self
    }

    /// 以半径 `radius` 和步长 `step` 配置提取器. 单位和邻域形状沿用当前配置.
    /// 见 [`Self::configure_with`].
    #[inline]
    pub fn configure(&mut self, radius: f64, step: f64) -> RoiResult<()> {
        let config = RoiConfig {
            radius,
            step,
            ..self.config
        };
        self.configure_with(&config)
    }

    /// 按 `config` 生成格点, 将游标重置为 0, 并计算各轴半径和邻域偏移表.
    ///
    /// 重复调用会丢弃正在进行的迭代.
    ///
    /// # 返回值
    ///
    /// - 半径或步长非正时, 返回 `Err(RoiError::Configuration)`;
    /// - 未绑定掩膜时, 返回 `Err(RoiError::InvalidInput)`;
    /// - 半径四舍五入到体素后在所有空间轴上都为 0 (如体素单位下的 `0.3`) 时,
    ///   返回 `Err(RoiError::Configuration)`;
    /// - 半径超出 `isize` 或理论体素数溢出时, 返回 `Err(RoiError::Configuration)`;
    ///
    /// 出错时原状态保持不变.
    pub fn configure_with(&mut self, config: &RoiConfig) -> RoiResult<()> {
        config.validate()?;
        let mask = self.mask.ok_or(RoiError::InvalidInput("掩膜未设置"))?;

        let radius = config.unit.radius(config.radius, mask.spacing());
        if radius.iter().take(SPATIAL_AXES).all(|&r| r == 0) {
            return Err(RoiError::Configuration("邻域半径换算为体素数后为 0"));
        }
        if config.shape.voxel_count(&radius).is_none() {
            return Err(RoiError::Configuration("邻域半径过大, 体素数溢出"));
        }

        let lattice = crate::generate_lattice(Some(mask), config.step, config.unit)?;
        let offsets = config.shape.offsets(&radius);

        debug!(
            "提取器已配置: radius = {:?}, shape = {:?}, 格点数 = {}, 理论 patch 体素数 = {}",
            radius,
            config.shape,
            lattice.len(),
            offsets.len()
        );
        if lattice.is_empty() {
            warn!("掩膜在当前步长下没有任何前景格点");
        }

        self.config = *config;
        self.plan = Some(Plan {
            lattice,
            radius,
            offsets,
            cursor: 0,
        });
        Ok(())
    }

    /// 当前所处阶段.
    pub fn phase(&self) -> Phase {
        match &self.plan {
            None => Phase::Unconfigured,
            Some(p) if p.cursor < p.lattice.len() => Phase::Iterating,
            Some(_) => Phase::Exhausted,
        }
    }

    /// 游标之后是否还有至少一个格点.
    ///
    /// 这是一个前瞻判断: 游标指向最后一个格点时返回 `false`,
    /// 尽管该格点的 patch 仍然可以被 [`Self::populate_patch`] 取得.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.plan
            .as_ref()
            .is_some_and(|p| p.cursor + 1 < p.lattice.len())
    }

    /// 将游标对应格点的邻域写入 `output`, 返回 patch 权重.
    ///
    /// 邻域内每个落在 `output` 范围内的体素被设为 `T::one()`,
    /// 权重为这些体素数与理论邻域体素数之比, 取值于 `[0, 1]`.
    /// 该操作不改变游标, 重复调用结果相同.
    ///
    /// # 返回值
    ///
    /// - 未配置或游标已耗尽时, 返回 `Err(RoiError::InvalidState)`;
    /// - `output` 的范围与掩膜不一致时, 返回 `Err(RoiError::InvalidState)`;
    ///
    /// 出错时 `output` 不会被修改.
    pub fn populate_patch(&self, output: &mut LabelImage<T, D>) -> RoiResult<f64> {
        let plan = self
            .plan
            .as_ref()
            .ok_or(RoiError::InvalidState("提取器尚未配置"))?;
        let center = plan
            .current()
            .ok_or(RoiError::InvalidState("格点已耗尽"))?;
        // 有 plan 就一定已绑定掩膜.
        let mask = self
            .mask
            .ok_or(RoiError::InvalidState("提取器尚未绑定掩膜"))?;
        if output.extent() != mask.extent() {
            return Err(RoiError::InvalidState("输出图像与掩膜的范围不一致"));
        }

        let mut marked = 0usize;
        for idx in plan.voxels(center, mask.shape()) {
            if let Some(v) = output.get_mut(idx) {
                *v = T::one();
                marked += 1;
            }
        }
        let weight = if plan.offsets.is_empty() {
            0.0
        } else {
            marked as f64 / plan.offsets.len() as f64
        };
        trace!(
            "patch #{} at {:?}: {}/{} 体素, weight = {weight}",
            plan.cursor,
            center.slice(),
            marked,
            plan.offsets.len()
        );
        Ok(weight)
    }

    /// 游标前进一格.
    ///
    /// 仍有下一个格点时进入下一个格点, 否则进入 `Exhausted`.
    /// 未配置或已耗尽时返回 `Err(RoiError::InvalidState)`.
    pub fn advance(&mut self) -> RoiResult<()> {
        let plan = self
            .plan
            .as_mut()
            .ok_or(RoiError::InvalidState("提取器尚未配置"))?;
        if plan.cursor >= plan.lattice.len() {
            return Err(RoiError::InvalidState("游标已越过最后一个格点"));
        }
        plan.cursor += 1;
        Ok(())
    }

    /// 当前游标. 未配置时返回 `None`.
    #[inline]
    pub fn cursor(&self) -> Option<usize> {
        self.plan.as_ref().map(|p| p.cursor)
    }

    /// 游标指向的格点 (数组索引). 未配置或已耗尽时返回 `None`.
    #[inline]
    pub fn current_point(&self) -> Option<&D> {
        self.plan.as_ref().and_then(Plan::current)
    }

    /// 当前配置生成的格点.
    #[inline]
    pub fn lattice(&self) -> Option<&Lattice<D>> {
        self.plan.as_ref().map(|p| &p.lattice)
    }

    /// 各轴邻域半径 (体素数).
    #[inline]
    pub fn radius(&self) -> Option<&[usize]> {
        self.plan.as_ref().map(|p| p.radius.as_slice())
    }

    /// 最近一次成功配置 (或 [`Self::with_config`]) 的配置.
    #[inline]
    pub fn config(&self) -> &RoiConfig {
        &self.config
    }

    /// 尚未取得的 patch 个数 (包括游标指向的那一个).
    #[inline]
    pub fn remaining(&self) -> usize {
        self.plan
            .as_ref()
            .map_or(0, |p| p.lattice.len().saturating_sub(p.cursor))
    }

    /// 第 `i` 个格点处 patch 的权重, 不需要输出图像, 也不改变游标.
    ///
    /// 未配置时返回 `Err(RoiError::InvalidState)`,
    /// `i` 越界时返回 `Err(RoiError::InvalidInput)`.
    pub fn patch_weight_at(&self, i: usize) -> RoiResult<f64> {
        let (plan, mask) = self.configured()?;
        let center = plan
            .lattice
            .get(i)
            .ok_or(RoiError::InvalidInput("格点索引越界"))?;
        Ok(plan.weight(center, mask.shape()))
    }

    /// 当前 patch 将会写入的全部体素的绝对索引, 顺序与邻域偏移表一致.
    ///
    /// 未配置或已耗尽时返回 `Err(RoiError::InvalidState)`.
    pub fn patch_voxels(&self) -> RoiResult<Vec<Vec<isize>>> {
        let (plan, mask) = self.configured()?;
        let center = plan
            .current()
            .ok_or(RoiError::InvalidState("格点已耗尽"))?;
        let extent = mask.extent();
        Ok(plan
            .voxels(center, mask.shape())
            .map(|idx| extent.to_absolute(idx.slice()))
            .collect())
    }

    fn configured(&self) -> RoiResult<(&Plan<D>, &'a LabelImage<T, D>)> {
        match (&self.plan, self.mask) {
            (Some(plan), Some(mask)) => Ok((plan, mask)),
            _ => Err(RoiError::InvalidState("提取器尚未配置")),
        }
    }
}

impl<'a, T, D> Default for RoiExtractor<'a, T, D>
where
    T: Clone + Zero + One,
    D: Dimension,
{
    #[inline]
    fn default() -> Self {
        Self::unbound()
    }
}

#[cfg(test)]
mod tests {
    use super::{Phase, RoiExtractor};
    use crate::consts::label::ENABLED;
    use crate::{GridAttr, LabelImage, PatchShape, RoiConfig, RoiError, Unit};
    use ndarray::{s, Array2, Array3, Array4, Ix2};

    fn init_log() {
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Trace)
            .init();
    }

    fn full_mask(h: usize, w: usize) -> LabelImage<u8, Ix2> {
        LabelImage::new(Array2::from_elem((h, w), ENABLED))
    }

    /// 按调用约定取出全部 patch: `(格点, 权重, 被标记的体素数)`.
    fn drain(
        ex: &mut RoiExtractor<u8, Ix2>,
        out: &mut LabelImage<u8, Ix2>,
    ) -> Vec<((usize, usize), f64, usize)> {
        let mut ans = vec![];
        loop {
            out.clear();
            let w = ex.populate_patch(out).unwrap();
            let p = ex.current_point().unwrap();
            ans.push(((p[0], p[1]), w, out.count_foreground()));
            if !ex.has_next() {
                break;
            }
            ex.advance().unwrap();
        }
        ans
    }

    #[test]
    fn test_10x10_step5_radius1() {
        init_log();
        let mask = full_mask(10, 10);
        let mut out = LabelImage::zeros_like(&mask);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(1.0, 5.0).unwrap();
        assert_eq!(ex.radius(), Some([1, 1].as_slice()));

        let got = drain(&mut ex, &mut out);
        assert_eq!(
            got,
            vec![
                ((0, 0), 4.0 / 9.0, 4),
                ((0, 5), 6.0 / 9.0, 6),
                ((5, 0), 6.0 / 9.0, 6),
                ((5, 5), 1.0, 9),
            ]
        );
    }

    #[test]
    fn test_patch_marks_expected_block() {
        let mask = full_mask(10, 10);
        let mut out = LabelImage::zeros_like(&mask);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(1.0, 5.0).unwrap();
        for _ in 0..3 {
            ex.advance().unwrap();
        }
        assert_eq!(ex.populate_patch(&mut out).unwrap(), 1.0);

        let mut expected = Array2::<u8>::zeros((10, 10));
        expected.slice_mut(s![4..7, 4..7]).fill(ENABLED);
        assert_eq!(out.data(), expected.view());
    }

    #[test]
    fn test_single_point_lattice() {
        let mut data = Array2::<u8>::zeros((5, 5));
        data[(2, 3)] = 1;
        let mask = LabelImage::new(data);
        let mut out = LabelImage::zeros_like(&mask);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(1.0, 1.0).unwrap();

        assert_eq!(ex.phase(), Phase::Iterating);
        assert!(!ex.has_next());
        assert_eq!(ex.populate_patch(&mut out).unwrap(), 1.0);

        ex.advance().unwrap();
        assert_eq!(ex.phase(), Phase::Exhausted);
        assert!(matches!(
            ex.populate_patch(&mut out),
            Err(RoiError::InvalidState(_))
        ));
        assert!(matches!(ex.advance(), Err(RoiError::InvalidState(_))));
    }

    #[test]
    fn test_n_point_lattice_has_next_pattern() {
        let mask = full_mask(6, 6);
        let mut out = LabelImage::zeros_like(&mask);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(1.0, 2.0).unwrap();
        let n = ex.lattice().unwrap().len();
        assert_eq!(n, 9);

        let mut populated = 0;
        for i in 0..n {
            assert_eq!(ex.cursor(), Some(i));
            assert_eq!(ex.has_next(), i + 1 < n);
            assert!(ex.populate_patch(&mut out).is_ok());
            populated += 1;
            ex.advance().unwrap();
        }
        assert_eq!(populated, n);
        assert_eq!(ex.remaining(), 0);
        assert!(ex.populate_patch(&mut out).is_err());
    }

    #[test]
    fn test_weight_range_and_truncation() {
        let mask = full_mask(8, 8);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(2.0, 1.0).unwrap();
        let lattice = ex.lattice().unwrap().clone();
        for (i, p) in lattice.iter().enumerate() {
            let w = ex.patch_weight_at(i).unwrap();
            assert!((0.0..=1.0).contains(&w));
            let interior = (2..6).contains(&p[0]) && (2..6).contains(&p[1]);
            if interior {
                assert_eq!(w, 1.0);
            } else {
                assert!(w < 1.0);
            }
        }
        // 角点: 3 * 3 / 25; 边: 3 * 5 / 25.
        assert_eq!(ex.patch_weight_at(0).unwrap(), 9.0 / 25.0);
        assert_eq!(ex.patch_weight_at(3).unwrap(), 15.0 / 25.0);
        assert!(matches!(
            ex.patch_weight_at(64),
            Err(RoiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_populate_is_idempotent() {
        let mask = full_mask(7, 7);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(2.0, 3.0).unwrap();
        ex.advance().unwrap();

        let mut a = LabelImage::zeros_like(&mask);
        let mut b = LabelImage::zeros_like(&mask);
        let wa = ex.populate_patch(&mut a).unwrap();
        let wb = ex.populate_patch(&mut b).unwrap();
        assert_eq!(wa, wb);
        assert_eq!(a.data(), b.data());

        // 同一缓冲区上重复写入也不变.
        let wa2 = ex.populate_patch(&mut a).unwrap();
        assert_eq!(wa, wa2);
        assert_eq!(a.data(), b.data());
        assert_eq!(ex.cursor(), Some(1));
    }

    #[test]
    fn test_reconfigure_resets_cursor() {
        let mask = full_mask(10, 10);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(1.0, 5.0).unwrap();
        ex.advance().unwrap();
        ex.advance().unwrap();
        assert_eq!(ex.cursor(), Some(2));

        ex.configure(2.0, 3.0).unwrap();
        assert_eq!(ex.cursor(), Some(0));
        assert_eq!(ex.lattice().unwrap().len(), 16);
        assert_eq!(ex.radius(), Some([2, 2].as_slice()));
        assert_eq!(ex.phase(), Phase::Iterating);
    }

    #[test]
    fn test_failed_reconfigure_keeps_state() {
        let mask = full_mask(10, 10);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(1.0, 5.0).unwrap();
        ex.advance().unwrap();

        assert!(matches!(
            ex.configure(1.0, 0.0),
            Err(RoiError::Configuration(_))
        ));
        assert!(matches!(
            ex.configure(-1.0, 2.0),
            Err(RoiError::Configuration(_))
        ));
        assert_eq!(ex.cursor(), Some(1));
        assert_eq!(ex.lattice().unwrap().len(), 4);
    }

    #[test]
    fn test_huge_radius_is_rejected() {
        let mask = full_mask(3, 3);
        let mut out = LabelImage::zeros_like(&mask);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(1.0, 1.0).unwrap();
        ex.advance().unwrap();

        for shape in [PatchShape::Box, PatchShape::Cross, PatchShape::Ellipsoid] {
            let config = RoiConfig::new(1e30, 1.0).with_shape(shape);
            assert!(matches!(
                ex.configure_with(&config),
                Err(RoiError::Configuration(_))
            ));
        }
        // 单轴半径可表示, 但体素数溢出.
        assert!(matches!(
            ex.configure(1e12, 1.0),
            Err(RoiError::Configuration(_))
        ));

        assert_eq!(ex.cursor(), Some(1));
        assert_eq!(ex.radius(), Some([1, 1].as_slice()));
        assert_eq!(ex.config().shape, PatchShape::Box);
        assert_eq!(ex.populate_patch(&mut out).unwrap(), 6.0 / 9.0);
    }

    #[test]
    fn test_large_radius_covers_whole_mask() {
        let mask = full_mask(3, 3);
        let mut out = LabelImage::zeros_like(&mask);
        let mut ex = RoiExtractor::new(&mask)
            .unwrap()
            .with_config(RoiConfig::default().with_shape(PatchShape::Cross));
        ex.configure(1e4, 1.0).unwrap();
        let w = ex.populate_patch(&mut out).unwrap();
        assert!(w > 0.0 && w < 1.0);
        assert_eq!(out.count_foreground(), 5);
    }

    #[test]
    fn test_radius_rounding_to_zero_is_rejected() {
        let mask = full_mask(4, 4);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        assert!(matches!(
            ex.configure(0.3, 1.0),
            Err(RoiError::Configuration(_))
        ));
        assert_eq!(ex.phase(), Phase::Unconfigured);

        // 只要有一个空间轴半径非零即可.
        let aniso = LabelImage::with_geometry(
            Array2::<u8>::ones((4, 4)),
            vec![0, 0],
            vec![5.0, 0.5],
        )
        .unwrap();
        let mut ex = RoiExtractor::new(&aniso)
            .unwrap()
            .with_config(RoiConfig::default().with_unit(Unit::Physical));
        ex.configure(1.0, 1.0).unwrap();
        assert_eq!(ex.radius(), Some([0, 2].as_slice()));
    }

    #[test]
    fn test_state_errors() {
        let mask = full_mask(4, 4);
        let mut out = LabelImage::zeros_like(&mask);

        let mut unbound = RoiExtractor::<u8, Ix2>::unbound();
        assert_eq!(unbound.phase(), Phase::Unconfigured);
        assert!(matches!(
            unbound.configure(1.0, 1.0),
            Err(RoiError::InvalidInput(_))
        ));
        assert!(matches!(
            unbound.populate_patch(&mut out),
            Err(RoiError::InvalidState(_))
        ));
        assert!(matches!(unbound.advance(), Err(RoiError::InvalidState(_))));
        assert!(!unbound.has_next());

        unbound.bind(&mask).unwrap();
        assert_eq!(unbound.phase(), Phase::Unconfigured);
        assert!(unbound.patch_voxels().is_err());

        let degenerate = LabelImage::new(Array2::<u8>::zeros((0, 3)));
        assert!(matches!(
            RoiExtractor::new(&degenerate),
            Err(RoiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_output_extent_mismatch_leaves_output_untouched() {
        let mask = full_mask(6, 6);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(1.0, 2.0).unwrap();

        let mut smaller = LabelImage::new(Array2::<u8>::zeros((5, 6)));
        assert!(matches!(
            ex.populate_patch(&mut smaller),
            Err(RoiError::InvalidState(_))
        ));
        assert_eq!(smaller.count_foreground(), 0);

        let shifted = Array2::<u8>::zeros((6, 6));
        let mut shifted = LabelImage::with_geometry(shifted, vec![1, 0], vec![1.0, 1.0]).unwrap();
        assert!(ex.populate_patch(&mut shifted).is_err());
        assert_eq!(shifted.count_foreground(), 0);
    }

    #[test]
    fn test_empty_lattice_is_exhausted() {
        let mask = LabelImage::new(Array2::<u8>::zeros((4, 4)));
        let mut out = LabelImage::zeros_like(&mask);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(1.0, 1.0).unwrap();
        assert_eq!(ex.phase(), Phase::Exhausted);
        assert!(!ex.has_next());
        assert!(ex.populate_patch(&mut out).is_err());
        assert!(ex.advance().is_err());
    }

    #[test]
    fn test_nonzero_start_and_patch_voxels() {
        let mut data = Array2::<u8>::zeros((4, 4));
        data[(0, 0)] = 1;
        let mask = LabelImage::with_geometry(data, vec![-2, 10], vec![1.0, 1.0]).unwrap();
        let mut out = LabelImage::zeros_like(&mask);
        let mut ex = RoiExtractor::new(&mask)
            .unwrap()
            .with_config(RoiConfig::default().with_shape(PatchShape::Cross));
        ex.configure(1.0, 1.0).unwrap();

        assert_eq!(
            ex.patch_voxels().unwrap(),
            vec![vec![-2, 10], vec![-1, 10], vec![-2, 11]]
        );
        let w = ex.populate_patch(&mut out).unwrap();
        assert_eq!(w, 3.0 / 5.0);
        assert_eq!(out[(0, 0)], ENABLED);
        assert_eq!(out[(1, 0)], ENABLED);
        assert_eq!(out[(0, 1)], ENABLED);
        assert_eq!(out.count_foreground(), 3);
    }

    #[test]
    fn test_3d_ellipsoid_in_physical_units() {
        let mut data = Array3::<u8>::zeros((5, 9, 9));
        data[(2, 4, 4)] = 1;
        let mask = LabelImage::with_geometry(data, vec![0; 3], vec![2.0, 1.0, 1.0]).unwrap();
        let mut out = LabelImage::zeros_like(&mask);
        let config = RoiConfig::new(2.0, 1.0)
            .with_unit(Unit::Physical)
            .with_shape(PatchShape::Ellipsoid);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure_with(&config).unwrap();

        // z 轴分辨率为 2mm, 半径只有 1 个体素.
        assert_eq!(ex.radius(), Some([1, 2, 2].as_slice()));
        assert_eq!(ex.populate_patch(&mut out).unwrap(), 1.0);
        assert_eq!(out[(2, 4, 6)], 1);
        assert_eq!(out[(3, 4, 4)], 1);
        assert_eq!(out[(3, 5, 5)], 0);
        assert_eq!(out[(2, 6, 6)], 0);
    }

    #[test]
    fn test_higher_axes_radius_clamped() {
        let mut data = Array4::<u8>::zeros((5, 5, 5, 4));
        data[(2, 2, 2, 0)] = 1;
        let mask = LabelImage::new(data);
        let mut out = LabelImage::zeros_like(&mask);
        let mut ex = RoiExtractor::new(&mask).unwrap();
        ex.configure(2.0, 1.0).unwrap();
        assert_eq!(ex.radius(), Some([2, 2, 2, 1].as_slice()));

        // 第 4 轴在 0 处被截断: 3 层中只有 2 层有效.
        let w = ex.populate_patch(&mut out).unwrap();
        assert_eq!(w, 2.0 / 3.0);
        assert_eq!(out.count_foreground(), 125 * 2);
        assert_eq!(out.size(), 500);
    }

    #[test]
    fn test_independent_extractors_in_parallel() {
        use rayon::prelude::*;

        let mask = full_mask(12, 12);
        let totals: Vec<usize> = [1.0, 2.0, 3.0, 4.0]
            .par_iter()
            .map(|&step| {
                let mut ex = RoiExtractor::new(&mask).unwrap();
                ex.configure(1.0, step).unwrap();
                let mut out = LabelImage::zeros_like(&mask);
                let mut n = 0;
                loop {
                    ex.populate_patch(&mut out).unwrap();
                    n += 1;
                    if !ex.has_next() {
                        break;
                    }
                    ex.advance().unwrap();
                }
                n
            })
            .collect();
        assert_eq!(totals, vec![144, 36, 16, 9]);
    }
}
