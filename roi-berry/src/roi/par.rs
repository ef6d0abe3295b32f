//! 并发查询部分.

use ndarray::Dimension;
use num::{One, Zero};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use super::RoiExtractor;
use crate::{GridAttr, RoiResult};

impl<'a, T, D> RoiExtractor<'a, T, D>
where
    T: Clone + Zero + One,
    D: Dimension,
{
    /// 借助 `rayon`, 并行地计算全部格点处的 patch 权重, 顺序与格点一致.
    ///
    /// 不需要输出图像, 也不改变游标. 未配置时返回 `Err(RoiError::InvalidState)`.
    pub fn par_patch_weights(&self) -> RoiResult<Vec<f64>> {
        let (plan, mask) = self.configured()?;
        let shape = mask.shape();
        Ok(plan
            .lattice
            .points()
            .par_iter()
            .map(|center| plan.weight(center, shape))
            .collect())
    }

    /// 借助 `rayon`, 并行地统计权重不低于 `threshold` 的 patch 个数.
    pub fn par_count_weight_at_least(&self, threshold: f64) -> RoiResult<usize> {
        let (plan, mask) = self.configured()?;
        let shape = mask.shape();
        Ok(plan
            .lattice
            .points()
            .par_iter()
            .filter(|center| plan.weight(center, shape) >= threshold)
            .count())
    }
}
