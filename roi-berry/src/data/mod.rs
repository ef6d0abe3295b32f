use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array, ArrayView, ArrayViewMut, Dimension, Ix3, NdIndex};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use num::Zero;

use crate::{RoiError, RoiResult};

mod extent;

pub use extent::Extent;

/// 体素网格的共用几何属性和部分通用操作.
pub trait GridAttr {
    /// 各轴大小 (数组形状).
    fn shape(&self) -> &[usize];

    /// 网格起始索引.
    fn start(&self) -> &[isize];

    /// 各轴体素分辨率 (物理单位, 一般为毫米).
    fn spacing(&self) -> &[f64];

    /// 获取网格的有效索引范围.
    #[inline]
    fn extent(&self) -> Extent {
        Extent::new(self.start().to_vec(), self.shape().to_vec())
    }

    /// 维数.
    #[inline]
    fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// 体素个数.
    #[inline]
    fn size(&self) -> usize {
        self.shape().iter().product()
    }

    /// 网格是否退化 (零维或存在长度为 0 的轴).
    #[inline]
    fn is_degenerate(&self) -> bool {
        self.ndim() == 0 || self.size() == 0
    }

    /// 检查数组索引是否合法.
    #[inline]
    fn check(&self, idx: &[usize]) -> bool {
        idx.len() == self.ndim() && idx.iter().zip(self.shape()).all(|(i, n)| i < n)
    }

    /// 获取体素的实际体积值.
    #[inline]
    fn voxel(&self) -> f64 {
        self.spacing().iter().product()
    }

    /// 体素分辨率在各个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        self.spacing().windows(2).all(|w| w[0] == w[1])
    }
}

/// N 维标签图像. 非零体素即为前景.
///
/// 该结构既可作为格点生成的只读掩膜, 也可作为 patch 写入的输出图像.
/// 数组索引 `idx` 对应的绝对索引为 `start + idx`.
#[derive(Debug, Clone)]
pub struct LabelImage<T, D: Dimension> {
    data: Array<T, D>,
    start: Vec<isize>,
    spacing: Vec<f64>,
}

/// 3D `u8` 标签体.
pub type LabelVolume = LabelImage<u8, Ix3>;

impl<T, D: Dimension> GridAttr for LabelImage<T, D> {
    #[inline]
    fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    #[inline]
    fn start(&self) -> &[isize] {
        &self.start
    }

    #[inline]
    fn spacing(&self) -> &[f64] {
        &self.spacing
    }
}

impl<T, D: Dimension, I: NdIndex<D>> Index<I> for LabelImage<T, D> {
    type Output = T;

    #[inline]
    fn index(&self, index: I) -> &Self::Output {
        &self.data[index]
    }
}

impl<T, D: Dimension, I: NdIndex<D>> IndexMut<I> for LabelImage<T, D> {
    #[inline]
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl<T, D: Dimension> LabelImage<T, D> {
    /// 以原点为起始索引, 单位分辨率创建标签图像.
    pub fn new(data: Array<T, D>) -> Self {
        let ndim = data.ndim();
        Self {
            data,
            start: vec![0; ndim],
            spacing: vec![1.0; ndim],
        }
    }

    /// 指定起始索引和分辨率创建标签图像.
    ///
    /// # 返回值
    ///
    /// - `start` 或 `spacing` 的长度与维数不一致时, 返回 `Err(RoiError::InvalidInput)`;
    /// - 任一分辨率不是有限正数时, 返回 `Err(RoiError::InvalidInput)`;
    /// - 其他情况下返回 `Ok(Self)`.
    pub fn with_geometry(
        data: Array<T, D>,
        start: Vec<isize>,
        spacing: Vec<f64>,
    ) -> RoiResult<Self> {
        let ndim = data.ndim();
        if start.len() != ndim || spacing.len() != ndim {
            return Err(RoiError::InvalidInput("起始索引或分辨率的维数与数据不一致"));
        }
        if !spacing.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(RoiError::InvalidInput("分辨率必须为有限正数"));
        }
        Ok(Self {
            data,
            start,
            spacing,
        })
    }

    /// 创建与 `other` 几何信息 (形状, 起始索引, 分辨率) 完全一致的全零图像.
    /// 一般用作 patch 输出缓冲区.
    pub fn zeros_like<U>(other: &LabelImage<U, D>) -> Self
    where
        T: Clone + Zero,
    {
        Self {
            data: Array::zeros(other.data.raw_dim()),
            start: other.start.clone(),
            spacing: other.spacing.clone(),
        }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, T, D> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, T, D> {
        self.data.view_mut()
    }

    /// 取出内部数组.
    #[inline]
    pub fn into_data(self) -> Array<T, D> {
        self.data
    }

    /// 获取数组索引对应的体素. 越界时返回 `None`.
    #[inline]
    pub fn get<I: NdIndex<D>>(&self, index: I) -> Option<&T> {
        self.data.get(index)
    }

    /// 获取数组索引对应的可变体素. 越界时返回 `None`.
    #[inline]
    pub fn get_mut<I: NdIndex<D>>(&mut self, index: I) -> Option<&mut T> {
        self.data.get_mut(index)
    }
}

impl<T: Clone + Zero, D: Dimension> LabelImage<T, D> {
    /// 前景 (非零) 体素个数.
    #[inline]
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|p| !p.is_zero()).count()
    }

    /// 收集所有前景体素对应的下标, 结果按行优先存储.
    pub fn foreground_pos(&self) -> Vec<D::Pattern> {
        self.data
            .indexed_iter()
            .filter_map(|(pos, p)| (!p.is_zero()).then_some(pos))
            .collect()
    }

    /// 将全部体素重置为背景, 以便复用为下一个 patch 的输出缓冲区.
    #[inline]
    pub fn clear(&mut self) {
        self.data.fill(T::zero());
    }
}

/// 从 header 读取分辨率, 并将 (W, H, z) 转换成 (z, H, W).
#[inline]
fn spacing_from_header(h: &NiftiHeader) -> Vec<f64> {
    let [_, w, h, z, ..] = h.pixdim;
    vec![z as f64, h as f64, w as f64]
}

impl LabelVolume {
    /// 打开 nii 文件格式的 3D 标签. `path` 为 nii 文件的本地路径.
    /// 数据按 `(z, H, W)` 模式组织, 分辨率取自 header 的 `pixdim`.
    ///
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    /// 非三维体数据或分辨率非法时返回 `Err(NiftiError::InvalidFormat)`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let spacing = spacing_from_header(obj.header());

        // [W, H, z] -> [z, H, W]
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = obj.into_volume().into_ndarray::<u8>()?;
        if data.ndim() != 3 {
            return Err(nifti::NiftiError::InvalidFormat);
        }
        let data = data
            .permuted_axes([2, 1, 0].as_slice())
            .into_dimensionality::<Ix3>()
            .map_err(|_| nifti::NiftiError::InvalidFormat)?;
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().to_owned()
        };

        Self::with_geometry(data, vec![0; 3], spacing)
            .map_err(|_| nifti::NiftiError::InvalidFormat)
    }
}
