//! 网格范围 (起始索引 + 各轴大小).

/// N 维网格的有效索引范围.
///
/// 起始索引允许为负, 所以这里使用 `isize`. 绝对索引 `p` 合法当且仅当
/// 对每个轴都有 `start[i] <= p[i] < start[i] + size[i]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Extent {
    start: Vec<isize>,
    size: Vec<usize>,
}

impl Extent {
    /// 以 `start` 为起点, `size` 为各轴大小创建范围.
    ///
    /// 两者长度不一致时 panic.
    pub fn new(start: Vec<isize>, size: Vec<usize>) -> Self {
        assert_eq!(start.len(), size.len(), "起始索引与大小的维数不一致");
        Self { start, size }
    }

    /// 以原点为起点创建范围.
    #[inline]
    pub fn from_size(size: Vec<usize>) -> Self {
        Self {
            start: vec![0; size.len()],
            size,
        }
    }

    /// 起始索引.
    #[inline]
    pub fn start(&self) -> &[isize] {
        &self.start
    }

    /// 各轴大小.
    #[inline]
    pub fn size(&self) -> &[usize] {
        &self.size
    }

    /// 维数.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.size.len()
    }

    /// 范围内的体素总数.
    #[inline]
    pub fn len(&self) -> usize {
        self.size.iter().product()
    }

    /// 范围是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 范围是否退化: 零维, 或任一轴长度为 0.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.ndim() == 0 || self.is_empty()
    }

    /// 绝对索引 `abs` 是否落在范围内. 维数不一致时返回 `false`.
    pub fn contains(&self, abs: &[isize]) -> bool {
        abs.len() == self.ndim()
            && abs
                .iter()
                .zip(self.start.iter().zip(self.size.iter()))
                .all(|(&p, (&s, &n))| p >= s && ((p - s) as usize) < n)
    }

    /// 将绝对索引转换为相对于起点的数组索引. 越界时返回 `None`.
    pub fn to_array_index(&self, abs: &[isize]) -> Option<Vec<usize>> {
        self.contains(abs).then(|| {
            abs.iter()
                .zip(self.start.iter())
                .map(|(&p, &s)| (p - s) as usize)
                .collect()
        })
    }

    /// 将数组索引转换为绝对索引. 不检查越界.
    #[inline]
    pub fn to_absolute(&self, idx: &[usize]) -> Vec<isize> {
        idx.iter()
            .zip(self.start.iter())
            .map(|(&i, &s)| s + i as isize)
            .collect()
    }
}
