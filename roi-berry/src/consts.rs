//! 通用常量.

/// 单通道标签值.
pub mod label {
    /// 背景体素的标签值.
    pub const BACKGROUND: u8 = 0;

    /// patch 中被启用 (激活) 的体素的标签值.
    pub const ENABLED: u8 = 1;
}

/// 只有前三个轴拥有物理意义上的半径. 更高的轴 (时间, 通道等) 按单位厚度处理.
pub const SPATIAL_AXES: usize = 3;

/// 高维轴 (索引 >= [`SPATIAL_AXES`]) 上被钳制的邻域半径.
pub const HIGHER_AXIS_RADIUS: usize = 1;

/// 环境变量名, 供 [`crate::RoiConfig::from_env_or_default`] 使用.
pub mod env {
    /// 邻域半径.
    pub const RADIUS: &str = "ROI_RADIUS";

    /// 格点步长.
    pub const STEP: &str = "ROI_STEP";

    /// 步长与半径的单位, `voxel` 或 `mm`.
    pub const UNIT: &str = "ROI_UNIT";

    /// 邻域形状, `box`, `cross` 或 `ellipsoid`.
    pub const SHAPE: &str = "ROI_SHAPE";
}
