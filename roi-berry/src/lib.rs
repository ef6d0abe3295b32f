#![warn(missing_docs)]
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 在 N 维标签掩膜上按固定步长生成格点, 并逐个提取以格点为中心的邻域 patch.
//!
//! 该 crate 仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 掩膜中任何非零体素都视为前景. patch 写入输出图像时使用 `T::one()`.
//! 2. 格点只沿前三个 (空间) 轴跨步. 第四个及之后的轴 (如时间, 通道) 步长恒为 1,
//!   邻域半径恒为 1.
//! 3. 所有可恢复的错误都以 [`RoiError`] 返回, 调用方可据此区分输入, 配置和状态三类问题.
//!
//! # 用法
//!
//! ```
//! use ndarray::Array3;
//! use roi_berry::prelude::*;
//!
//! let mask = LabelImage::new(Array3::<u8>::ones((4, 8, 8)));
//! let mut out = LabelImage::<u8, _>::zeros_like(&mask);
//!
//! let mut ex = RoiExtractor::new(&mask)?;
//! ex.configure(1.0, 4.0)?;
//! while ex.phase() == Phase::Iterating {
//!     out.clear();
//!     let weight = ex.populate_patch(&mut out)?;
//!     assert!(weight > 0.0 && weight <= 1.0);
//!     ex.advance()?;
//! }
//! # Ok::<(), RoiError>(())
//! ```
//!
//! # 开发计划
//!
//! ### 格点生成 ✅
//!
//! 体素与物理两种单位, 前景过滤, 行优先的确定性顺序.
//!
//! 实现位于 `roi-berry/src/lattice.rs`.
//!
//! ### patch 提取状态机 ✅
//!
//! 绑定, 配置, 迭代, 越界截断与权重计算.
//!
//! 实现位于 `roi-berry/src/roi`.
//!
//! ### 邻域形状 ✅
//!
//! 超长方体, 十字, 椭球.
//!
//! 实现位于 `roi-berry/src/roi/shape.rs`.
//!
//! ### 并发查询 ✅
//!
//! 借助 `rayon` 批量计算 patch 权重. 需要开启 `rayon` feature.
//!
//! ### 环境变量配置 ✅
//!
//! 见 [`RoiConfig::from_env_or_default`].
//!
//! ### nii 掩膜读取 ✅
//!
//! 见 [`LabelVolume::open`].

/// 标签图像与索引范围.
mod data;

pub use data::{Extent, GridAttr, LabelImage, LabelVolume};

pub mod consts;

mod error;

pub use error::RoiError;

/// 本 crate 的通用返回类型.
pub type RoiResult<T> = Result<T, RoiError>;

pub mod config;

pub use config::RoiConfig;

pub mod lattice;

pub use lattice::{generate_lattice, Lattice, Unit};

pub mod roi;

pub use roi::{PatchShape, Phase, RoiExtractor};

pub mod prelude;
