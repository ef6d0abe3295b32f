//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Extent, GridAttr, LabelImage, LabelVolume};

pub use crate::{generate_lattice, Lattice, Unit};

pub use crate::{PatchShape, Phase, RoiConfig, RoiExtractor};

pub use crate::{RoiError, RoiResult};

pub use crate::consts::label::{BACKGROUND, ENABLED};
