//! Differential-geometry terrain operators: slope, aspect, curvature, and the stream-power and
//! wetness composite indices built from them, all computed directly from a DEM
//! [`crate::structures::Raster2D`].

mod curvature;
mod indices;
mod slope_aspect;

pub use curvature::{plan_curvature, profile_curvature, total_curvature};
pub use indices::{stream_power_index, wetness_index};
pub use slope_aspect::{aspect, slope, SlopeUnits};
