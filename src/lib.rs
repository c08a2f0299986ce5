//! Core D8 flow-routing and terrain differential-geometry algorithms for digital elevation
//! models: flow direction, flow accumulation, upslope tracing, slope/aspect/curvature, and the
//! stream-power and wetness composite indices built on top of them.
//!
//! This crate owns none of the surrounding raster I/O, CLI, or GUI layers; a caller loads a DEM
//! into a [`structures::Raster2D`] and writes results back out itself.

pub mod config;
pub mod d8;
pub mod structures;
pub mod terrain;

pub use config::Config;
pub use structures::Raster2D;
