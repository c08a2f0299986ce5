mod raster2d;

pub use raster2d::Raster2D;
