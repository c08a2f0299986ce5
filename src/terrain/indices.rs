use crate::config::Config;
use crate::structures::Raster2D;
use rayon::prelude::*;
use std::io::{Error, ErrorKind};

const TERRAIN_NODATA: f64 = -1.0;

/// Combines an accumulation raster and a percent-slope raster of matching extent cell by cell
/// with `op`, treating a nodata cell in either input as nodata in the output. Both inputs must
/// share a shape; a mismatch is a usage error, matching WhiteboxTools' own `sca.configs.rows !=
/// slope.configs.rows` shape guard in `relative_stream_power_index.rs`/`wetness_index.rs`.
fn combine(
    accumulation: &Raster2D<f64>,
    percent_slope: &Raster2D<f64>,
    config: &Config,
    op: impl Fn(f64, f64) -> f64 + Sync,
) -> Result<Raster2D<f64>, Error> {
    if accumulation.width != percent_slope.width || accumulation.height != percent_slope.height {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "accumulation and slope rasters must share the same shape",
        ));
    }

    let cell_area = accumulation.cell_size_x * accumulation.cell_size_y;
    let mut out: Raster2D<f64> = Raster2D::resize_like(accumulation, TERRAIN_NODATA, TERRAIN_NODATA);
    let pool = config.thread_pool();
    let rows_data: Vec<Vec<f64>> = pool.install(|| {
        (0..accumulation.height)
            .into_par_iter()
            .map(|y| {
                let mut row = vec![TERRAIN_NODATA; accumulation.width as usize];
                for x in 0..accumulation.width {
                    if accumulation.is_nodata(x, y) || percent_slope.is_nodata(x, y) {
                        continue;
                    }
                    let specific_area = accumulation.get(x, y) / cell_area;
                    row[x as usize] = op(specific_area, percent_slope.get(x, y));
                }
                row
            })
            .collect()
    });
    for (y, row) in rows_data.into_iter().enumerate() {
        out.set_row_data(y as isize, &row);
    }
    Ok(out)
}

/// Stream Power Index: `ln((A/cell_area) * (S + 0.001))`, where `A` is a flow-accumulation
/// raster in `Cells` or `CatchmentArea` units (not log-transformed) and `S` is percent slope.
/// The `+ 0.001` offset keeps a zero-slope cell from taking the index to `-inf`, mirroring
/// WhiteboxTools' `RelativeStreamPowerIndex` tool in spirit while combining accumulation and
/// slope directly rather than re-deriving a specific catchment area raster from a DEM and
/// pointer.
pub fn stream_power_index(
    accumulation: &Raster2D<f64>,
    percent_slope: &Raster2D<f64>,
    config: &Config,
) -> Result<Raster2D<f64>, Error> {
    combine(accumulation, percent_slope, config, |specific_area, slope| {
        (specific_area * (slope + 0.001)).ln()
    })
}

/// Compound Topographic (Wetness) Index: `ln((A/cell_area) / (S + 0.001))`.
pub fn wetness_index(
    accumulation: &Raster2D<f64>,
    percent_slope: &Raster2D<f64>,
    config: &Config,
) -> Result<Raster2D<f64>, Error> {
    combine(accumulation, percent_slope, config, |specific_area, slope| {
        (specific_area / (slope + 0.001)).ln()
    })
}
