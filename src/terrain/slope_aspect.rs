use crate::config::Config;
use crate::structures::Raster2D;
use rayon::prelude::*;

const TERRAIN_NODATA: f64 = -32768.0;

/// Horn's (1981) 3x3 finite-difference gradient estimator, used by both [`slope`] and
/// [`aspect`]. Missing neighbors (off-grid or nodata) are replaced by the center elevation,
/// the same edge-replication convention [`crate::structures::Raster2D::get`] already applies
/// to out-of-grid reads.
fn horn_gradient(dem: &Raster2D<f64>, x: isize, y: isize, zscale: f64) -> Option<(f64, f64)> {
    let z = dem.get(x, y);
    if dem.is_nodata(x, y) {
        return None;
    }
    let zv = |dx: isize, dy: isize| -> f64 {
        let v = dem.get(x + dx, y + dy);
        if dem.is_nodata(x + dx, y + dy) {
            z
        } else {
            v
        }
    };
    let a = zv(-1, -1);
    let b = zv(0, -1);
    let c = zv(1, -1);
    let d = zv(-1, 0);
    let f = zv(1, 0);
    let g = zv(-1, 1);
    let h = zv(0, 1);
    let i = zv(1, 1);

    let dzdx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / (8.0 * dem.cell_size_x) * zscale;
    let dzdy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / (8.0 * dem.cell_size_y) * zscale;
    Some((dzdx, dzdy))
}

fn warn_on_nonsquare_cells(dem: &Raster2D<f64>) {
    if dem.cell_size_x != dem.cell_size_y {
        eprintln!(
            "warning: cell_size_x ({}) != cell_size_y ({}); Horn's gradient assumes square \
             cells and will apply each axis' own cell size independently",
            dem.cell_size_x, dem.cell_size_y
        );
    }
}

/// Selects which of the four equivalent slope quantities a call to [`slope`] reports, the way
/// [`crate::d8::OutputType`] selects among equivalent views of the same accumulated count:
/// `slope_riserun`, and three unit conversions of it derived straight from its tangent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlopeUnits {
    /// `sqrt(dzdx^2 + dzdy^2)`, dimensionless rise/run.
    RiseRun,
    /// `100 * slope_riserun`.
    Percent,
    /// `atan(slope_riserun)`, in radians.
    Radians,
    /// `atan(slope_riserun)`, in degrees — WhiteboxTools' legacy `Slope` tool's own output unit.
    Degrees,
}

/// Computes slope at every cell using Horn's (1981) 3x3 gradient, reported in `units`.
///
/// `zscale` converts elevation units to the same units as the cell size before the gradient is
/// taken; pass `1.0` when they already agree.
pub fn slope(dem: &Raster2D<f64>, zscale: f64, units: SlopeUnits, config: &Config) -> Raster2D<f64> {
    warn_on_nonsquare_cells(dem);
    let mut out: Raster2D<f64> = Raster2D::resize_like(dem, TERRAIN_NODATA, TERRAIN_NODATA);
    let pool = config.thread_pool();
    let rows_data: Vec<Vec<f64>> = pool.install(|| {
        (0..dem.height)
            .into_par_iter()
            .map(|y| {
                let mut row = vec![TERRAIN_NODATA; dem.width as usize];
                for x in 0..dem.width {
                    if let Some((dzdx, dzdy)) = horn_gradient(dem, x, y, zscale) {
                        let riserun = dzdx.hypot(dzdy);
                        row[x as usize] = match units {
                            SlopeUnits::RiseRun => riserun,
                            SlopeUnits::Percent => 100.0 * riserun,
                            SlopeUnits::Radians => riserun.atan(),
                            SlopeUnits::Degrees => riserun.atan().to_degrees(),
                        };
                    }
                }
                row
            })
            .collect()
    });
    for (y, row) in rows_data.into_iter().enumerate() {
        out.set_row_data(y as isize, &row);
    }
    out
}

/// Computes aspect, in compass degrees (0 = north, 90 = east, clockwise), at every cell using
/// Horn's (1981) 3x3 gradient.
///
/// A flat cell (`dzdx == 0.0 && dzdy == 0.0`) has no defined downhill direction; this returns
/// `0.0` for it rather than a sentinel distinct from north, matching the plain arithmetic of the
/// branch below rather than introducing a special-cased flat value.
pub fn aspect(dem: &Raster2D<f64>, config: &Config) -> Raster2D<f64> {
    warn_on_nonsquare_cells(dem);
    let mut out: Raster2D<f64> = Raster2D::resize_like(dem, TERRAIN_NODATA, TERRAIN_NODATA);
    let pool = config.thread_pool();
    let rows_data: Vec<Vec<f64>> = pool.install(|| {
        (0..dem.height)
            .into_par_iter()
            .map(|y| {
                let mut row = vec![TERRAIN_NODATA; dem.width as usize];
                for x in 0..dem.width {
                    if let Some((dzdx, dzdy)) = horn_gradient(dem, x, y, 1.0) {
                        row[x as usize] = if dzdx == 0.0 && dzdy == 0.0 {
                            0.0
                        } else {
                            let theta = dzdy.atan2(-dzdx).to_degrees();
                            if theta < 0.0 {
                                90.0 - theta
                            } else if theta > 90.0 {
                                360.0 - theta + 90.0
                            } else {
                                90.0 - theta
                            }
                        };
                    }
                }
                row
            })
            .collect()
    });
    for (y, row) in rows_data.into_iter().enumerate() {
        out.set_row_data(y as isize, &row);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn planar_dem(width: isize, height: isize, alpha: f64, beta: f64) -> Raster2D<f64> {
        let mut dem: Raster2D<f64> = Raster2D::new(width, height, 0.0, TERRAIN_NODATA);
        for y in 0..height {
            for x in 0..width {
                dem.set(x, y, alpha * x as f64 + beta * y as f64);
            }
        }
        dem
    }

    #[test]
    fn flat_surface_has_zero_slope_and_aspect() {
        let dem = planar_dem(4, 4, 0.0, 0.0);
        let s = slope(&dem, 1.0, SlopeUnits::Degrees, &Config::default());
        let a = aspect(&dem, &Config::default());
        assert!((s.get(2, 2) - 0.0).abs() < 1e-9);
        assert!((a.get(2, 2) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn rising_to_the_east_surface_has_gradient_three_and_aspect_west() {
        // E(x, y) = 3x: dz/dx = 3, dz/dy = 0 exactly under Horn's formula.
        let dem = planar_dem(5, 5, 3.0, 0.0);
        let s = slope(&dem, 1.0, SlopeUnits::Degrees, &Config::default());
        let a = aspect(&dem, &Config::default());
        let expected_slope = 3.0f64.atan().to_degrees();
        assert!((s.get(2, 2) - expected_slope).abs() < 1e-9);
        // dzdx = 3, dzdy = 0 => theta = atan2(0, -3) = 180 deg => aspect = 360 - 180 + 90 = 270
        assert!((a.get(2, 2) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn nodata_cell_yields_nodata_slope_and_aspect() {
        let mut dem = planar_dem(3, 3, 1.0, 0.0);
        dem.set(1, 1, TERRAIN_NODATA);
        let s = slope(&dem, 1.0, SlopeUnits::Degrees, &Config::default());
        let a = aspect(&dem, &Config::default());
        assert_eq!(s.get(1, 1), TERRAIN_NODATA);
        assert_eq!(a.get(1, 1), TERRAIN_NODATA);
    }

    #[test]
    fn slope_unit_conversions_agree_with_each_other() {
        // slope_percent / slope_riserun == 100; tan(slope_radian) == slope_riserun;
        // slope_degree == slope_radian * 180 / pi — spec invariant 7.
        let dem = planar_dem(5, 5, 3.0, 4.0);
        let cfg = Config::default();
        let riserun = slope(&dem, 1.0, SlopeUnits::RiseRun, &cfg);
        let percent = slope(&dem, 1.0, SlopeUnits::Percent, &cfg);
        let radians = slope(&dem, 1.0, SlopeUnits::Radians, &cfg);
        let degrees = slope(&dem, 1.0, SlopeUnits::Degrees, &cfg);
        let rr = riserun.get(2, 2);
        assert!((percent.get(2, 2) / rr - 100.0).abs() < 1e-9);
        assert!((radians.get(2, 2).tan() - rr).abs() < 1e-9);
        assert!((degrees.get(2, 2) - radians.get(2, 2).to_degrees()).abs() < 1e-9);
    }
}
