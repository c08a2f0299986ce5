use crate::config::Config;
use crate::d8::{DX, DY, NO_FLOW};
use crate::structures::Raster2D;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// Diagnostics returned alongside a derived D8 pointer raster.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlowDirectionReport {
    /// True if at least one data cell, none of whose neighbors are nodata, has no downslope
    /// neighbor. Such a cell is a spurious depression a hydrologically-corrected DEM should
    /// not contain; this is a diagnostic, not a failure.
    pub interior_pit_found: bool,
}

/// Derives a D8 flow-direction raster from an elevation raster by steepest descent, following
/// the same per-cell direction-selection loop as WhiteboxTools' `D8FlowAccumulation` tool when
/// given a DEM rather than a precomputed pointer.
///
/// `zscale` multiplies every elevation before slope is computed (for unit mismatches between
/// the horizontal and vertical axes); pass `1.0` when the units already agree.
pub fn compute_d8_pointer(
    dem: &Raster2D<f64>,
    zscale: f64,
    config: &Config,
) -> (Raster2D<i8>, FlowDirectionReport) {
    let rows = dem.height;
    let columns = dem.width;
    let nodata = dem.nodata();
    let cell_size_x = dem.cell_size_x;
    let cell_size_y = dem.cell_size_y;
    let diag_cell_size = (cell_size_x * cell_size_x + cell_size_y * cell_size_y).sqrt();
    // Grid length traversed stepping in direction d, d = 1..8 (E, SE, S, SW, W, NW, N, NE).
    let grid_lengths = [
        0.0,
        cell_size_x,
        diag_cell_size,
        cell_size_y,
        diag_cell_size,
        cell_size_x,
        diag_cell_size,
        cell_size_y,
        diag_cell_size,
    ];

    let mut pointer: Raster2D<i8> = Raster2D::new(columns, rows, -2, -2);
    let interior_pit_found = AtomicBool::new(false);

    let pool = config.thread_pool();
    let rows_data: Vec<Vec<i8>> = pool.install(|| {
        (0..rows)
            .into_par_iter()
            .map(|row| {
                let mut data = vec![-2i8; columns as usize];
                for col in 0..columns {
                    let z = dem.get(col, row);
                    if z == nodata {
                        continue;
                    }
                    let mut dir = NO_FLOW;
                    let mut max_slope = f64::MIN;
                    let mut neighbouring_nodata = false;
                    for d in 1..=8i8 {
                        let zn = dem.get(col + DX[d as usize], row + DY[d as usize]);
                        if zn != nodata {
                            let slope = (z - zn) * zscale / grid_lengths[d as usize];
                            if slope > max_slope && slope > 0.0 {
                                max_slope = slope;
                                dir = d;
                            }
                        } else {
                            neighbouring_nodata = true;
                        }
                    }
                    if max_slope <= f64::MIN {
                        // no positive-slope neighbor found: this cell is a sink
                        dir = NO_FLOW;
                        if !neighbouring_nodata {
                            interior_pit_found.store(true, Ordering::Relaxed);
                        }
                    }
                    data[col as usize] = dir;
                }
                data
            })
            .collect()
    });

    for (row, data) in rows_data.into_iter().enumerate() {
        pointer.set_row_data(row as isize, &data);
    }

    let interior_pit_found = interior_pit_found.load(Ordering::Relaxed);
    if config.verbose {
        println!("D8 flow direction: interior pit cell(s) found: {interior_pit_found}");
    }

    (pointer, FlowDirectionReport { interior_pit_found })
}

#[cfg(test)]
mod test {
    use super::*;

    fn planar_dem(width: isize, height: isize, alpha: f64, beta: f64) -> Raster2D<f64> {
        let mut dem: Raster2D<f64> = Raster2D::new(width, height, 0.0, -32768.0);
        for y in 0..height {
            for x in 0..width {
                dem.set(x, y, alpha * x as f64 + beta * y as f64);
            }
        }
        dem
    }

    #[test]
    fn planar_rising_to_the_east_flows_west() {
        let dem = planar_dem(5, 5, 3.0, 0.0);
        let (pointer, report) = compute_d8_pointer(&dem, 1.0, &Config::default());
        assert!(!report.interior_pit_found);
        // elevation increases with x, so steepest descent from any interior cell is west (5)
        for y in 1..4 {
            assert_eq!(pointer.get(2, y), 5);
        }
    }

    #[test]
    fn flat_surface_has_no_flow_everywhere() {
        let dem = planar_dem(4, 4, 0.0, 0.0);
        let (pointer, report) = compute_d8_pointer(&dem, 1.0, &Config::default());
        assert!(!report.interior_pit_found);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(pointer.get(x, y), NO_FLOW);
            }
        }
    }

    #[test]
    fn single_pit_surrounded_by_data_is_flagged() {
        // a 3x3 bowl: center is lower than every neighbor
        let mut dem: Raster2D<f64> = Raster2D::new(3, 3, 10.0, -32768.0);
        dem.set(1, 1, 0.0);
        let (_pointer, report) = compute_d8_pointer(&dem, 1.0, &Config::default());
        assert!(report.interior_pit_found);
    }
}
