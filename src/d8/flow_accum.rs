use crate::config::Config;
use crate::d8::{DX, DY, NO_FLOW};
use crate::structures::Raster2D;
use rayon::prelude::*;
use std::sync::atomic::{AtomicI32, Ordering};

/// Selects the units the accumulated flow raster reports, matching WhiteboxTools'
/// `D8FlowAccumulation --out_type` option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputType {
    /// Raw upslope cell count (the default; a source cell has area 1).
    Cells,
    /// Cell count multiplied by `cell_size_x * cell_size_y`.
    CatchmentArea,
    /// Catchment area divided by the average cell width, `(cell_size_x + cell_size_y) / 2`.
    SpecificCatchmentArea,
}

/// Diagnostics returned alongside the accumulated-area raster.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlowAccumReport {
    /// Number of data cells whose incoming dependency count never reached zero, i.e. cells
    /// caught in a directed cycle of the input flow directions. Zero for a well-formed D8
    /// pointer raster derived from a hydrologically-corrected DEM.
    pub cycle_count: i64,
}

/// Computes a D8 upslope-area raster from a direction raster `D` using the dependency-count
/// and drain algorithm described in WhiteboxTools' `D8FlowAccumulation` tool: an atomic,
/// row-parallel dependency count (Phase 1), serial source enumeration (Phase 2), and a serial
/// stack-drain of the topological order (Phase 3).
///
/// Cells caught in a cycle are never dequeued; their area values are left at whatever partial
/// contribution arrived before the deadlock and the returned [`FlowAccumReport::cycle_count`]
/// reports how many such cells were found. This is a diagnostic, never a fatal error.
pub fn flow_accumulate(
    direction: &Raster2D<i8>,
    output_type: OutputType,
    log_transform: bool,
    config: &Config,
) -> (Raster2D<f64>, FlowAccumReport) {
    let rows = direction.height;
    let columns = direction.width;
    let nodata = direction.nodata();

    let dependency: Vec<AtomicI32> = (0..(rows * columns).max(0))
        .map(|_| AtomicI32::new(0))
        .collect();

    let pool = config.thread_pool();
    let area_rows: Vec<Vec<f64>> = pool.install(|| {
        (0..rows)
            .into_par_iter()
            .map(|y| {
                let mut row = vec![0.0f64; columns as usize];
                for x in 0..columns {
                    let d = direction.get(x, y);
                    if d == nodata {
                        row[x as usize] = -1.0;
                        continue;
                    }
                    if d == NO_FLOW {
                        continue;
                    }
                    let nx = x + DX[d as usize];
                    let ny = y + DY[d as usize];
                    if direction.in_grid(nx, ny) {
                        let idx = (ny * columns + nx) as usize;
                        dependency[idx].fetch_add(1, Ordering::Relaxed);
                    }
                }
                row
            })
            .collect()
    });

    let mut area: Raster2D<f64> = Raster2D::resize_like(direction, 0.0, -1.0);
    for (y, row) in area_rows.into_iter().enumerate() {
        area.set_row_data(y as isize, &row);
    }

    let mut dependency: Vec<i32> = dependency.into_iter().map(|a| a.into_inner()).collect();

    let mut stack: Vec<(isize, isize)> = Vec::with_capacity((rows * columns).max(0) as usize);
    for y in 0..rows {
        for x in 0..columns {
            let idx = (y * columns + x) as usize;
            if direction.get(x, y) != nodata && dependency[idx] == 0 {
                stack.push((x, y));
            }
        }
    }

    while let Some((x, y)) = stack.pop() {
        area.increment(x, y, 1.0);
        let fa = area.get(x, y);
        let idx = (y * columns + x) as usize;
        dependency[idx] -= 1;

        let dir = direction.get(x, y);
        if dir == NO_FLOW {
            continue;
        }
        let nx = x + DX[dir as usize];
        let ny = y + DY[dir as usize];
        if !direction.in_grid(nx, ny) || direction.get(nx, ny) == nodata {
            continue;
        }
        area.increment(nx, ny, fa);
        let nidx = (ny * columns + nx) as usize;
        dependency[nidx] -= 1;
        if dependency[nidx] == 0 {
            stack.push((nx, ny));
        }
    }

    let mut cycle_count = 0i64;
    for y in 0..rows {
        for x in 0..columns {
            if direction.get(x, y) != nodata && dependency[(y * columns + x) as usize] > 0 {
                cycle_count += 1;
            }
        }
    }

    if config.verbose {
        println!("D8 flow accumulation: {cycle_count} cell(s) caught in a cycle");
    }

    if output_type != OutputType::Cells || log_transform {
        let cell_area = direction.cell_size_x * direction.cell_size_y;
        let avg_cell_size = (direction.cell_size_x + direction.cell_size_y) / 2.0;
        for y in 0..rows {
            for x in 0..columns {
                let v = area.get(x, y);
                if v == area.nodata() {
                    continue;
                }
                let mut scaled = v;
                match output_type {
                    OutputType::Cells => {}
                    OutputType::CatchmentArea => scaled *= cell_area,
                    OutputType::SpecificCatchmentArea => scaled = scaled * cell_area / avg_cell_size,
                }
                if log_transform {
                    scaled = scaled.ln();
                }
                area.set(x, y, scaled);
            }
        }
    }

    (area, FlowAccumReport { cycle_count })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::d8::NO_FLOW;

    const EAST: i8 = 1;
    const WEST: i8 = 5;
    const SE: i8 = 2;
    const SW: i8 = 4;
    const NE: i8 = 8;
    const NW: i8 = 6;

    #[test]
    fn single_chain() {
        let mut dir: Raster2D<i8> = Raster2D::new(5, 1, NO_FLOW, -2);
        dir.set(0, 0, EAST);
        dir.set(1, 0, EAST);
        dir.set(2, 0, EAST);
        dir.set(3, 0, EAST);
        dir.set(4, 0, NO_FLOW);
        let (area, report) = flow_accumulate(&dir, OutputType::Cells, false, &Config::default());
        assert_eq!(report.cycle_count, 0);
        for x in 0..5 {
            assert_eq!(area.get(x, 0), (x + 1) as f64);
        }
    }

    #[test]
    fn fork_to_center() {
        let mut dir: Raster2D<i8> = Raster2D::new(3, 3, NO_FLOW, -2);
        dir.set(0, 0, SE);
        dir.set(2, 0, SW);
        dir.set(0, 2, NE);
        dir.set(2, 2, NW);
        dir.set(1, 1, NO_FLOW);
        let (area, report) = flow_accumulate(&dir, OutputType::Cells, false, &Config::default());
        assert_eq!(report.cycle_count, 0);
        assert_eq!(area.get(1, 1), 5.0);
        assert_eq!(area.get(0, 0), 1.0);
        assert_eq!(area.get(2, 0), 1.0);
        assert_eq!(area.get(0, 2), 1.0);
        assert_eq!(area.get(2, 2), 1.0);
        // non-participating edge midpoints: self-count only
        assert_eq!(area.get(1, 0), 1.0);
        assert_eq!(area.get(0, 1), 1.0);
    }

    #[test]
    fn cycle_of_two_is_detected_and_left_unprocessed() {
        let mut dir: Raster2D<i8> = Raster2D::new(2, 1, NO_FLOW, -2);
        dir.set(0, 0, EAST);
        dir.set(1, 0, WEST);
        let (_area, report) = flow_accumulate(&dir, OutputType::Cells, false, &Config::default());
        assert_eq!(report.cycle_count, 2);
    }

    #[test]
    fn nodata_hole_propagates_without_crash() {
        let mut dir: Raster2D<i8> = Raster2D::new(5, 5, NO_FLOW, -2);
        for y in 0..5 {
            for x in 0..5 {
                dir.set(x, y, EAST);
            }
        }
        dir.set(4, 2, NO_FLOW);
        dir.set(2, 2, -2); // nodata hole
        let (area, _report) = flow_accumulate(&dir, OutputType::Cells, false, &Config::default());
        assert_eq!(area.get(2, 2), -1.0);
        // the cell immediately east of the hole starts its own chain: its would-be inflow from
        // the hole never arrives because the hole is nodata, not a valid upstream accumulator
        assert_eq!(area.get(3, 2), 1.0);
        // the cell immediately west of the hole still receives its own row's inflow normally;
        // only the hole itself blocks further propagation eastward
        assert_eq!(area.get(1, 2), 2.0);
    }

    #[test]
    fn catchment_area_output_scales_by_cell_area() {
        let mut dir: Raster2D<i8> = Raster2D::new(2, 1, NO_FLOW, -2);
        dir.cell_size_x = 2.0;
        dir.cell_size_y = 2.0;
        dir.set(0, 0, EAST);
        dir.set(1, 0, NO_FLOW);
        let (area, _) = flow_accumulate(&dir, OutputType::CatchmentArea, false, &Config::default());
        assert_eq!(area.get(0, 0), 4.0); // 1 cell * 4 area
        assert_eq!(area.get(1, 0), 8.0); // 2 cells * 4 area
    }
}
