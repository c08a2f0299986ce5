use crate::config::Config;
use crate::d8::{D8_INVERSE, DX, DY};
use crate::structures::Raster2D;
use std::collections::VecDeque;
use std::io::{Error, ErrorKind};

const UPSLOPE_NODATA: i8 = -1;
const LINE: i8 = 2;
const UPSLOPE: i8 = 1;

/// Rasterizes the straight segment from `(x0, y0)` to `(x1, y1)` onto integer grid cells,
/// marking every touched cell [`LINE`], using the step-accumulator form of Bresenham's
/// algorithm described in the spec.
///
/// A vertical segment (`x0 == x1`) is handled as an explicit special case: the error-term
/// algebra below is parameterized by a `dy/dx` slope, which a vertical segment has none of, so
/// the column is marched directly rather than trusted to fall out of dividing by a zero `dx`.
fn rasterize_line(
    upslope: &mut Raster2D<i8>,
    queue: &mut VecDeque<(isize, isize)>,
    x0: isize,
    y0: isize,
    x1: isize,
    y1: isize,
) {
    let mut mark = |x: isize, y: isize| {
        if upslope.in_grid(x, y) {
            upslope.set(x, y, LINE);
            queue.push_back((x, y));
        }
    };

    if x0 == x1 {
        let (lo, hi) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        for y in lo..=hi {
            mark(x0, y);
        }
        return;
    }

    // normalize so x0 <= x1, swapping both endpoints together
    let (x0, y0, x1, y1) = if x0 <= x1 { (x0, y0, x1, y1) } else { (x1, y1, x0, y0) };
    let dx = (x1 - x0) as f64;
    let dy = (y1 - y0) as f64;
    let step = dy.abs() / dx;
    let sy: isize = if dy >= 0.0 { 1 } else { -1 };

    let mut err = 0.0f64;
    let mut y = y0;
    for x in x0..=x1 {
        mark(x, y);
        err += step;
        if err >= 0.5 {
            mark(x + 1, y);
            y += sy;
            err -= 1.0;
        }
    }
}

fn seed_cell(
    direction: &Raster2D<i8>,
    upslope: &mut Raster2D<i8>,
    queue: &mut VecDeque<(isize, isize)>,
    x: isize,
    y: isize,
) {
    if !direction.in_grid(x, y) || direction.is_nodata(x, y) {
        return;
    }
    if upslope.get(x, y) == UPSLOPE_NODATA {
        upslope.set(x, y, UPSLOPE);
        queue.push_back((x, y));
    }
}

/// Marks every cell that drains, directly or transitively, into the polyline described by
/// `line_vertices` (grid column/row pairs; consecutive vertices are connected by a rasterized
/// straight segment).
///
/// The returned raster uses `2` for a cell on the initializing line, `1` for a cell upslope of
/// it, and nodata (`-1`) everywhere else, including cells nodata in `direction` itself. Every
/// vertex must be in-grid; an out-of-grid vertex is a usage error rather than a silently
/// ignored seed.
///
/// Cells are discovered by a backward breadth-first search seeded at the line: a neighbor is
/// enqueued only the first time it is found to flow into an already-marked cell (the "still
/// nodata" check in [`seed_cell`]), which is what makes repeated traces from the same line
/// idempotent rather than requeuing already-marked cells forever.
///
/// Grounded in the same `inflowing` neighbor check WhiteboxTools' own
/// `downslope_distance_to_stream` tool uses, run backward from a target raster instead of
/// forward from a stream network.
pub fn trace_upslope(
    direction: &Raster2D<i8>,
    line_vertices: &[(isize, isize)],
    config: &Config,
) -> Result<Raster2D<i8>, Error> {
    for &(x, y) in line_vertices {
        if !direction.in_grid(x, y) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("upslope trace endpoint ({x}, {y}) is out of grid"),
            ));
        }
    }

    let mut upslope: Raster2D<i8> = Raster2D::resize_like(direction, UPSLOPE_NODATA, UPSLOPE_NODATA);
    let mut queue: VecDeque<(isize, isize)> = VecDeque::new();

    if line_vertices.len() == 1 {
        let (x, y) = line_vertices[0];
        upslope.set(x, y, LINE);
        queue.push_back((x, y));
    }
    for pair in line_vertices.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        rasterize_line(&mut upslope, &mut queue, x0, y0, x1, y1);
    }

    if config.verbose {
        println!("upslope trace: {} seed cell(s) on the source line", queue.len());
    }

    while let Some((x, y)) = queue.pop_front() {
        for d in 1..=8i8 {
            let nx = x + DX[d as usize];
            let ny = y + DY[d as usize];
            if !direction.in_grid(nx, ny) || direction.is_nodata(nx, ny) {
                continue;
            }
            // the neighbor flows into (x, y) iff its own direction is the inverse of the
            // direction we stepped to reach it
            if direction.get(nx, ny) != D8_INVERSE[d as usize] {
                continue;
            }
            seed_cell(direction, &mut upslope, &mut queue, nx, ny);
        }
    }

    Ok(upslope)
}
