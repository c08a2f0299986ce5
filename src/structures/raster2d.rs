//////////////////////////////////////////////////////////
// A generic, dense, in-memory 2-D raster data structure //
//////////////////////////////////////////////////////////

use std::ops::{AddAssign, Index, IndexMut, SubAssign};

/// A dense rectangular grid of values addressed by `(x, y)` with `x` in `[0, width)` and
/// `y` in `[0, height)`. Every cell is either a data cell or equal to `nodata` exactly.
///
/// `get`/`set` treat the grid as infinite: reads outside the grid return `nodata` and writes
/// outside the grid are silently dropped, so hot loops that sample a 3x3 or larger neighborhood
/// near an edge never need a separate bounds branch.
///
/// Example:
///
/// ```
/// use demflow::structures::Raster2D;
/// let mut r: Raster2D<f64> = Raster2D::new(500, 100, 0f64, -999f64);
/// let cell_val = r.get(50, 10);
/// r.set(50, 10, 1f64);
/// ```
#[derive(Clone, Debug)]
pub struct Raster2D<T: Copy + PartialEq + AddAssign + SubAssign> {
    pub width: isize,
    pub height: isize,
    data: Vec<T>,
    nodata: T,
    pub cell_size_x: f64,
    pub cell_size_y: f64,
}

impl<T> Raster2D<T>
where
    T: Copy + PartialEq + AddAssign + SubAssign,
{
    /// Allocates a `width x height` raster filled with `initial_value`, using unit cell
    /// dimensions. Use [`Raster2D::resize_like`] to adopt another raster's cell dimensions.
    pub fn new(width: isize, height: isize, initial_value: T, nodata: T) -> Raster2D<T> {
        Raster2D {
            width,
            height,
            nodata,
            data: vec![initial_value; (width.max(0) * height.max(0)) as usize],
            cell_size_x: 1.0,
            cell_size_y: 1.0,
        }
    }

    /// Allocates a raster with the same width, height, and cell dimensions as `template`,
    /// filled with `fill`. Mirrors `Raster::initialize_using_file` adopting a template's
    /// `RasterConfigs`.
    pub fn resize_like<U>(template: &Raster2D<U>, fill: T, nodata: T) -> Raster2D<T>
    where
        U: Copy + PartialEq + AddAssign + SubAssign,
    {
        Raster2D {
            width: template.width,
            height: template.height,
            nodata,
            data: vec![fill; (template.width.max(0) * template.height.max(0)) as usize],
            cell_size_x: template.cell_size_x,
            cell_size_y: template.cell_size_y,
        }
    }

    #[inline]
    pub fn in_grid(&self, x: isize, y: isize) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    #[inline]
    pub fn get(&self, x: isize, y: isize) -> T {
        if self.in_grid(x, y) {
            self.data[(y * self.width + x) as usize]
        } else {
            self.nodata
        }
    }

    #[inline]
    pub fn set(&mut self, x: isize, y: isize, value: T) {
        if self.in_grid(x, y) {
            let idx = (y * self.width + x) as usize;
            self.data[idx] = value;
        }
    }

    #[inline]
    pub fn is_nodata(&self, x: isize, y: isize) -> bool {
        self.get(x, y) == self.nodata
    }

    /// Nodata-aware accumulate: writing into a nodata cell replaces rather than adds to it,
    /// mirroring `Raster::increment`/`decrement` priming an output raster from a nodata fill.
    #[inline]
    pub fn increment(&mut self, x: isize, y: isize, value: T) {
        if self.in_grid(x, y) {
            let idx = (y * self.width + x) as usize;
            if self.data[idx] != self.nodata {
                self.data[idx] += value;
            } else {
                self.data[idx] = value;
            }
        }
    }

    #[inline]
    pub fn decrement(&mut self, x: isize, y: isize, value: T) {
        if self.in_grid(x, y) {
            let idx = (y * self.width + x) as usize;
            if self.data[idx] != self.nodata {
                self.data[idx] -= value;
            } else {
                self.data[idx] = value;
            }
        }
    }

    pub fn nodata(&self) -> T {
        self.nodata
    }

    pub fn set_nodata(&mut self, v: T) {
        self.nodata = v;
    }

    /// Total number of cells, `width * height`.
    pub fn size(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Number of cells equal to `v`.
    pub fn count_val(&self, v: T) -> i64 {
        self.data.iter().filter(|&&x| x == v).count() as i64
    }

    /// Number of cells whose value is not `nodata`.
    pub fn num_data_cells(&self) -> i64 {
        self.size() - self.count_val(self.nodata)
    }

    pub fn set_row_data(&mut self, row: isize, values: &[T]) {
        if row < 0 || row >= self.height {
            return;
        }
        let start = (row * self.width) as usize;
        let n = values.len().min(self.width as usize);
        self.data[start..start + n].copy_from_slice(&values[..n]);
    }

    pub fn reinitialize_values(&mut self, value: T) {
        self.data.iter_mut().for_each(|c| *c = value);
    }
}

impl<T: Copy + PartialEq + AddAssign + SubAssign> Index<(isize, isize)> for Raster2D<T> {
    type Output = T;

    fn index(&self, index: (isize, isize)) -> &T {
        let (x, y) = index;
        if self.in_grid(x, y) {
            &self.data[(y * self.width + x) as usize]
        } else {
            &self.nodata
        }
    }
}

impl<T: Copy + PartialEq + AddAssign + SubAssign> IndexMut<(isize, isize)> for Raster2D<T> {
    fn index_mut(&mut self, index: (isize, isize)) -> &mut T {
        let (x, y) = index;
        if self.in_grid(x, y) {
            let idx = (y * self.width + x) as usize;
            &mut self.data[idx]
        } else {
            // An out-of-grid write target has nowhere sane to go; reuse the nodata slot itself
            // so callers never panic on an edge-adjacent neighbor lookup in a 3x3 stencil.
            &mut self.nodata
        }
    }
}
