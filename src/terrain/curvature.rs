use crate::config::Config;
use crate::structures::Raster2D;
use rayon::prelude::*;

const TERRAIN_NODATA: f64 = -32768.0;

/// Gathers the 3x3 elevation window around `(x, y)`, replicating the center elevation into any
/// off-grid or nodata neighbor, and the average of the raster's x/y cell size (Zevenbergen &
/// Thorne's derivation assumes a single square cell size `L`).
fn zt_window(dem: &Raster2D<f64>, x: isize, y: isize) -> Option<([f64; 9], f64)> {
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
    let window = [
        zv(-1, -1),
        zv(0, -1),
        zv(1, -1),
        zv(-1, 0),
        z,
        zv(1, 0),
        zv(-1, 1),
        zv(0, 1),
        zv(1, 1),
    ];
    let l = (dem.cell_size_x + dem.cell_size_y) / 2.0;
    Some((window, l))
}

/// The D, E, F, G, H coefficients of Zevenbergen & Thorne's (1987) quadratic surface fit.
fn zt_terms(window: &[f64; 9], l: f64) -> (f64, f64, f64, f64, f64) {
    let (z1, z2, z3, z4, z5, z6, z7, z8, z9) = (
        window[0], window[1], window[2], window[3], window[4], window[5], window[6], window[7],
        window[8],
    );
    let d = ((z4 + z6) / 2.0 - z5) / (l * l);
    let e = ((z2 + z8) / 2.0 - z5) / (l * l);
    let f = (-z1 + z3 + z7 - z9) / (4.0 * l * l);
    let g = (-z4 + z6) / (2.0 * l);
    let h = (z2 - z8) / (2.0 * l);
    (d, e, f, g, h)
}

fn row_parallel(
    dem: &Raster2D<f64>,
    config: &Config,
    cell_fn: impl Fn(f64, f64, f64, f64, f64) -> f64 + Sync,
) -> Raster2D<f64> {
    if dem.cell_size_x != dem.cell_size_y {
        eprintln!(
            "warning: cell_size_x ({}) != cell_size_y ({}); curvature assumes a single square \
             cell size and will use their average",
            dem.cell_size_x, dem.cell_size_y
        );
    }
    let mut out: Raster2D<f64> = Raster2D::resize_like(dem, TERRAIN_NODATA, TERRAIN_NODATA);
    let pool = config.thread_pool();
    let rows_data: Vec<Vec<f64>> = pool.install(|| {
        (0..dem.height)
            .into_par_iter()
            .map(|y| {
                let mut row = vec![TERRAIN_NODATA; dem.width as usize];
                for x in 0..dem.width {
                    if let Some((window, l)) = zt_window(dem, x, y) {
                        let (d, e, f, g, h) = zt_terms(&window, l);
                        row[x as usize] = cell_fn(d, e, f, g, h);
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

/// Total curvature, `-2(D + E)`, scaled by 100 to match WhiteboxTools' curvature tools'
/// convention of reporting curvature in units of 1/100 z-units.
pub fn total_curvature(dem: &Raster2D<f64>, config: &Config) -> Raster2D<f64> {
    row_parallel(dem, config, |d, e, _f, _g, _h| -2.0 * (d + e) * 100.0)
}

/// Profile curvature (curvature in the direction of steepest descent), scaled by 100.
/// Flat cells (`G == 0.0 && H == 0.0`) have no defined downslope direction and are reported as
/// `0.0` rather than divided by zero.
pub fn profile_curvature(dem: &Raster2D<f64>, config: &Config) -> Raster2D<f64> {
    row_parallel(dem, config, |d, e, f, g, h| {
        let denom = g * g + h * h;
        if denom == 0.0 {
            0.0
        } else {
            2.0 * (d * g * g + e * h * h + f * g * h) / denom * 100.0
        }
    })
}

/// Planform curvature (curvature perpendicular to the direction of steepest descent, i.e.
/// transverse to the flow line), scaled by 100. Flat cells report `0.0`.
pub fn plan_curvature(dem: &Raster2D<f64>, config: &Config) -> Raster2D<f64> {
    row_parallel(dem, config, |d, e, f, g, h| {
        let denom = g * g + h * h;
        if denom == 0.0 {
            0.0
        } else {
            -2.0 * (d * h * h + e * g * g - f * g * h) / denom * 100.0
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn planar_surface_has_zero_curvature_everywhere() {
        let mut dem: Raster2D<f64> = Raster2D::new(5, 5, 0.0, TERRAIN_NODATA);
        for y in 0..5 {
            for x in 0..5 {
                dem.set(x, y, 2.0 * x as f64 + 3.0 * y as f64);
            }
        }
        let total = total_curvature(&dem, &Config::default());
        let profile = profile_curvature(&dem, &Config::default());
        let plan = plan_curvature(&dem, &Config::default());
        assert!((total.get(2, 2)).abs() < 1e-9);
        assert!((profile.get(2, 2)).abs() < 1e-9);
        assert!((plan.get(2, 2)).abs() < 1e-9);
    }

    #[test]
    fn concave_bowl_has_negative_total_curvature_at_its_center() {
        // z = x^2 + y^2 sampled on a unit grid centered at (2,2): a paraboloid bowl, concave up.
        // Under this formula's sign convention a surface that is upwardly concave (a bowl, or a
        // valley) carries negative curvature; upwardly convex (a dome, or a ridge) is positive.
        let mut dem: Raster2D<f64> = Raster2D::new(5, 5, 0.0, TERRAIN_NODATA);
        for y in 0..5 {
            for x in 0..5 {
                let fx = (x - 2) as f64;
                let fy = (y - 2) as f64;
                dem.set(x, y, fx * fx + fy * fy);
            }
        }
        let total = total_curvature(&dem, &Config::default());
        assert!(total.get(2, 2) < 0.0);
    }

    #[test]
    fn nodata_cell_yields_nodata_curvature() {
        let mut dem: Raster2D<f64> = Raster2D::new(3, 3, 1.0, TERRAIN_NODATA);
        dem.set(1, 1, TERRAIN_NODATA);
        let total = total_curvature(&dem, &Config::default());
        assert_eq!(total.get(1, 1), TERRAIN_NODATA);
    }

    fn bowl_dem() -> Raster2D<f64> {
        // z = fx^2 + fy^2 on a unit-cell 5x5 grid centered at (2,2): a paraboloid bowl.
        let mut dem: Raster2D<f64> = Raster2D::new(5, 5, 0.0, TERRAIN_NODATA);
        for y in 0..5 {
            for x in 0..5 {
                let fx = (x - 2) as f64;
                let fy = (y - 2) as f64;
                dem.set(x, y, fx * fx + fy * fy);
            }
        }
        dem
    }

    #[test]
    fn profile_curvature_is_positive_off_center_on_a_bowl() {
        // at (3, 2): fx=1, fy=0 => D=1, E=1, F=0, G=2, H=0, denom=4
        // profile = 2*(D*G^2 + E*H^2 + F*G*H)/denom*100 = 2*(1*4)/4*100 = 200
        let dem = bowl_dem();
        let profile = profile_curvature(&dem, &Config::default());
        assert!((profile.get(3, 2) - 200.0).abs() < 1e-6);
    }

    #[test]
    fn plan_curvature_is_negative_off_center_on_a_bowl() {
        // at (3, 2): fx=1, fy=0 => D=1, E=1, F=0, G=2, H=0, denom=4
        // planform = -2*(D*H^2 + E*G^2 - F*G*H)/denom*100 = -2*(1*4)/4*100 = -200
        let dem = bowl_dem();
        let plan = plan_curvature(&dem, &Config::default());
        assert!((plan.get(3, 2) - (-200.0)).abs() < 1e-6);
    }
}
