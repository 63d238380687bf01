// src/visualisation.rs

use crate::scalar_field::ScalarField3D;
use plotters::prelude::*;
use std::path::Path;

/// Map a kernel value to blue–white–red on a scale symmetric about zero,
/// so the sign of every cell is readable at a glance.
///
/// -limit maps to blue, 0 to white, +limit to red.
fn value_to_color(v: f64, limit: f64) -> RGBColor {
    let limit = if limit.is_finite() && limit > 0.0 { limit } else { 1.0 };
    let x = (0.5 + 0.5 * v / limit).clamp(0.0, 1.0);

    let r = (255.0 * (2.0 * x).min(1.0)) as u8;
    let b = (255.0 * (2.0 * (1.0 - x)).min(1.0)) as u8;
    let g = (255.0 * (1.0 - (2.0 * (x - 0.5).abs()))).clamp(0.0, 255.0) as u8;

    RGBColor(r, g, b)
}

/// Save slice `iz` of a kernel component as a PNG heat map.
///
/// The wrapped storage order is shifted so that zero displacement sits in the
/// middle of the image. Cells are square pixels blocks, x to the right, y up.
pub fn save_kernel_slice_plot(
    field: &ScalarField3D,
    iz: usize,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let [nx, ny, nz] = field.size;
    if iz >= nz {
        return Err(format!("slice {} out of range (nz = {})", iz, nz).into());
    }

    let mut limit = 0.0_f64;
    for iy in 0..ny {
        for ix in 0..nx {
            let v = field.get(ix, iy, iz);
            if v.is_finite() {
                limit = limit.max(v.abs());
            }
        }
    }

    let px = 800u32;
    let root = BitMapBackend::new(path, (px, px)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(0..nx as i32, 0..ny as i32)?;

    chart.draw_series((0..nx).flat_map(|i| {
        (0..ny).map(move |j| {
            let ix = (i + nx / 2) % nx;
            let iy = (j + ny / 2) % ny;
            let color = value_to_color(field.get(ix, iy, iz), limit);
            let (i, j) = (i as i32, j as i32);
            Rectangle::new([(i, j), (i + 1, j + 1)], color.filled())
        })
    }))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colour_scale_is_centred_on_zero() {
        assert_eq!(value_to_color(0.0, 2.0), RGBColor(255, 255, 255));
        assert_eq!(value_to_color(-2.0, 2.0), RGBColor(0, 0, 255));
        assert_eq!(value_to_color(5.0, 2.0), RGBColor(255, 0, 0));
        // degenerate limit falls back to unit scale
        assert_eq!(value_to_color(0.0, 0.0), RGBColor(255, 255, 255));
    }
}
