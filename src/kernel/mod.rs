// src/kernel/mod.rs
//
// Magnetostatic kernel by brute-force integration of magnetic surface charges
// over the faces of the source cell, averaged over the destination cell volume.
//
// K[s][d](r) is the field component d at displacement r produced by unit
// magnetisation along s in the cell at the origin, so that, after convolution,
//   H_d = sum_s K[s][d] * M_s.
// Reciprocity makes K symmetric in (s, d); only s <= d is stored.
//
// The kernel lives on the zero-padded mesh (open axes doubled) and is indexed
// with wrapped offsets, ready for an FFT convolution. Periodic images are summed
// into the same wrapped bins.

pub mod index;
pub mod integrate;

use std::ops::RangeInclusive;
use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;

use crate::error::{KernelError, Result};
use crate::mesh::{Mesh, X, Y, Z};
use crate::scalar_field::ScalarField3D;

use index::{kernel_ranges, wrap};
use integrate::{closest_approach, integrate_cell, integration_order};

/// Accuracy the staggered integration grid was tuned for.
pub const DEFAULT_ACCURACY: f64 = 6.0;

pub const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

/// Storage slot of component (i, j) in the upper triangle, either order.
pub fn upper_slot(i: usize, j: usize) -> Result<usize> {
    if i > 2 || j > 2 {
        return Err(KernelError::IndexOutOfRange { i, j });
    }
    let (a, b) = if i <= j { (i, j) } else { (j, i) };
    // (0,0) (0,1) (0,2) (1,1) (1,2) (2,2)
    Ok(match a {
        0 => b,
        1 => 2 + b,
        _ => 5,
    })
}

/// Upper-triangular (i, j) pair stored in `slot`.
pub fn slot_pair(slot: usize) -> (usize, usize) {
    const PAIRS: [(usize, usize); 6] = [(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)];
    PAIRS[slot]
}

/// Symmetric demagnetising kernel.
///
/// Only the six upper-triangular components are stored; `component(j, i)`
/// returns the same array as `component(i, j)`. Components that vanish
/// identically for a single-layer film are absent (`None`) and read as zero.
#[derive(Debug, Clone)]
pub struct DemagKernel {
    mesh: Mesh,
    accuracy: f64,
    components: [Option<ScalarField3D>; 6],
}

impl DemagKernel {
    pub(crate) fn from_components(
        mesh: Mesh,
        accuracy: f64,
        components: [Option<ScalarField3D>; 6],
    ) -> Self {
        Self {
            mesh,
            accuracy,
            components,
        }
    }

    /// The padded mesh the component arrays are sized to.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Component (i, j); `None` if absent or out of range.
    pub fn component(&self, i: usize, j: usize) -> Option<&ScalarField3D> {
        let slot = upper_slot(i, j).ok()?;
        self.components[slot].as_ref()
    }

    pub fn is_present(&self, i: usize, j: usize) -> bool {
        self.component(i, j).is_some()
    }

    /// K[i][j] at wrapped cell (ix, iy, iz). Absent components read as zero.
    pub fn value(&self, i: usize, j: usize, ix: usize, iy: usize, iz: usize) -> Result<f64> {
        let slot = upper_slot(i, j)?;
        Ok(self.components[slot]
            .as_ref()
            .map_or(0.0, |f| f.get(ix, iy, iz)))
    }

    /// K[i][j] at a signed displacement in cells, wrapped onto the storage grid.
    pub fn value_at_offset(&self, i: usize, j: usize, offset: [isize; 3]) -> Result<f64> {
        let s = self.mesh.size;
        self.value(
            i,
            j,
            wrap(offset[X], s[X]),
            wrap(offset[Y], s[Y]),
            wrap(offset[Z], s[Z]),
        )
    }

    /// Present upper-triangular components as ((i, j), array).
    pub fn components(&self) -> impl Iterator<Item = ((usize, usize), &ScalarField3D)> {
        self.components
            .iter()
            .enumerate()
            .filter_map(|(slot, c)| c.as_ref().map(|f| (slot_pair(slot), f)))
    }
}

/// Entry checks; the padded mesh must allow an even-sized FFT.
fn check_preconditions(mesh: &Mesh, kmesh: &Mesh, accuracy: f64) -> Result<()> {
    mesh.validate()?;
    if !(accuracy > 0.0 && accuracy.is_finite()) {
        return Err(KernelError::InvalidAccuracy(accuracy));
    }
    for axis in [X, Y] {
        if kmesh.size[axis] % 2 != 0 {
            return Err(KernelError::OddKernelSize {
                axis,
                size: kmesh.size[axis],
            });
        }
    }
    if kmesh.size[Z] > 1 && kmesh.size[Z] % 2 != 0 {
        return Err(KernelError::OddKernelSize {
            axis: Z,
            size: kmesh.size[Z],
        });
    }
    // every offset is at least the smallest cell dimension away, so the
    // coincident cell needs the most integration points
    for s in 0..3 {
        integration_order(kmesh.min_cell_size(), accuracy, kmesh.cell_size, s)?;
    }
    Ok(())
}

/// (z, y) rows of destination offsets in accumulation order; each row is one
/// unit of parallel work.
pub fn offset_rows(ranges: &[RangeInclusive<isize>; 3]) -> Vec<(isize, isize)> {
    ranges[Z]
        .clone()
        .flat_map(|z| ranges[Y].clone().map(move |y| (z, y)))
        .collect()
}

/// Build the demagnetising kernel of `mesh` by brute-force integration.
///
/// `mesh` must not be zero-padded yet; padding is applied here. Larger
/// `accuracy` means smaller integration sub-cells (the sub-cell size is the
/// closest cell separation divided by `accuracy`).
pub fn brute_kernel(mesh: &Mesh, accuracy: f64) -> Result<DemagKernel> {
    let kmesh = mesh.padded();
    check_preconditions(mesh, &kmesh, accuracy)?;

    let size = kmesh.size;
    let cell = kmesh.cell_size;
    let pbc = kmesh.pbc;

    // single non-periodic layer: the x cross components are never stored
    let two_d = kmesh.is_2d();
    let mut components: [Option<ScalarField3D>; 6] = std::array::from_fn(|slot| {
        if two_d && (slot == 1 || slot == 2) {
            None
        } else {
            Some(ScalarField3D::zeros(size))
        }
    });

    let ranges = kernel_ranges(size, pbc);
    info!(
        "[demag] calculating kernel: mesh {}x{}x{} cell ({:e}, {:e}, {:e}) pbc {:?} accuracy {} (ranges: {:?}, {:?}, {:?})",
        size[X], size[Y], size[Z], cell[X], cell[Y], cell[Z], pbc, accuracy, ranges[X], ranges[Y], ranges[Z]
    );

    // smallest cell dimension is the length scale for touching cells
    let lmin = kmesh.min_cell_size();
    let t_build = Instant::now();
    let mut points = 0usize;
    let rows = offset_rows(&ranges);

    for s in 0..3 {
        debug!("[demag] source axis {}", AXIS_NAMES[s]);

        // Integrate each (z, y) row of offsets on a worker; accumulate serially
        // in z, y, x order so periodic images fold in a fixed order.
        let rows_out: Vec<Vec<([usize; 3], [f64; 3], usize)>> = rows
            .par_iter()
            .map(|&(z, y)| {
                let mut row = Vec::new();
                for x in ranges[X].clone() {
                    let offset = [x, y, z];
                    let d = closest_approach(offset, cell, lmin);
                    let order = integration_order(d, accuracy, cell, s)?;
                    let (b, n) = integrate_cell(s, offset, cell, order);
                    let at = [wrap(x, size[X]), wrap(y, size[Y]), wrap(z, size[Z])];
                    row.push((at, b, n));
                }
                Ok(row)
            })
            .collect::<Result<_>>()?;

        for (at, b, n) in rows_out.into_iter().flatten() {
            points = points.saturating_add(n);
            for d in s..3 {
                let slot = upper_slot(s, d)?;
                if let Some(field) = components[slot].as_mut() {
                    field.add(at[X], at[Y], at[Z], b[d]);
                }
            }
        }
    }

    info!(
        "[demag] kernel done in {:.3}s ({} integration points)",
        t_build.elapsed().as_secs_f64(),
        points
    );

    Ok(DemagKernel::from_components(kmesh, accuracy, components))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_slot_is_symmetric_and_checked() {
        for i in 0..3 {
            for j in 0..3 {
                let slot = upper_slot(i, j).unwrap();
                assert_eq!(slot, upper_slot(j, i).unwrap());
                assert_eq!(slot_pair(slot), (i.min(j), i.max(j)));
            }
        }
        assert!(matches!(
            upper_slot(3, 0),
            Err(KernelError::IndexOutOfRange { i: 3, j: 0 })
        ));
    }

    #[test]
    fn two_d_kernel_drops_x_cross_components() {
        let mesh = Mesh::new([4, 4, 1], [1.0, 1.0, 1.0]);
        let k = brute_kernel(&mesh, 4.0).unwrap();
        assert_eq!(k.mesh().size, [8, 8, 1]);
        assert!(!k.is_present(0, 1));
        assert!(!k.is_present(0, 2));
        assert!(!k.is_present(1, 0));
        assert!(!k.is_present(2, 0));
        for (i, j) in [(0, 0), (1, 1), (1, 2), (2, 2)] {
            let f = k.component(i, j).unwrap();
            assert_eq!(f.size, [8, 8, 1]);
        }
        assert_eq!(k.value(0, 1, 1, 1, 0).unwrap(), 0.0);
        assert_eq!(k.components().count(), 4);
    }

    #[test]
    fn accumulation_matches_direct_integration() {
        let mesh = Mesh::new([2, 2, 2], [1.0, 2.0, 0.5]);
        let k = brute_kernel(&mesh, 3.0).unwrap();
        let cell = k.mesh().cell_size;
        let lmin = k.mesh().min_cell_size();
        for offset in [[0, 0, 0], [1, 0, 0], [-1, 1, 0], [1, -1, 1]] {
            for s in 0..3 {
                let d = closest_approach(offset, cell, lmin);
                let (b, _) =
                    integrate_cell(s, offset, cell, integration_order(d, 3.0, cell, s).unwrap());
                for dd in s..3 {
                    let got = k.value_at_offset(s, dd, offset).unwrap();
                    assert_eq!(got, b[dd], "offset {:?} K[{}][{}]", offset, s, dd);
                }
            }
        }
    }

    #[test]
    fn single_layer_work_is_split_into_rows() {
        let kmesh = Mesh::new([4, 4, 1], [1.0, 1.0, 1.0]).padded();
        let rows = offset_rows(&kernel_ranges(kmesh.size, kmesh.pbc));
        // z collapses to 0, y spans -3..=3
        assert_eq!(rows.len(), 7);
        assert_eq!(rows.first(), Some(&(0, -3)));
        assert_eq!(rows.last(), Some(&(0, 3)));

        let rows = offset_rows(&[-1..=1, -2..=2, -1..=1]);
        assert_eq!(rows.len(), 15);
        assert_eq!(rows[5], (0, -2));
    }

    #[test]
    fn result_does_not_depend_on_thread_count() {
        let mesh = Mesh::new([4, 4, 1], [1.0, 1.0, 1.0]).with_pbc([1, 0, 0]);
        let build = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| brute_kernel(&mesh, 3.0).unwrap())
        };
        let serial = build(1);
        let parallel = build(4);
        for ((ij, a), (_, b)) in serial.components().zip(parallel.components()) {
            assert_eq!(a.data, b.data, "component {:?}", ij);
        }
    }

    #[test]
    fn too_fine_integration_is_rejected_before_building() {
        let mesh = Mesh::new([4, 4, 1], [1.0, 1.0, 1.0]);
        assert!(matches!(
            brute_kernel(&mesh, 1e7),
            Err(KernelError::IntegrationTooFine { .. })
        ));
    }

    #[test]
    fn preconditions_are_enforced() {
        let cube = [1.0, 1.0, 1.0];
        assert!(matches!(
            brute_kernel(&Mesh::new([4, 4, 1], cube), 0.0),
            Err(KernelError::InvalidAccuracy(_))
        ));
        assert!(brute_kernel(&Mesh::new([4, 4, 1], cube), -1.0).is_err());
        assert!(brute_kernel(&Mesh::new([4, 4, 1], cube), f64::NAN).is_err());
        assert!(matches!(
            brute_kernel(&Mesh::new([4, 4, 1], [1.0, 0.0, 1.0]), 4.0),
            Err(KernelError::InvalidCellSize { axis: 1, .. })
        ));
        // periodic axes are not padded, so their size must already be even
        assert!(matches!(
            brute_kernel(&Mesh::new([3, 4, 1], cube).with_pbc([1, 0, 0]), 4.0),
            Err(KernelError::OddKernelSize { axis: 0, size: 3 })
        ));
        assert!(matches!(
            brute_kernel(&Mesh::new([4, 4, 3], cube).with_pbc([0, 0, 1]), 4.0),
            Err(KernelError::OddKernelSize { axis: 2, size: 3 })
        ));
    }
}
