// src/mesh.rs

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{KernelError, Result};
use crate::kernel::index::pad_size;

pub const X: usize = 0;
pub const Y: usize = 1;
pub const Z: usize = 2;

/// Regular 3D finite-difference mesh.
///
/// `size` counts cells along X, Y, Z; `cell_size` is the physical cell pitch
/// along each axis; `pbc[k]` is the number of periodic repeats along axis k
/// (0 = open boundary).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub size: [usize; 3],
    pub cell_size: [f64; 3],
    #[serde(default)]
    pub pbc: [usize; 3],
}

impl Mesh {
    /// Create a mesh with open boundaries.
    pub fn new(size: [usize; 3], cell_size: [f64; 3]) -> Self {
        Self {
            size,
            cell_size,
            pbc: [0, 0, 0],
        }
    }

    pub fn with_pbc(mut self, pbc: [usize; 3]) -> Self {
        self.pbc = pbc;
        self
    }

    /// Read a mesh descriptor from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Total number of cells.
    pub fn n_cells(&self) -> usize {
        self.size[X] * self.size[Y] * self.size[Z]
    }

    /// Smallest cell dimension, the reference length for coincident cells.
    pub fn min_cell_size(&self) -> f64 {
        self.cell_size[X].min(self.cell_size[Y]).min(self.cell_size[Z])
    }

    /// Single cell along Z without periodicity.
    pub fn is_2d(&self) -> bool {
        self.size[Z] == 1 && self.pbc[Z] == 0
    }

    /// Mesh the kernel is stored on: open axes with more than one cell are
    /// doubled so that a convolution over it does not wrap.
    pub fn padded(&self) -> Self {
        Self {
            size: pad_size(self.size, self.pbc),
            cell_size: self.cell_size,
            pbc: self.pbc,
        }
    }

    /// Shape checks every kernel build relies on.
    pub fn validate(&self) -> Result<()> {
        let min = [2, 2, 1];
        for axis in 0..3 {
            if self.size[axis] < min[axis] {
                return Err(KernelError::InvalidSize {
                    axis,
                    size: self.size[axis],
                    min: min[axis],
                });
            }
            let c = self.cell_size[axis];
            if !(c > 0.0 && c.is_finite()) {
                return Err(KernelError::InvalidCellSize { axis, value: c });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_counts_cells() {
        let m = Mesh::new([4, 3, 2], [1.0, 1.0, 1.0]);
        assert_eq!(m.n_cells(), 24);
        assert_eq!(m.padded().n_cells(), 8 * 6 * 4);
    }

    #[test]
    fn padding_doubles_open_axes_only() {
        let m = Mesh::new([4, 6, 1], [1e-9, 2e-9, 3e-9]).with_pbc([0, 2, 0]);
        let p = m.padded();
        assert_eq!(p.size, [8, 6, 1]);
        assert_eq!(p.cell_size, m.cell_size);
        assert_eq!(p.pbc, m.pbc);
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        assert!(Mesh::new([4, 4, 1], [1.0, 1.0, 1.0]).validate().is_ok());
        assert!(matches!(
            Mesh::new([1, 4, 1], [1.0, 1.0, 1.0]).validate(),
            Err(KernelError::InvalidSize { axis: 0, .. })
        ));
        assert!(matches!(
            Mesh::new([4, 4, 0], [1.0, 1.0, 1.0]).validate(),
            Err(KernelError::InvalidSize { axis: 2, .. })
        ));
        assert!(matches!(
            Mesh::new([4, 4, 4], [1.0, -1.0, 1.0]).validate(),
            Err(KernelError::InvalidCellSize { axis: 1, .. })
        ));
        assert!(Mesh::new([4, 4, 4], [1.0, 1.0, f64::NAN]).validate().is_err());
    }

    #[test]
    fn mesh_json_defaults_to_open_boundaries() {
        let m: Mesh = serde_json::from_str(r#"{"size":[8,8,1],"cell_size":[5e-9,5e-9,1e-9]}"#)
            .unwrap();
        assert_eq!(m.pbc, [0, 0, 0]);
        assert!(m.is_2d());
        assert_eq!(m.min_cell_size(), 1e-9);
    }
}
