// src/scalar_field.rs

/// Dense scalar array on a 3D grid, x fastest then y then z.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField3D {
    pub size: [usize; 3],
    pub data: Vec<f64>,
}

impl ScalarField3D {
    /// Zero-initialised field with `size` cells along X, Y, Z.
    pub fn zeros(size: [usize; 3]) -> Self {
        Self {
            size,
            data: vec![0.0; size[0] * size[1] * size[2]],
        }
    }

    #[inline]
    pub fn idx(&self, ix: usize, iy: usize, iz: usize) -> usize {
        debug_assert!(ix < self.size[0] && iy < self.size[1] && iz < self.size[2]);
        (iz * self.size[1] + iy) * self.size[0] + ix
    }

    #[inline]
    pub fn get(&self, ix: usize, iy: usize, iz: usize) -> f64 {
        self.data[self.idx(ix, iy, iz)]
    }

    /// Accumulate into one cell; periodic images land on the same cell.
    #[inline]
    pub fn add(&mut self, ix: usize, iy: usize, iz: usize, v: f64) {
        let i = self.idx(ix, iy, iz);
        self.data[i] += v;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// (min, max) over finite entries, or None if there are none.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in self.data.iter().filter(|v| v.is_finite()) {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if lo.is_finite() && hi.is_finite() {
            Some((lo, hi))
        } else {
            None
        }
    }

    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accumulates_and_indexing_matches_storage_order() {
        let mut f = ScalarField3D::zeros([2, 3, 4]);
        assert_eq!(f.len(), 24);
        f.add(1, 2, 3, 0.5);
        f.add(1, 2, 3, 0.25);
        assert_eq!(f.get(1, 2, 3), 0.75);
        assert_eq!(f.data[23], 0.75);

        f.add(0, 1, 0, -2.0);
        assert_eq!(f.data[2], -2.0);
        assert_eq!(f.finite_range(), Some((-2.0, 0.75)));
        assert!(f.all_finite());
    }

    #[test]
    fn finite_range_skips_nan() {
        let mut f = ScalarField3D::zeros([2, 1, 1]);
        f.data[0] = f64::NAN;
        assert_eq!(f.finite_range(), Some((0.0, 0.0)));
        assert!(!f.all_finite());
    }
}
