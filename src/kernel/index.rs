// src/kernel/index.rs
//
// Index bookkeeping for the kernel build: cell separations, periodic wrapping,
// zero-padding and the destination offset ranges.

use std::ops::RangeInclusive;

use crate::mesh::Z;

/// Closest distance between two cells, in cell pitches, given the integer
/// distance between their centres. Cells touching by even a corner are at
/// distance zero.
#[inline]
pub fn delta(d: isize) -> f64 {
    let a = d.unsigned_abs();
    if a > 0 {
        (a - 1) as f64
    } else {
        0.0
    }
}

/// Wrap an offset into `[0, n)` by adding or subtracting multiples of `n`.
#[inline]
pub fn wrap(number: isize, n: usize) -> usize {
    debug_assert!(n > 0);
    number.rem_euclid(n as isize) as usize
}

/// Size after zero-padding: open axes with more than one cell are doubled,
/// periodic axes keep their size.
pub fn pad_size(size: [usize; 3], pbc: [usize; 3]) -> [usize; 3] {
    let mut padded = size;
    for k in 0..3 {
        if pbc[k] == 0 && size[k] > 1 {
            padded[k] *= 2;
        }
    }
    padded
}

/// Destination offset range along one axis of the padded mesh.
///
/// Open: `-(n-1)/2 ..= (n-1)/2`. Periodic with `p` repeats:
/// `-(n*p-1) ..= n*p-1`, every image folds back through [`wrap`].
pub fn axis_range(n: usize, pbc: usize) -> RangeInclusive<isize> {
    let n = n as isize;
    if pbc == 0 {
        let r = (n - 1) / 2;
        -r..=r
    } else {
        let r = n * pbc as isize - 1;
        -r..=r
    }
}

/// Offset ranges along X, Y, Z for a padded mesh. A single non-periodic
/// layer along Z collapses to offset 0.
pub fn kernel_ranges(size: [usize; 3], pbc: [usize; 3]) -> [RangeInclusive<isize>; 3] {
    let mut r = [
        axis_range(size[0], pbc[0]),
        axis_range(size[1], pbc[1]),
        axis_range(size[2], pbc[2]),
    ];
    if size[Z] == 1 && pbc[Z] == 0 {
        r[Z] = 0..=0;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_treats_touching_cells_as_zero_separation() {
        assert_eq!(delta(0), 0.0);
        assert_eq!(delta(1), 0.0);
        assert_eq!(delta(-1), 0.0);
        assert_eq!(delta(2), 1.0);
        assert_eq!(delta(-2), 1.0);
        assert_eq!(delta(-7), 6.0);
    }

    #[test]
    fn wrap_is_periodic_and_in_range() {
        for n in 1..9usize {
            for k in -40isize..40 {
                let w = wrap(k, n);
                assert!(w < n, "wrap({}, {}) = {}", k, n, w);
                assert_eq!(w, wrap(k + n as isize, n));
                assert_eq!(w, wrap(k - 3 * n as isize, n));
            }
        }
        assert_eq!(wrap(-1, 8), 7);
        assert_eq!(wrap(8, 8), 0);
        assert_eq!(wrap(3, 8), 3);
    }

    #[test]
    fn pad_size_rule() {
        assert_eq!(pad_size([4, 4, 1], [0, 0, 0]), [8, 8, 1]);
        assert_eq!(pad_size([4, 6, 3], [1, 0, 2]), [4, 12, 3]);
        assert_eq!(pad_size([5, 2, 2], [0, 0, 0]), [10, 4, 4]);
    }

    #[test]
    fn ranges_for_open_and_periodic_axes() {
        let r = kernel_ranges([8, 6, 1], [0, 2, 0]);
        assert_eq!(r[0], -3..=3);
        assert_eq!(r[1], -11..=11);
        assert_eq!(r[2], 0..=0);

        // a single layer that is periodic still sums its images
        let r = kernel_ranges([8, 8, 1], [0, 0, 3]);
        assert_eq!(r[2], -2..=2);
    }
}
