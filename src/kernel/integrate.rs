// src/kernel/integrate.rs
//
// Face-charge quadrature for one (source axis, destination offset) pair.
//
// A uniformly magnetised source cell (unit M along u) is equivalent to two
// charge sheets of density ±1 on its faces normal to u. Each sheet is split
// into nv × nw point charges and the field they produce is averaged over
// nx × ny × nz sample points inside the destination cell.

use std::f64::consts::PI;

use crate::error::{KernelError, Result};
use crate::vec3::{norm, scale, sub};

use super::index::delta;

/// Number of integration points per axis: nv, nw across the source face,
/// nx, ny, nz through the destination volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationOrder {
    pub nv: usize,
    pub nw: usize,
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl IntegrationOrder {
    /// Total number of (source, destination) sample pairs, `None` on overflow.
    pub fn checked_points(&self) -> Option<usize> {
        self.nv
            .checked_mul(self.nw)?
            .checked_mul(self.nx)?
            .checked_mul(self.ny)?
            .checked_mul(self.nz)
    }

    /// Total number of sample pairs. Orders from [`integration_order`] never
    /// saturate.
    pub fn points(&self) -> usize {
        self.checked_points().unwrap_or(usize::MAX)
    }
}

/// The two axes orthogonal to `u`, in cyclic order.
#[inline]
pub fn transverse_axes(u: usize) -> (usize, usize) {
    ((u + 1) % 3, (u + 2) % 3)
}

/// Closest approach between the source cell and the cell at `offset`,
/// falling back to `reference` when the cells touch or coincide.
pub fn closest_approach(offset: [isize; 3], cell: [f64; 3], reference: f64) -> f64 {
    let gap = [delta(offset[0]), delta(offset[1]), delta(offset[2])];
    let d = norm(scale(gap, cell));
    if d == 0.0 {
        reference
    } else {
        d
    }
}

/// Pick integration point counts so that no sub-cell is larger than
/// `distance / accuracy`.
///
/// The source face counts are doubled afterwards. Staggering the source grid
/// against the destination grid this way gave the lowest self-kernel error
/// per evaluation of all variants tried (about 1e-5 at 1e7 points for a
/// cube); other choices (odd/even mixes, +1 on either side) stall near 1e-3.
pub fn integration_order(
    distance: f64,
    accuracy: f64,
    cell: [f64; 3],
    source_axis: usize,
) -> Result<IntegrationOrder> {
    let (v, w) = transverse_axes(source_axis);
    let max_size = distance / accuracy;

    // float-to-int casts saturate, so huge ratios stay finite here
    #[inline]
    fn count(extent: f64, max_size: f64) -> usize {
        ((extent / max_size).max(1.0) + 0.5) as usize
    }

    let too_fine = || KernelError::IntegrationTooFine {
        distance,
        accuracy,
    };
    let order = IntegrationOrder {
        nv: count(cell[v], max_size).checked_mul(2).ok_or_else(too_fine)?,
        nw: count(cell[w], max_size).checked_mul(2).ok_or_else(too_fine)?,
        nx: count(cell[0], max_size),
        ny: count(cell[1], max_size),
        nz: count(cell[2], max_size),
    };
    order.checked_points().ok_or_else(too_fine)?;
    Ok(order)
}

/// Field at `dest` of a point charge `charge` sitting at `pole`:
/// q r / (4π |r|³).
#[inline]
pub fn sample_field(pole: [f64; 3], dest: [f64; 3], charge: f64) -> [f64; 3] {
    let r = sub(dest, pole);
    let rr = norm(r);
    let qr = charge / (4.0 * PI * rr * rr * rr);
    [r[0] * qr, r[1] * qr, r[2] * qr]
}

/// Midpoints of `n` equal slices of `[centre - extent/2, centre + extent/2]`.
fn midpoints(centre: f64, extent: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| centre - extent / 2.0 + extent / (2 * n) as f64 + (extent / n as f64) * i as f64)
        .collect()
}

/// Average field over the destination cell at `offset` (in cells) produced by
/// unit magnetisation along `source_axis` in the source cell at the origin.
///
/// Returns the field and the number of sample pairs evaluated.
pub fn integrate_cell(
    source_axis: usize,
    offset: [isize; 3],
    cell: [f64; 3],
    order: IntegrationOrder,
) -> ([f64; 3], usize) {
    let u = source_axis;
    let (v, w) = transverse_axes(u);

    let charge = cell[v] * cell[w] / order.points() as f64;
    let pu1 = cell[u] / 2.0;
    let pu2 = -pu1;

    let centre = [
        offset[0] as f64 * cell[0],
        offset[1] as f64 * cell[1],
        offset[2] as f64 * cell[2],
    ];

    let pv = midpoints(0.0, cell[v], order.nv);
    let pw = midpoints(0.0, cell[w], order.nw);
    let rx = midpoints(centre[0], cell[0], order.nx);
    let ry = midpoints(centre[1], cell[1], order.ny);
    let rz = midpoints(centre[2], cell[2], order.nz);

    let mut b = [0.0_f64; 3];
    let mut plus = [0.0_f64; 3];
    let mut minus = [0.0_f64; 3];

    for &sv in &pv {
        plus[v] = sv;
        minus[v] = sv;
        for &sw in &pw {
            plus[w] = sw;
            minus[w] = sw;
            plus[u] = pu1;
            minus[u] = pu2;

            for &x in &rx {
                for &y in &ry {
                    for &z in &rz {
                        let dest = [x, y, z];
                        let bp = sample_field(plus, dest, charge);
                        let bm = sample_field(minus, dest, -charge);
                        // pair the poles before accumulating; they nearly cancel far away
                        b[0] += bp[0] + bm[0];
                        b[1] += bp[1] + bm[1];
                        b[2] += bp[2] + bm[2];
                    }
                }
            }
        }
    }

    (b, order.points())
}
