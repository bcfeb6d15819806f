//! Flanagan-Belytschko anti-hourglass correction (spec §4.3): four
//! fixed-pattern hourglass modes contracted with nodal coordinates,
//! projected off the volume gradient, then contracted again with
//! nodal velocities to get a per-node force correction.

/// Fixed ±1 pattern, one row per hourglass mode.
const GAMMA: [[f64; 8]; 4] = [
    [1.0, 1.0, -1.0, -1.0, -1.0, -1.0, 1.0, 1.0],
    [1.0, -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0],
    [1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0],
];

fn volu_der(
    x0: f64, x1: f64, x2: f64, x3: f64, x4: f64, x5: f64,
    y0: f64, y1: f64, y2: f64, y3: f64, y4: f64, y5: f64,
    z0: f64, z1: f64, z2: f64, z3: f64, z4: f64, z5: f64,
) -> (f64, f64, f64) {
    let twelfth = 1.0 / 12.0;

    let dvdx = (y1 + y2) * (z0 + z1) - (y0 + y1) * (z1 + z2) + (y0 + y4) * (z3 + z4)
        - (y3 + y4) * (z0 + z4)
        - (y2 + y5) * (z3 + z5)
        + (y3 + y5) * (z2 + z5);
    let dvdy = -(x1 + x2) * (z0 + z1) + (x0 + x1) * (z1 + z2) - (x0 + x4) * (z3 + z4)
        + (x3 + x4) * (z0 + z4)
        + (x2 + x5) * (z3 + z5)
        - (x3 + x5) * (z2 + z5);
    let dvdz = -(y1 + y2) * (x0 + x1) + (y0 + y1) * (x1 + x2) - (y0 + y4) * (x3 + x4)
        + (y3 + y4) * (x0 + x4)
        + (y2 + y5) * (x3 + x5)
        - (y3 + y5) * (x2 + x5);

    (dvdx * twelfth, dvdy * twelfth, dvdz * twelfth)
}

/// Per-node volume gradient `(dvdx, dvdy, dvdz)` for all 8 corners of
/// one hex, used to project the hourglass mode off the true volume
/// gradient.
fn volume_derivative(x: &[f64; 8], y: &[f64; 8], z: &[f64; 8]) -> ([f64; 8], [f64; 8], [f64; 8]) {
    let mut dvdx = [0.0; 8];
    let mut dvdy = [0.0; 8];
    let mut dvdz = [0.0; 8];

    // (n, [6 corners feeding that node's VoluDer in the fixed winding])
    const STENCIL: [(usize, [usize; 6]); 8] = [
        (0, [1, 2, 3, 4, 5, 7]),
        (3, [0, 1, 2, 7, 4, 6]),
        (2, [3, 0, 1, 6, 7, 5]),
        (1, [2, 3, 0, 5, 6, 4]),
        (4, [7, 6, 5, 0, 3, 1]),
        (5, [4, 7, 6, 1, 0, 2]),
        (6, [5, 4, 7, 2, 1, 3]),
        (7, [6, 5, 4, 3, 2, 0]),
    ];

    for &(dst, c) in &STENCIL {
        let (dx, dy, dz) = volu_der(
            x[c[0]], x[c[1]], x[c[2]], x[c[3]], x[c[4]], x[c[5]],
            y[c[0]], y[c[1]], y[c[2]], y[c[3]], y[c[4]], y[c[5]],
            z[c[0]], z[c[1]], z[c[2]], z[c[3]], z[c[4]], z[c[5]],
        );
        dvdx[dst] = dx;
        dvdy[dst] = dy;
        dvdz[dst] = dz;
    }

    (dvdx, dvdy, dvdz)
}

/// Per-node hourglass force contribution `(hgfx, hgfy, hgfz)`,
/// spec §4.3: "contract again with velocities and multiply by
/// `-hgcoef*0.01*ss*mass/cbrt(V)`".
#[allow(clippy::too_many_arguments)]
pub fn fb_hourglass_force(
    x: &[f64; 8], y: &[f64; 8], z: &[f64; 8],
    xd: &[f64; 8], yd: &[f64; 8], zd: &[f64; 8],
    determ: f64, volo: f64, mass: f64, ss: f64, hgcoef: f64,
) -> ([f64; 8], [f64; 8], [f64; 8]) {
    let (dvdx, dvdy, dvdz) = volume_derivative(x, y, z);
    let volinv = 1.0 / determ;

    let mut hourgam = [[0.0f64; 4]; 8];
    for (i1, gamma_row) in GAMMA.iter().enumerate() {
        let hourmodx: f64 = (0..8).map(|i| x[i] * gamma_row[i]).sum();
        let hourmody: f64 = (0..8).map(|i| y[i] * gamma_row[i]).sum();
        let hourmodz: f64 = (0..8).map(|i| z[i] * gamma_row[i]).sum();
        for n in 0..8 {
            hourgam[n][i1] = gamma_row[n]
                - volinv * (dvdx[n] * hourmodx + dvdy[n] * hourmody + dvdz[n] * hourmodz);
        }
    }

    let volume13 = volo.cbrt();
    let coefficient = -hgcoef * 0.01 * ss * mass / volume13;

    let contract = |vd: &[f64; 8]| -> [f64; 8] {
        let mut h = [0.0; 4];
        for (i1, hv) in h.iter_mut().enumerate() {
            *hv = (0..8).map(|n| hourgam[n][i1] * vd[n]).sum();
        }
        let mut out = [0.0; 8];
        for (n, ov) in out.iter_mut().enumerate() {
            *ov = coefficient * (0..4).map(|i1| hourgam[n][i1] * h[i1]).sum::<f64>();
        }
        out
    };

    (contract(xd), contract(yd), contract(zd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::elem_volume;

    const UNIT_X: [f64; 8] = [0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
    const UNIT_Y: [f64; 8] = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
    const UNIT_Z: [f64; 8] = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];

    #[test]
    fn zero_velocity_gives_zero_hourglass_force() {
        let zero = [0.0; 8];
        let volo = elem_volume(&UNIT_X, &UNIT_Y, &UNIT_Z);
        let (hgx, hgy, hgz) =
            fb_hourglass_force(&UNIT_X, &UNIT_Y, &UNIT_Z, &zero, &zero, &zero, volo, volo, 1.0, 1.0, 3.0);
        for n in 0..8 {
            assert_eq!(hgx[n], 0.0);
            assert_eq!(hgy[n], 0.0);
            assert_eq!(hgz[n], 0.0);
        }
    }

    #[test]
    fn rigid_translation_produces_negligible_hourglass_force() {
        let c = [2.0; 8];
        let zero = [0.0; 8];
        let volo = elem_volume(&UNIT_X, &UNIT_Y, &UNIT_Z);
        let (hgx, hgy, hgz) =
            fb_hourglass_force(&UNIT_X, &UNIT_Y, &UNIT_Z, &c, &zero, &zero, volo, volo, 1.0, 1.0, 3.0);
        for n in 0..8 {
            assert!(hgx[n].abs() < 1.0e-10, "node {n}: {}", hgx[n]);
            assert_eq!(hgy[n], 0.0);
            assert_eq!(hgz[n], 0.0);
        }
    }
}
