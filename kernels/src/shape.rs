//! Per-element geometry (spec §4.3): shape-function derivatives, the
//! Jacobian-determinant volume that falls out of them, and the
//! independent closed-form volume used by kinematics.

/// Shape-function derivatives for one hex element, `b[axis][node]`,
/// plus the element volume implied by the Jacobian determinant at the
/// element center (spec: "eight B-matrix columns, only first 4
/// distinct; columns 4..7 are negations of 2,3,0,1").
pub fn shape_function_derivatives(x: &[f64; 8], y: &[f64; 8], z: &[f64; 8]) -> ([[f64; 8]; 3], f64) {
    let fjxxi = 0.125 * ((x[6] - x[0]) + (x[5] - x[3]) - (x[7] - x[1]) - (x[4] - x[2]));
    let fjxet = 0.125 * ((x[6] - x[0]) - (x[5] - x[3]) + (x[7] - x[1]) - (x[4] - x[2]));
    let fjxze = 0.125 * ((x[6] - x[0]) + (x[5] - x[3]) + (x[7] - x[1]) + (x[4] - x[2]));

    let fjyxi = 0.125 * ((y[6] - y[0]) + (y[5] - y[3]) - (y[7] - y[1]) - (y[4] - y[2]));
    let fjyet = 0.125 * ((y[6] - y[0]) - (y[5] - y[3]) + (y[7] - y[1]) - (y[4] - y[2]));
    let fjyze = 0.125 * ((y[6] - y[0]) + (y[5] - y[3]) + (y[7] - y[1]) + (y[4] - y[2]));

    let fjzxi = 0.125 * ((z[6] - z[0]) + (z[5] - z[3]) - (z[7] - z[1]) - (z[4] - z[2]));
    let fjzet = 0.125 * ((z[6] - z[0]) - (z[5] - z[3]) + (z[7] - z[1]) - (z[4] - z[2]));
    let fjzze = 0.125 * ((z[6] - z[0]) + (z[5] - z[3]) + (z[7] - z[1]) + (z[4] - z[2]));

    let cjxxi = fjyet * fjzze - fjzet * fjyze;
    let cjxet = -fjyxi * fjzze + fjzxi * fjyze;
    let cjxze = fjyxi * fjzet - fjzxi * fjyet;

    let cjyxi = -fjxet * fjzze + fjzet * fjxze;
    let cjyet = fjxxi * fjzze - fjzxi * fjxze;
    let cjyze = -fjxxi * fjzet + fjzxi * fjxet;

    let cjzxi = fjxet * fjyze - fjyet * fjxze;
    let cjzet = -fjxxi * fjyze + fjyxi * fjxze;
    let cjzze = fjxxi * fjyet - fjyxi * fjxet;

    let mut b = [[0.0; 8]; 3];

    b[0][0] = -cjxxi - cjxet - cjxze;
    b[0][1] = cjxxi - cjxet - cjxze;
    b[0][2] = cjxxi + cjxet - cjxze;
    b[0][3] = -cjxxi + cjxet - cjxze;
    b[0][4] = -b[0][2];
    b[0][5] = -b[0][3];
    b[0][6] = -b[0][0];
    b[0][7] = -b[0][1];

    b[1][0] = -cjyxi - cjyet - cjyze;
    b[1][1] = cjyxi - cjyet - cjyze;
    b[1][2] = cjyxi + cjyet - cjyze;
    b[1][3] = -cjyxi + cjyet - cjyze;
    b[1][4] = -b[1][2];
    b[1][5] = -b[1][3];
    b[1][6] = -b[1][0];
    b[1][7] = -b[1][1];

    b[2][0] = -cjzxi - cjzet - cjzze;
    b[2][1] = cjzxi - cjzet - cjzze;
    b[2][2] = cjzxi + cjzet - cjzze;
    b[2][3] = -cjzxi + cjzet - cjzze;
    b[2][4] = -b[2][2];
    b[2][5] = -b[2][3];
    b[2][6] = -b[2][0];
    b[2][7] = -b[2][1];

    let volume = 8.0 * (fjxet * cjxet + fjyet * cjyet + fjzet * cjzet);
    (b, volume)
}

fn triple_product(
    x1: f64, y1: f64, z1: f64,
    x2: f64, y2: f64, z2: f64,
    x3: f64, y3: f64, z3: f64,
) -> f64 {
    x1 * (y2 * z3 - z2 * y3) + x2 * (z1 * y3 - y1 * z3) + x3 * (y1 * z2 - z1 * y2)
}

/// The closed-form volume `kinematics` uses directly (spec: "a
/// closed-form triple-product sum over face diagonals divided by
/// 12"), independent of (but numerically consistent with) the
/// Jacobian-determinant volume above.
pub fn elem_volume(x: &[f64; 8], y: &[f64; 8], z: &[f64; 8]) -> f64 {
    let dx61 = x[6] - x[1];
    let dy61 = y[6] - y[1];
    let dz61 = z[6] - z[1];
    let dx70 = x[7] - x[0];
    let dy70 = y[7] - y[0];
    let dz70 = z[7] - z[0];
    let dx63 = x[6] - x[3];
    let dy63 = y[6] - y[3];
    let dz63 = z[6] - z[3];
    let dx20 = x[2] - x[0];
    let dy20 = y[2] - y[0];
    let dz20 = z[2] - z[0];
    let dx50 = x[5] - x[0];
    let dy50 = y[5] - y[0];
    let dz50 = z[5] - z[0];
    let dx64 = x[6] - x[4];
    let dy64 = y[6] - y[4];
    let dz64 = z[6] - z[4];
    let dx31 = x[3] - x[1];
    let dy31 = y[3] - y[1];
    let dz31 = z[3] - z[1];
    let dx72 = x[7] - x[2];
    let dy72 = y[7] - y[2];
    let dz72 = z[7] - z[2];
    let dx43 = x[4] - x[3];
    let dy43 = y[4] - y[3];
    let dz43 = z[4] - z[3];
    let dx57 = x[5] - x[7];
    let dy57 = y[5] - y[7];
    let dz57 = z[5] - z[7];
    let dx14 = x[1] - x[4];
    let dy14 = y[1] - y[4];
    let dz14 = z[1] - z[4];
    let dx25 = x[2] - x[5];
    let dy25 = y[2] - y[5];
    let dz25 = z[2] - z[5];

    let volume = triple_product(
        dx31 + dx72, dx63, dx20,
        dy31 + dy72, dy63, dy20,
        dz31 + dz72, dz63, dz20,
    ) + triple_product(
        dx43 + dx57, dx64, dx70,
        dy43 + dy57, dy64, dy70,
        dz43 + dz57, dz64, dz70,
    ) + triple_product(
        dx14 + dx25, dx61, dx50,
        dy14 + dy25, dy61, dy50,
        dz14 + dz25, dz61, dz50,
    );

    volume / 12.0
}

/// Average face area used by the characteristic-length calculation
/// (one face diagonal pair per axis).
pub fn elem_characteristic_length(x: &[f64; 8], y: &[f64; 8], z: &[f64; 8], volume: f64) -> f64 {
    let mut max_area = 0.0f64;

    let face_area_sq = |a: [f64; 3], b: [f64; 3]| -> f64 {
        let fx = a[1] * b[2] - a[2] * b[1];
        let fy = a[2] * b[0] - a[0] * b[2];
        let fz = a[0] * b[1] - a[1] * b[0];
        fx * fx + fy * fy + fz * fz
    };

    let diag = |p: usize, q: usize| -> [f64; 3] {
        [x[p] - x[q], y[p] - y[q], z[p] - z[q]]
    };

    // Six faces of the hex, each tested via its two diagonals.
    const FACES: [[usize; 4]; 6] = [
        [0, 1, 2, 3],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [1, 2, 6, 5],
        [2, 3, 7, 6],
        [3, 0, 4, 7],
    ];
    for f in FACES {
        let d1 = diag(f[2], f[0]);
        let d2 = diag(f[3], f[1]);
        let area_sq = face_area_sq(d1, d2);
        if area_sq > max_area {
            max_area = area_sq;
        }
    }

    4.0 * volume / max_area.sqrt().max(1.0e-300)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Standard hex node ordering: 0-3 form the bottom face (z=0)
    // counterclockwise, 4-7 the top face directly above 0-3.
    const UNIT_X: [f64; 8] = [0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
    const UNIT_Y: [f64; 8] = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
    const UNIT_Z: [f64; 8] = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];

    #[test]
    fn unit_cube_closed_form_volume_is_one() {
        let v = elem_volume(&UNIT_X, &UNIT_Y, &UNIT_Z);
        assert!((v - 1.0).abs() < 1.0e-12, "expected 1.0, got {v}");
    }

    #[test]
    fn unit_cube_jacobian_volume_matches_closed_form() {
        let (_, v) = shape_function_derivatives(&UNIT_X, &UNIT_Y, &UNIT_Z);
        assert!((v - 1.0).abs() < 1.0e-12, "expected 1.0, got {v}");
    }

    #[test]
    fn unit_cube_characteristic_length_is_one() {
        let v = elem_volume(&UNIT_X, &UNIT_Y, &UNIT_Z);
        let len = elem_characteristic_length(&UNIT_X, &UNIT_Y, &UNIT_Z, v);
        assert!((len - 1.0).abs() < 1.0e-9, "expected 1.0, got {len}");
    }
}
