//! `CalcKinematicsForElems` (spec §4.2 step 1): per-element new volume,
//! characteristic length, and velocity gradient, computed from nodal
//! positions back-projected to mid-step.

use rayon::prelude::*;

use crate::error::KernelError;
use crate::shape::{elem_characteristic_length, elem_volume, shape_function_derivatives};

/// Per-element kinematic outputs for one cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct ElemKinematics {
    pub vnew: f64,
    pub delv: f64,
    pub arealg: f64,
    pub dxx: f64,
    pub dyy: f64,
    pub dzz: f64,
}

fn gather8(field: &[f64], corners: &[usize]) -> [f64; 8] {
    let mut out = [0.0; 8];
    for (i, o) in out.iter_mut().enumerate() {
        *o = field[corners[i]];
    }
    out
}

fn velocity_gradient(
    xd: &[f64; 8], yd: &[f64; 8], zd: &[f64; 8], b: &[[f64; 8]; 3], det_j: f64,
) -> [f64; 6] {
    let inv_det_j = 1.0 / det_j;
    let pfx = &b[0];
    let pfy = &b[1];
    let pfz = &b[2];

    let d0 = inv_det_j
        * (pfx[0] * (xd[0] - xd[6]) + pfx[1] * (xd[1] - xd[7]) + pfx[2] * (xd[2] - xd[4])
            + pfx[3] * (xd[3] - xd[5]));
    let d1 = inv_det_j
        * (pfy[0] * (yd[0] - yd[6]) + pfy[1] * (yd[1] - yd[7]) + pfy[2] * (yd[2] - yd[4])
            + pfy[3] * (yd[3] - yd[5]));
    let d2 = inv_det_j
        * (pfz[0] * (zd[0] - zd[6]) + pfz[1] * (zd[1] - zd[7]) + pfz[2] * (zd[2] - zd[4])
            + pfz[3] * (zd[3] - zd[5]));

    let dyddx = inv_det_j
        * (pfx[0] * (yd[0] - yd[6]) + pfx[1] * (yd[1] - yd[7]) + pfx[2] * (yd[2] - yd[4])
            + pfx[3] * (yd[3] - yd[5]));
    let dxddy = inv_det_j
        * (pfy[0] * (xd[0] - xd[6]) + pfy[1] * (xd[1] - xd[7]) + pfy[2] * (xd[2] - xd[4])
            + pfy[3] * (xd[3] - xd[5]));
    let dzddx = inv_det_j
        * (pfx[0] * (zd[0] - zd[6]) + pfx[1] * (zd[1] - zd[7]) + pfx[2] * (zd[2] - zd[4])
            + pfx[3] * (zd[3] - zd[5]));
    let dxddz = inv_det_j
        * (pfz[0] * (xd[0] - xd[6]) + pfz[1] * (xd[1] - xd[7]) + pfz[2] * (xd[2] - xd[4])
            + pfz[3] * (xd[3] - xd[5]));
    let dzddy = inv_det_j
        * (pfy[0] * (zd[0] - zd[6]) + pfy[1] * (zd[1] - zd[7]) + pfy[2] * (zd[2] - zd[4])
            + pfy[3] * (zd[3] - zd[5]));
    let dyddz = inv_det_j
        * (pfz[0] * (yd[0] - yd[6]) + pfz[1] * (yd[1] - yd[7]) + pfz[2] * (yd[2] - yd[4])
            + pfz[3] * (yd[3] - yd[5]));

    let dxy = 0.5 * (dxddy + dyddx);
    let dxz = 0.5 * (dxddz + dzddx);
    let dyz = 0.5 * (dzddy + dyddz);

    [d0, d1, d2, dxy, dyz, dxz]
}

/// Computes `ElemKinematics` for every element, in parallel. Aborts
/// with `KernelError::NegativeVolume` (spec I1) on the first element
/// whose new volume is non-positive.
#[allow(clippy::too_many_arguments)]
pub fn calc_kinematics_for_elems(
    nodelist: &[usize],
    volo: &[f64],
    v: &[f64],
    x: &[f64], y: &[f64], z: &[f64],
    xd: &[f64], yd: &[f64], zd: &[f64],
    dt: f64,
) -> Result<Vec<ElemKinematics>, KernelError> {
    let num_elem = volo.len();
    (0..num_elem)
        .into_par_iter()
        .map(|k| {
            let corners = &nodelist[8 * k..8 * k + 8];
            let mut xl = gather8(x, corners);
            let mut yl = gather8(y, corners);
            let mut zl = gather8(z, corners);
            let xdl = gather8(xd, corners);
            let ydl = gather8(yd, corners);
            let zdl = gather8(zd, corners);

            let volume = elem_volume(&xl, &yl, &zl);
            let vnew = volume / volo[k];
            if vnew <= 0.0 {
                return Err(KernelError::NegativeVolume { elem: k, volume: vnew });
            }
            let delv = vnew - v[k];
            let arealg = elem_characteristic_length(&xl, &yl, &zl, volume);

            let dt2 = 0.5 * dt;
            for i in 0..8 {
                xl[i] -= dt2 * xdl[i];
                yl[i] -= dt2 * ydl[i];
                zl[i] -= dt2 * zdl[i];
            }
            let (b, det_j) = shape_function_derivatives(&xl, &yl, &zl);
            let d = velocity_gradient(&xdl, &ydl, &zdl, &b, det_j);

            Ok(ElemKinematics {
                vnew,
                delv,
                arealg,
                dxx: d[0],
                dyy: d[1],
                dzz: d[2],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_unit_cube_has_no_volume_change_or_strain_rate() {
        let nodelist = vec![0, 1, 2, 3, 4, 5, 6, 7];
        let x = vec![0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let y = vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        let z = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let zero = vec![0.0; 8];
        let volo = vec![1.0];
        let v = vec![1.0];

        let out = calc_kinematics_for_elems(&nodelist, &volo, &v, &x, &y, &z, &zero, &zero, &zero, 1.0e-3)
            .expect("positive volume");
        assert_eq!(out.len(), 1);
        let k = out[0];
        assert!((k.vnew - 1.0).abs() < 1.0e-12);
        assert!(k.delv.abs() < 1.0e-12);
        assert!((k.arealg - 1.0).abs() < 1.0e-9);
        assert!(k.dxx.abs() < 1.0e-12);
        assert!(k.dyy.abs() < 1.0e-12);
        assert!(k.dzz.abs() < 1.0e-12);
    }

    #[test]
    fn inverted_element_reports_negative_volume() {
        let nodelist = vec![0, 1, 2, 3, 4, 5, 6, 7];
        // Collapse the cube to zero thickness along z.
        let x = vec![0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let y = vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        let z = vec![0.0; 8];
        let zero = vec![0.0; 8];
        let volo = vec![1.0];
        let v = vec![1.0];

        let err = calc_kinematics_for_elems(&nodelist, &volo, &v, &x, &y, &z, &zero, &zero, &zero, 1.0e-3)
            .unwrap_err();
        assert!(matches!(err, KernelError::NegativeVolume { elem: 0, .. }));
    }
}
