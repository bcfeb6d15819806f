//! `CalcVolumeForceForElems` (spec §4.2 step 3): per-element stress
//! integration plus the Flanagan-Belytschko hourglass correction,
//! both written into the `8*numElem` scratch scatter arrays the node
//! loop later gathers from (spec §3, §9 "scatter -> gather trick").

use rayon::prelude::*;

use crate::error::KernelError;
use crate::hourglass::fb_hourglass_force;
use crate::shape::shape_function_derivatives;

fn gather8(field: &[f64], corners: &[usize]) -> [f64; 8] {
    let mut out = [0.0; 8];
    for (i, o) in out.iter_mut().enumerate() {
        *o = field[corners[i]];
    }
    out
}

fn sum_elem_stresses_to_node_forces(b: &[[f64; 8]; 3], stress: f64) -> ([f64; 8], [f64; 8], [f64; 8]) {
    let mut fx = [0.0; 8];
    let mut fy = [0.0; 8];
    let mut fz = [0.0; 8];
    for i in 0..8 {
        fx[i] = stress * b[0][i];
        fy[i] = stress * b[1][i];
        fz[i] = stress * b[2][i];
    }
    (fx, fy, fz)
}

/// Per-element stress + hourglass force, scattered into three
/// `8*numElem` arrays indexed `[8*elem + corner]`.
#[allow(clippy::too_many_arguments)]
pub fn calc_volume_force_for_elems(
    nodelist: &[usize],
    x: &[f64], y: &[f64], z: &[f64],
    xd: &[f64], yd: &[f64], zd: &[f64],
    p: &[f64], q: &[f64],
    volo: &[f64], elem_mass: &[f64], ss: &[f64],
    hgcoef: f64,
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>), KernelError> {
    let num_elem = volo.len();
    let per_elem: Vec<Result<([f64; 8], [f64; 8], [f64; 8]), KernelError>> = (0..num_elem)
        .into_par_iter()
        .map(|k| {
            let corners = &nodelist[8 * k..8 * k + 8];
            let xl = gather8(x, corners);
            let yl = gather8(y, corners);
            let zl = gather8(z, corners);
            let xdl = gather8(xd, corners);
            let ydl = gather8(yd, corners);
            let zdl = gather8(zd, corners);

            let (b, det_j) = shape_function_derivatives(&xl, &yl, &zl);
            if det_j <= 0.0 {
                return Err(KernelError::NegativeVolume { elem: k, volume: det_j });
            }

            // sigma = -(p+q); SumElemStressesToNodeForces negates again,
            // so the node force contribution is simply (p+q)*B.
            let (sfx, sfy, sfz) = sum_elem_stresses_to_node_forces(&b, p[k] + q[k]);

            let (hgx, hgy, hgz) = fb_hourglass_force(
                &xl, &yl, &zl, &xdl, &ydl, &zdl, det_j, volo[k], elem_mass[k], ss[k], hgcoef,
            );

            let mut fx = [0.0; 8];
            let mut fy = [0.0; 8];
            let mut fz = [0.0; 8];
            for i in 0..8 {
                fx[i] = sfx[i] + hgx[i];
                fy[i] = sfy[i] + hgy[i];
                fz[i] = sfz[i] + hgz[i];
            }
            Ok((fx, fy, fz))
        })
        .collect();

    let mut fx_elem = vec![0.0; 8 * num_elem];
    let mut fy_elem = vec![0.0; 8 * num_elem];
    let mut fz_elem = vec![0.0; 8 * num_elem];
    for (k, r) in per_elem.into_iter().enumerate() {
        let (fx, fy, fz) = r?;
        fx_elem[8 * k..8 * k + 8].copy_from_slice(&fx);
        fy_elem[8 * k..8 * k + 8].copy_from_slice(&fy);
        fz_elem[8 * k..8 * k + 8].copy_from_slice(&fz);
    }
    Ok((fx_elem, fy_elem, fz_elem))
}

/// Gathers the `8*numElem` per-corner scratch into per-node totals
/// via the node -> element inverse connectivity (spec §3).
pub fn gather_forces_to_nodes(
    node_elem_count: &[usize],
    node_elem_start: &[usize],
    node_elem_corner_list: &[usize],
    fx_elem: &[f64], fy_elem: &[f64], fz_elem: &[f64],
    fx: &mut [f64], fy: &mut [f64], fz: &mut [f64],
) {
    fx.par_iter_mut()
        .zip(fy.par_iter_mut())
        .zip(fz.par_iter_mut())
        .map(|((fxn, fyn), fzn)| (fxn, fyn, fzn))
        .enumerate()
        .for_each(|(n, (fxn, fyn, fzn))| {
            let start = node_elem_start[n];
            let count = node_elem_count[n];
            let mut sx = 0.0;
            let mut sy = 0.0;
            let mut sz = 0.0;
            for &slot in &node_elem_corner_list[start..start + count] {
                sx += fx_elem[slot];
                sy += fy_elem[slot];
                sz += fz_elem[slot];
            }
            *fxn = sx;
            *fyn = sy;
            *fzn = sz;
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_element_stress_forces_sum_to_zero() {
        let nodelist = vec![0, 1, 2, 3, 4, 5, 6, 7];
        let x = vec![0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let y = vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        let z = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let zero = vec![0.0; 8];
        let p = vec![1.5e4];
        let q = vec![0.0];
        let volo = vec![1.0];
        let elem_mass = vec![1.0];
        let ss = vec![1.0];

        let (fx_elem, fy_elem, fz_elem) = calc_volume_force_for_elems(
            &nodelist, &x, &y, &z, &zero, &zero, &zero, &p, &q, &volo, &elem_mass, &ss, 3.0,
        )
        .expect("valid element");

        let sx: f64 = fx_elem.iter().sum();
        let sy: f64 = fy_elem.iter().sum();
        let sz: f64 = fz_elem.iter().sum();
        // A single hex under uniform pressure (no velocity, so no
        // hourglass contribution) exerts no net force on itself.
        assert!(sx.abs() < 1.0e-9, "sx = {sx}");
        assert!(sy.abs() < 1.0e-9, "sy = {sy}");
        assert!(sz.abs() < 1.0e-9, "sz = {sz}");
    }

    #[test]
    fn gather_forces_to_nodes_sums_per_node_contributions() {
        let node_elem_count = vec![1usize; 8];
        let node_elem_start: Vec<usize> = (0..8).collect();
        let node_elem_corner_list: Vec<usize> = (0..8).collect();
        let fx_elem: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let fy_elem = vec![1.0; 8];
        let fz_elem = vec![2.0; 8];

        let mut fx = vec![0.0; 8];
        let mut fy = vec![0.0; 8];
        let mut fz = vec![0.0; 8];
        gather_forces_to_nodes(
            &node_elem_count, &node_elem_start, &node_elem_corner_list,
            &fx_elem, &fy_elem, &fz_elem,
            &mut fx, &mut fy, &mut fz,
        );

        assert_eq!(fx, fx_elem);
        assert_eq!(fy, vec![1.0; 8]);
        assert_eq!(fz, vec![2.0; 8]);
    }
}
