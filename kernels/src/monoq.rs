//! Monotonic artificial-viscosity region (spec §4.2 step 2):
//! `CalcMonotonicQGradientsForElems` computes per-element directional
//! position/velocity gradients; `CalcMonotonicQForElems` resolves each
//! element's face neighbor through the boundary-condition mask (spec
//! §3), limits the slope, and produces `qq`/`ql`.

use rayon::prelude::*;

use mesh::boundary::{Axis, FaceKind, Side};
use mesh::SimParams;

use crate::error::KernelError;

const PTINY: f64 = 1.0e-36;

fn gather8(field: &[f64], corners: &[usize]) -> [f64; 8] {
    let mut out = [0.0; 8];
    for (i, o) in out.iter_mut().enumerate() {
        *o = field[corners[i]];
    }
    out
}

/// Per-element directional gradients used by the monotonic limiter.
#[derive(Clone, Copy, Debug, Default)]
pub struct ElemMonoQGradients {
    pub delx_xi: f64,
    pub delx_eta: f64,
    pub delx_zeta: f64,
    pub delv_xi: f64,
    pub delv_eta: f64,
    pub delv_zeta: f64,
}

/// `CalcMonotonicQGradientsForElems`: cross products of the three
/// face-center-to-face-center position deltas give the (i,j,k) frame;
/// the matching velocity deltas projected onto that frame give the
/// directional velocity gradients.
pub fn calc_monotonic_q_gradients_for_elems(
    nodelist: &[usize],
    x: &[f64], y: &[f64], z: &[f64],
    xd: &[f64], yd: &[f64], zd: &[f64],
    volo: &[f64], vnew: &[f64],
) -> Vec<ElemMonoQGradients> {
    let num_elem = volo.len();
    (0..num_elem)
        .into_par_iter()
        .map(|i| {
            let corners = &nodelist[8 * i..8 * i + 8];
            let xl = gather8(x, corners);
            let yl = gather8(y, corners);
            let zl = gather8(z, corners);
            let xv = gather8(xd, corners);
            let yv = gather8(yd, corners);
            let zv = gather8(zd, corners);

            let vol = volo[i] * vnew[i];
            let norm = 1.0 / (vol + PTINY);

            let dxj = -0.25 * ((xl[0] + xl[1] + xl[5] + xl[4]) - (xl[3] + xl[2] + xl[6] + xl[7]));
            let dyj = -0.25 * ((yl[0] + yl[1] + yl[5] + yl[4]) - (yl[3] + yl[2] + yl[6] + yl[7]));
            let dzj = -0.25 * ((zl[0] + zl[1] + zl[5] + zl[4]) - (zl[3] + zl[2] + zl[6] + zl[7]));

            let dxi = 0.25 * ((xl[1] + xl[2] + xl[6] + xl[5]) - (xl[0] + xl[3] + xl[7] + xl[4]));
            let dyi = 0.25 * ((yl[1] + yl[2] + yl[6] + yl[5]) - (yl[0] + yl[3] + yl[7] + yl[4]));
            let dzi = 0.25 * ((zl[1] + zl[2] + zl[6] + zl[5]) - (zl[0] + zl[3] + zl[7] + zl[4]));

            let dxk = 0.25 * ((xl[4] + xl[5] + xl[6] + xl[7]) - (xl[0] + xl[1] + xl[2] + xl[3]));
            let dyk = 0.25 * ((yl[4] + yl[5] + yl[6] + yl[7]) - (yl[0] + yl[1] + yl[2] + yl[3]));
            let dzk = 0.25 * ((zl[4] + zl[5] + zl[6] + zl[7]) - (zl[0] + zl[1] + zl[2] + zl[3]));

            // delx_zeta/delv_zeta: i cross j
            let mut ax = dyi * dzj - dzi * dyj;
            let mut ay = dzi * dxj - dxi * dzj;
            let mut az = dxi * dyj - dyi * dxj;
            let delx_zeta = vol / (ax * ax + ay * ay + az * az + PTINY).sqrt();
            ax *= norm;
            ay *= norm;
            az *= norm;
            let dxv = 0.25 * ((xv[4] + xv[5] + xv[6] + xv[7]) - (xv[0] + xv[1] + xv[2] + xv[3]));
            let dyv = 0.25 * ((yv[4] + yv[5] + yv[6] + yv[7]) - (yv[0] + yv[1] + yv[2] + yv[3]));
            let dzv = 0.25 * ((zv[4] + zv[5] + zv[6] + zv[7]) - (zv[0] + zv[1] + zv[2] + zv[3]));
            let delv_zeta = ax * dxv + ay * dyv + az * dzv;

            // delx_xi/delv_xi: j cross k
            let mut ax = dyj * dzk - dzj * dyk;
            let mut ay = dzj * dxk - dxj * dzk;
            let mut az = dxj * dyk - dyj * dxk;
            let delx_xi = vol / (ax * ax + ay * ay + az * az + PTINY).sqrt();
            ax *= norm;
            ay *= norm;
            az *= norm;
            let dxv = 0.25 * ((xv[1] + xv[2] + xv[6] + xv[5]) - (xv[0] + xv[3] + xv[7] + xv[4]));
            let dyv = 0.25 * ((yv[1] + yv[2] + yv[6] + yv[5]) - (yv[0] + yv[3] + yv[7] + yv[4]));
            let dzv = 0.25 * ((zv[1] + zv[2] + zv[6] + zv[5]) - (zv[0] + zv[3] + zv[7] + zv[4]));
            let delv_xi = ax * dxv + ay * dyv + az * dzv;

            // delx_eta/delv_eta: k cross i
            let mut ax = dyk * dzi - dzk * dyi;
            let mut ay = dzk * dxi - dxk * dzi;
            let mut az = dxk * dyi - dyk * dxi;
            let delx_eta = vol / (ax * ax + ay * ay + az * az + PTINY).sqrt();
            ax *= norm;
            ay *= norm;
            az *= norm;
            let dxv = -0.25 * ((xv[0] + xv[1] + xv[5] + xv[4]) - (xv[3] + xv[2] + xv[6] + xv[7]));
            let dyv = -0.25 * ((yv[0] + yv[1] + yv[5] + yv[4]) - (yv[3] + yv[2] + yv[6] + yv[7]));
            let dzv = -0.25 * ((zv[0] + zv[1] + zv[5] + zv[4]) - (zv[3] + zv[2] + zv[6] + zv[7]));
            let delv_eta = ax * dxv + ay * dyv + az * dzv;

            ElemMonoQGradients { delx_xi, delx_eta, delx_zeta, delv_xi, delv_eta, delv_zeta }
        })
        .collect()
}

/// Resolves one side's `delv` through the boundary-condition mask:
/// `Comm` reads the (possibly ghosted) neighbor's own gradient, `Symm`
/// mirrors this element's value, `Free` contributes nothing.
fn resolve_delv(kind: FaceKind, self_val: f64, neighbor_idx: usize, delv_ext: &[f64]) -> f64 {
    match kind {
        FaceKind::Comm => delv_ext[neighbor_idx],
        FaceKind::Symm => self_val,
        FaceKind::Free => 0.0,
    }
}

fn limit_slope(delvm: f64, delvp: f64, norm: f64, limiter_mult: f64, max_slope: f64) -> f64 {
    let delvm = delvm * norm;
    let delvp = delvp * norm;
    let mut phi = 0.5 * (delvm + delvp);
    let delvm = delvm * limiter_mult;
    let delvp = delvp * limiter_mult;
    if delvm < phi {
        phi = delvm;
    }
    if delvp < phi {
        phi = delvp;
    }
    if phi < 0.0 {
        phi = 0.0;
    }
    if phi > max_slope {
        phi = max_slope;
    }
    phi
}

/// `CalcMonotonicQForElems`: limits the directional gradients into
/// `qlin`/`qquad`, then aborts with `KernelError::QStop` if any
/// resulting `q` exceeds `params.qstop` (spec §4.2 edge case, §7).
///
/// `delv_xi_ext`/`delv_eta_ext`/`delv_zeta_ext` must be extended with
/// the ghost tail filled by `halo_net::comm_mono_q` before this runs;
/// `lxim`/`lxip`/... index into that extended range for `Comm` faces.
#[allow(clippy::too_many_arguments)]
pub fn calc_monotonic_q_for_elems(
    grad: &[ElemMonoQGradients],
    delv_xi_ext: &[f64], delv_eta_ext: &[f64], delv_zeta_ext: &[f64],
    elem_bc: &[u32],
    lxim: &[usize], lxip: &[usize],
    letam: &[usize], letap: &[usize],
    lzetam: &[usize], lzetap: &[usize],
    vdov: &[f64], elem_mass: &[f64], volo: &[f64], vnew: &[f64],
    params: &SimParams,
) -> Result<(Vec<f64>, Vec<f64>), KernelError> {
    let num_elem = grad.len();
    let mut qq = vec![0.0; num_elem];
    let mut ql = vec![0.0; num_elem];

    for i in 0..num_elem {
        let g = grad[i];
        let bc = elem_bc[i];

        let norm_xi = 1.0 / (g.delv_xi + PTINY);
        let delvm = resolve_delv(mesh::boundary::face_kind(bc, Axis::Xi, Side::Minus), g.delv_xi, lxim[i], delv_xi_ext);
        let delvp = resolve_delv(mesh::boundary::face_kind(bc, Axis::Xi, Side::Plus), g.delv_xi, lxip[i], delv_xi_ext);
        let phixi = limit_slope(delvm, delvp, norm_xi, params.monoq_limiter_mult, params.monoq_max_slope);

        let norm_eta = 1.0 / (g.delv_eta + PTINY);
        let delvm = resolve_delv(mesh::boundary::face_kind(bc, Axis::Eta, Side::Minus), g.delv_eta, letam[i], delv_eta_ext);
        let delvp = resolve_delv(mesh::boundary::face_kind(bc, Axis::Eta, Side::Plus), g.delv_eta, letap[i], delv_eta_ext);
        let phieta = limit_slope(delvm, delvp, norm_eta, params.monoq_limiter_mult, params.monoq_max_slope);

        let norm_zeta = 1.0 / (g.delv_zeta + PTINY);
        let delvm = resolve_delv(mesh::boundary::face_kind(bc, Axis::Zeta, Side::Minus), g.delv_zeta, lzetam[i], delv_zeta_ext);
        let delvp = resolve_delv(mesh::boundary::face_kind(bc, Axis::Zeta, Side::Plus), g.delv_zeta, lzetap[i], delv_zeta_ext);
        let phizeta = limit_slope(delvm, delvp, norm_zeta, params.monoq_limiter_mult, params.monoq_max_slope);

        let (qlin, qquad) = if vdov[i] > 0.0 {
            (0.0, 0.0)
        } else {
            let delvxxi = (g.delv_xi * g.delx_xi).min(0.0);
            let delvxeta = (g.delv_eta * g.delx_eta).min(0.0);
            let delvxzeta = (g.delv_zeta * g.delx_zeta).min(0.0);

            let rho = elem_mass[i] / (volo[i] * vnew[i]);

            let qlin = -params.qlc_monoq
                * rho
                * (delvxxi * (1.0 - phixi)
                    + delvxeta * (1.0 - phieta)
                    + delvxzeta * (1.0 - phizeta));

            let qquad = params.qqc_monoq
                * rho
                * (delvxxi * delvxxi * (1.0 - phixi * phixi)
                    + delvxeta * delvxeta * (1.0 - phieta * phieta)
                    + delvxzeta * delvxzeta * (1.0 - phizeta * phizeta));

            (qlin, qquad)
        };

        qq[i] = qquad;
        ql[i] = qlin;

        let q = qlin + qquad;
        if q > params.qstop {
            return Err(KernelError::QStop { elem: i, q, qstop: params.qstop });
        }
    }

    Ok((qq, ql))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_FREE: u32 = mesh::boundary::XI_M_FREE
        | mesh::boundary::XI_P_FREE
        | mesh::boundary::ETA_M_FREE
        | mesh::boundary::ETA_P_FREE
        | mesh::boundary::ZETA_M_FREE
        | mesh::boundary::ZETA_P_FREE;

    #[test]
    fn static_cube_has_zero_gradients() {
        let nodelist = vec![0, 1, 2, 3, 4, 5, 6, 7];
        let x = vec![0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let y = vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        let z = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let zero = vec![0.0; 8];
        let volo = vec![1.0];
        let vnew = vec![1.0];

        let grad = calc_monotonic_q_gradients_for_elems(
            &nodelist, &x, &y, &z, &zero, &zero, &zero, &volo, &vnew,
        );
        assert_eq!(grad.len(), 1);
        assert_eq!(grad[0].delv_xi, 0.0);
        assert_eq!(grad[0].delv_eta, 0.0);
        assert_eq!(grad[0].delv_zeta, 0.0);
    }

    #[test]
    fn expanding_element_yields_zero_q() {
        let grad = vec![ElemMonoQGradients {
            delx_xi: 1.0,
            delx_eta: 1.0,
            delx_zeta: 1.0,
            delv_xi: 0.0,
            delv_eta: 0.0,
            delv_zeta: 0.0,
        }];
        let ext = vec![0.0];
        let elem_bc = vec![ALL_FREE];
        let idx = vec![0usize];
        let vdov = vec![1.0]; // expanding -> qlin/qquad forced to zero
        let mass = vec![1.0];
        let volo = vec![1.0];
        let vnew = vec![1.0];
        let params = SimParams::default();

        let (qq, ql) = calc_monotonic_q_for_elems(
            &grad, &ext, &ext, &ext, &elem_bc,
            &idx, &idx, &idx, &idx, &idx, &idx,
            &vdov, &mass, &volo, &vnew, &params,
        )
        .expect("no qstop");
        assert_eq!(qq[0], 0.0);
        assert_eq!(ql[0], 0.0);
    }

    #[test]
    fn extreme_compression_triggers_qstop() {
        let grad = vec![ElemMonoQGradients {
            delx_xi: 1.0,
            delx_eta: 0.0,
            delx_zeta: 0.0,
            delv_xi: -1.0e6,
            delv_eta: 0.0,
            delv_zeta: 0.0,
        }];
        let ext = vec![0.0];
        let elem_bc = vec![ALL_FREE];
        let idx = vec![0usize];
        let vdov = vec![-1.0]; // compressing
        let mass = vec![1.0e10];
        let volo = vec![1.0];
        let vnew = vec![1.0];
        let params = SimParams::default();

        let err = calc_monotonic_q_for_elems(
            &grad, &ext, &ext, &ext, &elem_bc,
            &idx, &idx, &idx, &idx, &idx, &idx,
            &vdov, &mass, &volo, &vnew, &params,
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::QStop { elem: 0, .. }));
    }
}
