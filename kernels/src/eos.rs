//! `ApplyMaterialPropertiesForElems` / `EvalEOSForElems` (spec §4.2
//! step 4): the three-step pressure-energy-Q iteration with the
//! gamma-law-linearized equation of state. Single material region
//! (spec Non-goals), so every array here spans all elements directly
//! rather than through a region index list.

use rayon::prelude::*;

use mesh::SimParams;

const SIXTH: f64 = 1.0 / 6.0;
const SSC_FLOOR: f64 = 0.1111111e-36;
const SSC_FLOOR_VALUE: f64 = 0.3333333e-18;

/// `CalcPressureForElems`: the gamma-law pressure closure
/// `p = (2/3)*(compression+1)*e`, floored/cut/clamped. Returns
/// `(p_new, bvc, pbvc)`; `bvc`/`pbvc` feed the sound-speed formula.
fn calc_pressure(e: f64, compression: f64, vnewc: f64, params: &SimParams) -> (f64, f64, f64) {
    let c1s = 2.0 / 3.0;
    let bvc = c1s * (compression + 1.0);
    let pbvc = c1s;

    let mut p_new = bvc * e;
    if p_new.abs() < params.p_cut {
        p_new = 0.0;
    }
    if vnewc >= params.eosvmax {
        p_new = 0.0;
    }
    if p_new < params.pmin {
        p_new = params.pmin;
    }
    (p_new, bvc, pbvc)
}

fn sound_speed(pbvc: f64, e: f64, vnewc: f64, bvc: f64, p: f64, rho0: f64) -> f64 {
    let ssc_sq = (pbvc * e + vnewc * vnewc * bvc * p) / rho0;
    if ssc_sq <= SSC_FLOOR {
        SSC_FLOOR_VALUE
    } else {
        ssc_sq.sqrt()
    }
}

/// Per-element scratch carried into the energy iteration; mirrors the
/// `e_old/p_old/q_old/delvc/...` compressed arrays the original
/// allocates per call.
#[derive(Clone, Copy, Debug, Default)]
pub struct EosInput {
    pub e_old: f64,
    pub p_old: f64,
    pub q_old: f64,
    pub qq_old: f64,
    pub ql_old: f64,
    pub delv: f64,
    pub vnewc: f64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EosOutput {
    pub p: f64,
    pub e: f64,
    pub q: f64,
    pub ss: f64,
}

/// One element's three-step pressure-energy-Q iteration: a half-step
/// estimate, a full step using `q_new`, then a correction step using
/// `q_tilde`, each re-evaluating pressure from the updated energy.
fn eval_energy_one(input: EosInput, params: &SimParams) -> EosOutput {
    let EosInput { e_old, q_old, qq_old, ql_old, delv, vnewc } = input;
    let mut p_old = input.p_old;

    let mut compression = 1.0 / vnewc - 1.0;
    let vhalf = vnewc - delv * 0.5;
    let mut comp_half_step = 1.0 / vhalf - 1.0;

    if vnewc <= params.eosvmin {
        comp_half_step = compression;
    }
    if vnewc >= params.eosvmax {
        p_old = 0.0;
        compression = 0.0;
        comp_half_step = 0.0;
    }

    let mut e_new = e_old - 0.5 * delv * (p_old + q_old);
    if e_new < params.emin {
        e_new = params.emin;
    }

    let (p_half_step, bvc, pbvc) = calc_pressure(e_new, comp_half_step, vnewc, params);

    let vhalf_inv = 1.0 / (1.0 + comp_half_step);
    let mut q_new = if delv > 0.0 {
        0.0
    } else {
        let ssc = sound_speed(pbvc, e_new, vhalf_inv, bvc, p_half_step, params.refdens);
        ssc * ql_old + qq_old
    };

    e_new += 0.5 * delv * (3.0 * (p_old + q_old) - 4.0 * (p_half_step + q_new));
    if e_new.abs() < params.e_cut {
        e_new = 0.0;
    }
    if e_new < params.emin {
        e_new = params.emin;
    }

    let (mut p_new, mut bvc, mut pbvc) = calc_pressure(e_new, compression, vnewc, params);

    let q_tilde = if delv > 0.0 {
        0.0
    } else {
        let ssc = sound_speed(pbvc, e_new, vnewc, bvc, p_new, params.refdens);
        ssc * ql_old + qq_old
    };

    e_new -= (7.0 * (p_old + q_old) - 8.0 * (p_half_step + q_new) + (p_new + q_tilde)) * delv * SIXTH;
    if e_new.abs() < params.e_cut {
        e_new = 0.0;
    }
    if e_new < params.emin {
        e_new = params.emin;
    }

    (p_new, bvc, pbvc) = calc_pressure(e_new, compression, vnewc, params);

    let ss = sound_speed(pbvc, e_new, vnewc, bvc, p_new, params.refdens);

    if delv <= 0.0 {
        q_new = ss * ql_old + qq_old;
        if q_new.abs() < params.q_cut {
            q_new = 0.0;
        }
    } else {
        q_new = 0.0;
    }

    EosOutput { p: p_new, e: e_new, q: q_new, ss }
}

/// `EvalEOSForElems` + `CalcSoundSpeedForElems`: returns updated
/// `(p, e, q, ss)` per element.
pub fn eval_eos_for_elems(
    e: &[f64], p: &[f64], q: &[f64], qq: &[f64], ql: &[f64],
    delv: &[f64], vnewc: &[f64],
    params: &SimParams,
) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
    let num_elem = e.len();
    let results: Vec<EosOutput> = (0..num_elem)
        .into_par_iter()
        .map(|i| {
            eval_energy_one(
                EosInput {
                    e_old: e[i],
                    p_old: p[i],
                    q_old: q[i],
                    qq_old: qq[i],
                    ql_old: ql[i],
                    delv: delv[i],
                    vnewc: vnewc[i],
                },
                params,
            )
        })
        .collect();

    let mut p_out = vec![0.0; num_elem];
    let mut e_out = vec![0.0; num_elem];
    let mut q_out = vec![0.0; num_elem];
    let mut ss_out = vec![0.0; num_elem];
    for (i, r) in results.into_iter().enumerate() {
        p_out[i] = r.p;
        e_out[i] = r.e;
        q_out[i] = r.q;
        ss_out[i] = r.ss;
    }
    (p_out, e_out, q_out, ss_out)
}

/// `ApplyMaterialPropertiesForElems`: clamps `vnewc` into
/// `[eosvmin, eosvmax]`, returning the clamped copy passed into
/// `eval_eos_for_elems` (spec I1: the raw, unclamped `v` must still be
/// checked positive by the caller before this runs).
pub fn clamp_vnewc(vnew: &[f64], params: &SimParams) -> Vec<f64> {
    vnew.par_iter()
        .map(|&v| v.clamp(params.eosvmin, params.eosvmax))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_vnewc_respects_bounds() {
        let params = SimParams::default();
        let raw = vec![params.eosvmin * 0.1, 1.0, params.eosvmax * 10.0];
        let clamped = clamp_vnewc(&raw, &params);
        assert_eq!(clamped[0], params.eosvmin);
        assert_eq!(clamped[1], 1.0);
        assert_eq!(clamped[2], params.eosvmax);
    }

    #[test]
    fn quiescent_element_stays_at_rest() {
        let params = SimParams::default();
        let e = vec![0.0];
        let p = vec![0.0];
        let q = vec![0.0];
        let qq = vec![0.0];
        let ql = vec![0.0];
        let delv = vec![0.0];
        let vnewc = vec![1.0];

        let (p_out, e_out, q_out, ss_out) = eval_eos_for_elems(&e, &p, &q, &qq, &ql, &delv, &vnewc, &params);
        assert_eq!(p_out[0], 0.0);
        assert_eq!(e_out[0], 0.0);
        assert_eq!(q_out[0], 0.0);
        // No compression, no energy: sound speed floors rather than
        // going to exactly zero.
        assert!(ss_out[0] > 0.0);
    }

    #[test]
    fn compression_raises_pressure() {
        let params = SimParams::default();
        let e = vec![1.0e6];
        let p = vec![0.0];
        let q = vec![0.0];
        let qq = vec![0.0];
        let ql = vec![0.0];
        let delv = vec![-0.05];
        let vnewc = vec![0.95];

        let (p_out, _, _, _) = eval_eos_for_elems(&e, &p, &q, &qq, &ql, &delv, &vnewc, &params);
        assert!(p_out[0] > 0.0, "compressed element should have positive pressure, got {}", p_out[0]);
    }
}
