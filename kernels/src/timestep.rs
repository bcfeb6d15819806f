//! `CalcTimeConstraints` (spec §4.2 step 5): per-element Courant and
//! hydro time-step bounds, reduced to the tightest constraint across
//! the subdomain. The global minimum across ranks is taken by the
//! caller (an Allreduce sits at the boundary between this crate and
//! the distributed driver).

use rayon::prelude::*;

use mesh::SimParams;

/// Courant-limited and hydro-limited local time-step bounds.
#[derive(Clone, Copy, Debug)]
pub struct TimeConstraints {
    pub courant: f64,
    pub hydro: f64,
}

/// Folds every element with nonzero `vdov` into the tightest
/// (smallest) Courant and hydro bound; elements with `vdov == 0` do
/// not constrain the step (spec §4.2: "restricted to elements with
/// `vdov != 0`").
pub fn calc_time_constraints(
    ss: &[f64], vdov: &[f64], arealg: &[f64], params: &SimParams,
) -> TimeConstraints {
    let num_elem = ss.len();
    (0..num_elem)
        .into_par_iter()
        .filter(|&i| vdov[i] != 0.0)
        .map(|i| {
            let v = vdov[i];
            let a = arealg[i];
            let courant = a / (ss[i] * ss[i] + 64.0 * params.qqc * params.qqc * a * a * v * v).sqrt();
            let hydro = params.dvovmax / (v.abs() + 1.0e-20);
            (courant, hydro)
        })
        .reduce(
            || (f64::MAX, f64::MAX),
            |(c0, h0), (c1, h1)| (c0.min(c1), h0.min(h1)),
        )
        .into()
}

impl From<(f64, f64)> for TimeConstraints {
    fn from((courant, hydro): (f64, f64)) -> Self {
        TimeConstraints { courant, hydro }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_static_elements_impose_no_constraint() {
        let params = SimParams::default();
        let ss = vec![1.0; 4];
        let vdov = vec![0.0; 4];
        let arealg = vec![1.0; 4];
        let tc = calc_time_constraints(&ss, &vdov, &arealg, &params);
        assert_eq!(tc.courant, f64::MAX);
        assert_eq!(tc.hydro, f64::MAX);
    }

    #[test]
    fn tightest_element_dominates() {
        let params = SimParams::default();
        let ss = vec![1.0, 1.0];
        let vdov = vec![-0.01, -0.5];
        let arealg = vec![1.0, 0.1];
        let tc = calc_time_constraints(&ss, &vdov, &arealg, &params);
        // element 1 has the smaller characteristic length and the
        // larger volume derivative, so it should set both bounds.
        let expected_courant =
            0.1 / (1.0f64 + 64.0 * params.qqc * params.qqc * 0.1 * 0.1 * 0.5 * 0.5).sqrt();
        let expected_hydro = params.dvovmax / 0.5;
        assert!((tc.courant - expected_courant).abs() < 1.0e-12);
        assert!((tc.hydro - expected_hydro).abs() < 1.0e-12);
    }
}
