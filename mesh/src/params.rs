//! Dimensionless constants and tolerances shared by every kernel.
//!
//! These mirror the globals carried on the original `Domain` record
//! (spec §3, "Global simulation state"). Grouped into their own struct
//! rather than scattered `const`s so a future multi-region or
//! unit-test configuration can vary them without touching kernel code.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimParams {
    pub hgcoef: f64,
    pub qqc: f64,
    pub ss4o3: f64,
    pub monoq_limiter_mult: f64,
    pub monoq_max_slope: f64,
    pub qlc_monoq: f64,
    pub qqc_monoq: f64,
    pub refdens: f64,
    pub pmin: f64,
    pub emin: f64,
    pub eosvmin: f64,
    pub eosvmax: f64,
    pub e_cut: f64,
    pub p_cut: f64,
    pub q_cut: f64,
    pub u_cut: f64,
    pub v_cut: f64,
    pub dvovmax: f64,
    pub dtmax: f64,
    pub deltatimemultlb: f64,
    pub deltatimemultub: f64,
    pub qstop: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            hgcoef: 3.0,
            qqc: 2.0,
            ss4o3: 4.0 / 3.0,
            monoq_limiter_mult: 2.0,
            monoq_max_slope: 1.0,
            qlc_monoq: 0.5,
            qqc_monoq: 2.0 / 3.0,
            refdens: 1.0,
            pmin: 0.0,
            emin: -1.0e15,
            eosvmin: 1.0e-9,
            eosvmax: 1.0e9,
            e_cut: 1.0e-7,
            p_cut: 1.0e-7,
            q_cut: 1.0e-7,
            u_cut: 1.0e-7,
            v_cut: 1.0e-10,
            dvovmax: 0.1,
            dtmax: 1.0e-2,
            deltatimemultlb: 1.1,
            deltatimemultub: 1.2,
            qstop: 1.0e12,
        }
    }
}
