//! The per-cycle Lagrange driver (spec §4.2): `LagrangeNodal` then
//! `LagrangeElements`, composed by [`run_cycle`] in `lib.rs`.
//!
//! The state machine named in the spec (`Idle -> HaveForces ->
//! HaveAccel -> HavePosVel -> HaveGradients -> HaveQ -> HaveEOS ->
//! Idle`) has no branching to speak of — every cycle walks it in the
//! same fixed order — so it is carried here only as a `log::trace!`
//! breadcrumb at each step rather than as a dispatched enum.

use halo_net::HaloConnections;
use kernels::eos;
use log::trace;
use mesh::Domain;
use rayon::prelude::*;

use crate::error::SolverError;

/// `LagrangeNodal` (spec §4.2, 9 steps): nodal force assembly, halo
/// sum, acceleration, symmetry-plane zeroing, velocity/position
/// integration, halo sync.
pub async fn lagrange_nodal(domain: &mut Domain, conn: &mut HaloConnections) -> Result<(), SolverError> {
    trace!("cycle {}: LagrangeNodal", domain.cycle);
    let nx1 = domain.nx + 1;
    let dt = domain.deltatime;

    domain.fx.par_iter_mut().for_each(|v| *v = 0.0);
    domain.fy.par_iter_mut().for_each(|v| *v = 0.0);
    domain.fz.par_iter_mut().for_each(|v| *v = 0.0);

    let (fx_elem, fy_elem, fz_elem) = kernels::calc_volume_force_for_elems(
        &domain.nodelist,
        &domain.x, &domain.y, &domain.z,
        &domain.xd, &domain.yd, &domain.zd,
        &domain.p, &domain.q,
        &domain.volo, &domain.elem_mass, &domain.ss,
        domain.params.hgcoef,
    )?;

    kernels::gather_forces_to_nodes(
        &domain.node_elem_count, &domain.node_elem_start, &domain.node_elem_corner_list,
        &fx_elem, &fy_elem, &fz_elem,
        &mut domain.fx, &mut domain.fy, &mut domain.fz,
    );
    trace!("cycle {}: HaveForces", domain.cycle);

    halo_net::comm_sbn(conn, &mut [&mut domain.fx, &mut domain.fy, &mut domain.fz], nx1).await?;

    domain.xdd
        .par_iter_mut()
        .zip(domain.ydd.par_iter_mut())
        .zip(domain.zdd.par_iter_mut())
        .enumerate()
        .for_each(|(n, ((xdd, ydd), zdd))| {
            *xdd = domain.fx[n] / domain.nodal_mass[n];
            *ydd = domain.fy[n] / domain.nodal_mass[n];
            *zdd = domain.fz[n] / domain.nodal_mass[n];
        });

    for &n in &domain.symm_x {
        domain.xdd[n] = 0.0;
    }
    for &n in &domain.symm_y {
        domain.ydd[n] = 0.0;
    }
    for &n in &domain.symm_z {
        domain.zdd[n] = 0.0;
    }
    trace!("cycle {}: HaveAccel", domain.cycle);

    let u_cut = domain.params.u_cut;
    domain.xd
        .par_iter_mut()
        .zip(domain.yd.par_iter_mut())
        .zip(domain.zd.par_iter_mut())
        .enumerate()
        .for_each(|(n, ((xd, yd), zd))| {
            *xd += domain.xdd[n] * dt;
            if xd.abs() < u_cut {
                *xd = 0.0;
            }
            *yd += domain.ydd[n] * dt;
            if yd.abs() < u_cut {
                *yd = 0.0;
            }
            *zd += domain.zdd[n] * dt;
            if zd.abs() < u_cut {
                *zd = 0.0;
            }
        });

    domain.x
        .par_iter_mut()
        .zip(domain.y.par_iter_mut())
        .zip(domain.z.par_iter_mut())
        .enumerate()
        .for_each(|(n, ((x, y), z))| {
            *x += domain.xd[n] * dt;
            *y += domain.yd[n] * dt;
            *z += domain.zd[n] * dt;
        });
    trace!("cycle {}: HavePosVel (local)", domain.cycle);

    halo_net::comm_sync_pos_vel(
        conn,
        &mut [
            &mut domain.x, &mut domain.y, &mut domain.z,
            &mut domain.xd, &mut domain.yd, &mut domain.zd,
        ],
        nx1,
    )
    .await?;
    trace!("cycle {}: HavePosVel (synced)", domain.cycle);

    Ok(())
}

/// `LagrangeElements` (spec §4.2, 5 steps): kinematics, monotonic-Q
/// region, equation of state, volume update.
pub async fn lagrange_elements(domain: &mut Domain, conn: &mut HaloConnections) -> Result<(), SolverError> {
    trace!("cycle {}: LagrangeElements", domain.cycle);
    let dt = domain.deltatime;

    let kin = kernels::calc_kinematics_for_elems(
        &domain.nodelist, &domain.volo, &domain.v,
        &domain.x, &domain.y, &domain.z,
        &domain.xd, &domain.yd, &domain.zd,
        dt,
    )?;

    let mut vnew = vec![0.0; domain.num_elem];
    for (i, k) in kin.iter().enumerate() {
        vnew[i] = k.vnew;
        domain.delv[i] = k.delv;
        domain.arealg[i] = k.arealg;
        // Deviatoric decomposition (subtracting vdov/3 from each
        // principal strain) has no consumer in this workspace: only
        // the trace (vdov) feeds the monotonic-Q region and the time
        // constraints below, and that sum is invariant under the
        // subtraction. Kept as a one-line note rather than dead fields.
        domain.vdov[i] = k.dxx + k.dyy + k.dzz;
    }
    trace!("cycle {}: HaveGradients (kinematics)", domain.cycle);

    let grad = kernels::calc_monotonic_q_gradients_for_elems(
        &domain.nodelist,
        &domain.x, &domain.y, &domain.z,
        &domain.xd, &domain.yd, &domain.zd,
        &domain.volo, &vnew,
    );

    let num_ghost = mesh::ghost::num_ghost_slots(domain.nx);
    let mut delv_xi_ext = vec![0.0; domain.num_elem + num_ghost];
    let mut delv_eta_ext = vec![0.0; domain.num_elem + num_ghost];
    let mut delv_zeta_ext = vec![0.0; domain.num_elem + num_ghost];
    let send_xi: Vec<f64> = grad.iter().map(|g| g.delv_xi).collect();
    let send_eta: Vec<f64> = grad.iter().map(|g| g.delv_eta).collect();
    let send_zeta: Vec<f64> = grad.iter().map(|g| g.delv_zeta).collect();
    delv_xi_ext[..domain.num_elem].copy_from_slice(&send_xi);
    delv_eta_ext[..domain.num_elem].copy_from_slice(&send_eta);
    delv_zeta_ext[..domain.num_elem].copy_from_slice(&send_zeta);

    halo_net::comm_mono_q(
        conn,
        &[&send_xi, &send_eta, &send_zeta],
        &mut [&mut delv_xi_ext, &mut delv_eta_ext, &mut delv_zeta_ext],
        domain.num_elem,
        domain.nx,
    )
    .await?;
    trace!("cycle {}: HaveQ (gradients exchanged)", domain.cycle);

    let (qq, ql) = kernels::calc_monotonic_q_for_elems(
        &grad,
        &delv_xi_ext, &delv_eta_ext, &delv_zeta_ext,
        &domain.elem_bc,
        &domain.lxim, &domain.lxip, &domain.letam, &domain.letap, &domain.lzetam, &domain.lzetap,
        &domain.vdov, &domain.elem_mass, &domain.volo, &vnew,
        &domain.params,
    )?;
    domain.qq.copy_from_slice(&qq);
    domain.ql.copy_from_slice(&ql);
    trace!("cycle {}: HaveQ", domain.cycle);

    for (i, &v) in domain.v.iter().enumerate() {
        if v <= 0.0 {
            return Err(kernels::KernelError::NegativeVolume { elem: i, volume: v }.into());
        }
    }
    let clamped_vnew = eos::clamp_vnewc(&vnew, &domain.params);

    let (p_new, e_new, q_new, ss_new) = eos::eval_eos_for_elems(
        &domain.e, &domain.p, &domain.q, &domain.qq, &domain.ql,
        &domain.delv, &clamped_vnew,
        &domain.params,
    );
    domain.p.copy_from_slice(&p_new);
    domain.e.copy_from_slice(&e_new);
    domain.q.copy_from_slice(&q_new);
    domain.ss.copy_from_slice(&ss_new);
    trace!("cycle {}: HaveEOS", domain.cycle);

    let v_cut = domain.params.v_cut;
    for i in 0..domain.num_elem {
        domain.v[i] = vnew[i];
        if (domain.v[i] - 1.0).abs() < v_cut {
            domain.v[i] = 1.0;
        }
    }

    Ok(())
}
