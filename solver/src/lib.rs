//! The Lagrange driver: the per-cycle compute/communicate sequence
//! (spec §4.2) threaded explicitly over a `mesh::Domain`, plus the
//! global time-step negotiation that closes each cycle.

pub mod cycle;
pub mod error;
pub mod time;

use halo_net::{HaloConnections, KingConnections};
use log::debug;
use mesh::Domain;

pub use cycle::{lagrange_elements, lagrange_nodal};
pub use error::SolverError;
pub use time::time_increment;

/// Runs one full cycle: `LagrangeNodal`, `LagrangeElements`,
/// `CalcTimeConstraints`, then `TimeIncrement` to prepare `deltatime`
/// for the next cycle.
pub async fn run_cycle(
    domain: &mut Domain,
    halo: &mut HaloConnections,
    king: &mut KingConnections,
    stop_time: f64,
) -> Result<(), SolverError> {
    lagrange_nodal(domain, halo).await?;
    lagrange_elements(domain, halo).await?;

    let local = kernels::calc_time_constraints(&domain.ss, &domain.vdov, &domain.arealg, &domain.params);
    debug!(
        "rank {} cycle {}: local courant={:e} hydro={:e}",
        domain.layout.rank, domain.cycle, local.courant, local.hydro
    );

    time_increment(domain, king, local, stop_time).await?;
    Ok(())
}
