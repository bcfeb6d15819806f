//! `TimeIncrement` (spec §4.3): turn this cycle's local Courant/hydro
//! constraints into the next `deltatime`, agreed globally across every
//! rank via a king-rooted `Allreduce(MIN)`.

use halo_net::KingConnections;
use kernels::TimeConstraints;
use log::trace;
use mesh::Domain;

use crate::error::SolverError;

/// Ratio applied to the hydro constraint (spec: "two thirds of the
/// hydro constraint, half of the Courant constraint").
const HYDRO_FACTOR: f64 = 2.0 / 3.0;
const COURANT_FACTOR: f64 = 0.5;

pub async fn time_increment(
    domain: &mut Domain,
    king: &mut KingConnections,
    local: TimeConstraints,
    stop_time: f64,
) -> Result<(), SolverError> {
    let params = &domain.params;

    let mut new_dt = f64::MAX;
    if local.courant.is_finite() {
        new_dt = new_dt.min(COURANT_FACTOR * local.courant);
    }
    if local.hydro.is_finite() {
        new_dt = new_dt.min(HYDRO_FACTOR * local.hydro);
    }

    let global_dt = king.allreduce_min(new_dt).await?;

    let old_dt = domain.deltatime;
    let ratio = global_dt / old_dt;

    let mut dt = global_dt;
    if ratio >= 1.0 {
        if ratio * params.deltatimemultlb < 1.0 {
            dt = old_dt;
        } else if ratio > params.deltatimemultub {
            dt = old_dt * params.deltatimemultub;
        }
    }
    if dt > params.dtmax {
        dt = params.dtmax;
    }

    // Avoid a vanishingly small final step: if the remaining time to
    // stop_time would leave a sliver between one and four-thirds of
    // the current step, take two-thirds of it instead and land short
    // rather than overshoot-then-crawl.
    let target_time = stop_time;
    let remaining = target_time - domain.time;
    if dt > remaining && remaining > 0.0 {
        dt = remaining;
    } else if remaining > dt && remaining < (4.0 / 3.0) * dt {
        dt = (2.0 / 3.0) * remaining;
    }

    domain.deltatime = dt;
    domain.time += dt;
    domain.cycle += 1;

    trace!(
        "rank {} cycle {}: deltatime={:e} time={:e}",
        domain.layout.rank, domain.cycle, domain.deltatime, domain.time
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::SimParams;

    async fn single_rank_domain() -> (Domain, KingConnections) {
        let domain = Domain::new(0, 1, 2, SimParams::default()).expect("valid domain");
        let king = KingConnections::connect_all(0, 1, &[]).await.expect("trivial king");
        (domain, king)
    }

    #[tokio::test]
    async fn advances_time_and_cycle() {
        let (mut domain, mut king) = single_rank_domain().await;
        let before = domain.deltatime;
        let local = TimeConstraints { courant: before * 4.0, hydro: before * 4.0 };

        time_increment(&mut domain, &mut king, local, 1.0).await.unwrap();

        assert_eq!(domain.cycle, 1);
        assert!(domain.time > 0.0);
        assert!(domain.deltatime > 0.0);
    }

    #[tokio::test]
    async fn never_exceeds_dtmax() {
        let (mut domain, mut king) = single_rank_domain().await;
        domain.deltatime = domain.params.dtmax;
        let huge = domain.params.dtmax * 1000.0;
        let local = TimeConstraints { courant: huge, hydro: huge };

        time_increment(&mut domain, &mut king, local, 1.0).await.unwrap();

        assert!(domain.deltatime <= domain.params.dtmax);
    }

    #[tokio::test]
    async fn clamps_to_exact_remaining_time_at_stop() {
        let (mut domain, mut king) = single_rank_domain().await;
        domain.deltatime = 0.01;
        domain.time = 0.995;
        let local = TimeConstraints { courant: 0.02, hydro: 0.02 };

        time_increment(&mut domain, &mut king, local, 1.0).await.unwrap();

        assert!((domain.deltatime - 0.005).abs() < 1.0e-12);
        assert!((domain.time - 1.0).abs() < 1.0e-12);
    }
}
