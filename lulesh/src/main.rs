//! Wrapper binary (spec §6: "the core takes no flags; a wrapper passes
//! `nx` ... and the cube root `tp`"). Owns everything spec.md scopes
//! out of the core: CLI parsing, process topology validation, the
//! mesh/transport wiring, the cycle loop, and exit-code translation.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use log::info;
use structopt::StructOpt;

use halo_net::{HaloConnections, KingConnections, NeighborTopology};
use mesh::{Domain, SimParams};

#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "lulesh", about = "Distributed Lagrangian shock-hydrodynamics solver")]
struct Opt {
    /// This process's rank.
    #[structopt(long)]
    id: usize,

    /// One socket address per line, indexed by rank.
    #[structopt(long, parse(from_os_str))]
    hostfile: PathBuf,

    /// Per-subdomain edge length.
    #[structopt(long, default_value = "45")]
    nx: usize,

    /// Processes per axis; total rank count must be `tp^3`.
    #[structopt(long, default_value = "1")]
    tp: usize,

    /// Simulation time at which to stop.
    #[structopt(long, default_value = "1.0e-2")]
    stop_time: f64,

    /// Hard cap on cycle count, independent of stop_time.
    #[structopt(long)]
    max_cycles: Option<u64>,

    /// Suppress per-cycle progress printing and the final energy report.
    #[structopt(long)]
    quiet: bool,
}

async fn read_hostfile(path: &PathBuf) -> anyhow::Result<Vec<SocketAddr>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading hostfile {}", path.display()))?;
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<SocketAddr>()
                .with_context(|| format!("bad socket address in hostfile: {line}"))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp(None).init();
    let opt = Opt::from_args();

    let num_ranks = opt.tp * opt.tp * opt.tp;
    let addr_book = read_hostfile(&opt.hostfile).await?;
    anyhow::ensure!(
        addr_book.len() == num_ranks,
        "hostfile has {} entries but tp={} implies {} ranks",
        addr_book.len(),
        opt.tp,
        num_ranks
    );

    let params = SimParams::default();
    let mut domain = Domain::new(opt.id, num_ranks, opt.nx, params)
        .context("constructing domain")?;
    info!(
        "rank {}: coords=({},{},{}) nx={} num_elem={} num_node={}",
        opt.id, domain.layout.col, domain.layout.row, domain.layout.plane, opt.nx,
        domain.num_elem, domain.num_node
    );

    let topology = NeighborTopology::build(&domain.layout);
    let mut halo = HaloConnections::connect_all(opt.id, topology, &addr_book)
        .await
        .context("connecting neighbor halo links")?;
    let mut king = KingConnections::connect_all(opt.id, num_ranks, &addr_book)
        .await
        .context("connecting king collective links")?;
    info!("rank {}: all connections established", opt.id);

    loop {
        if domain.time >= opt.stop_time {
            break;
        }
        if let Some(max) = opt.max_cycles {
            if domain.cycle >= max {
                break;
            }
        }

        if let Err(err) = solver::run_cycle(&mut domain, &mut halo, &mut king, opt.stop_time).await {
            if !opt.quiet {
                eprintln!("rank {}: cycle {} failed: {err}", opt.id, domain.cycle);
            }
            std::process::exit(err.exit_code());
        }

        if opt.id == 0 && !opt.quiet {
            println!("time = {:e}, dt={:e}", domain.time, domain.deltatime);
        }
    }

    if opt.id == 0 && !opt.quiet {
        let energy: f64 = domain.e.iter().sum();
        println!("Run completed:\n   Final Origin Energy = {energy:e}");
    }

    Ok(())
}
