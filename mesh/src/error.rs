use thiserror::Error;

/// Fatal conditions the mesh/domain layer can raise while building or
/// describing a subdomain. Runtime kernel failures (negative volume,
/// Q overflow) live in `kernels::error` instead — this is strictly the
/// "did we even build a legal domain" layer (spec §7, "configuration
/// failure").
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("process count {0} is not a perfect cube; tp^3 is required")]
    NotAPerfectCube(usize),
    #[error("subdomain edge length nx must be >= 1, got {0}")]
    InvalidEdgeLength(usize),
    #[error("rank {rank} out of range for tp={tp} (expected < {expected})")]
    RankOutOfRange {
        rank: usize,
        tp: usize,
        expected: usize,
    },
}
