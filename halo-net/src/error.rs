use thiserror::Error;

/// Fatal conditions raised by the halo-exchange transport itself —
/// distinct from the physics invariant violations in `kernels::error`
/// (spec §7: "configuration failure ... fatal at startup").
#[derive(Debug, Error)]
pub enum CommError {
    #[error("failed to connect to neighbor rank {rank}: {source}")]
    Connect {
        rank: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error talking to rank {rank}: {source}")]
    Io {
        rank: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("a send task for rank {rank} panicked or was cancelled")]
    SendTaskLost { rank: usize },
    #[error("unsupported floating-point width {0} bytes (only 4 or 8 are accepted)")]
    UnsupportedFloatWidth(usize),
}
