use thiserror::Error;

/// Fatal physics invariant violations (spec §7: "geometric failure",
/// "physical failure"). Distinct from `mesh::DomainError` (construction
/// time) and `halo_net::CommError` (transport time) — this is the only
/// error kind a running cycle can raise, and the driver translates it
/// directly into the process exit code (spec §9, "exceptions for
/// control flow").
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("element {elem} has non-positive volume {volume:e}")]
    NegativeVolume { elem: usize, volume: f64 },
    #[error("element {elem} artificial viscosity {q:e} exceeds qstop {qstop:e}")]
    QStop { elem: usize, q: f64, qstop: f64 },
}

impl KernelError {
    /// Spec §6: "-1 negative volume detected; -2 Q exceeded qstop".
    pub fn exit_code(&self) -> i32 {
        match self {
            KernelError::NegativeVolume { .. } => -1,
            KernelError::QStop { .. } => -2,
        }
    }
}
