use thiserror::Error;

use halo_net::CommError;
use kernels::KernelError;

/// Every fatal condition the per-cycle driver can raise, translated by
/// the binary crate into a process exit code (spec §7: "the calling
/// driver does not catch, it translates the error kind into the
/// process exit code").
#[derive(Debug, Error)]
pub enum SolverError {
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error(transparent)]
    Comm(#[from] CommError),
}

impl SolverError {
    pub fn exit_code(&self) -> i32 {
        match self {
            SolverError::Kernel(k) => k.exit_code(),
            // Network/config failures have no code of their own in
            // spec §6 ("0 normal; -1 negative volume; -2 Q exceeded"),
            // so they fall back to a generic nonzero startup-failure
            // code rather than colliding with either kernel code.
            SolverError::Comm(_) => 1,
        }
    }
}
