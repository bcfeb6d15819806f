//! Per-element numerical kernels (spec §4.2, §4.3): geometry, kinematics,
//! internal force (stress + hourglass), equation of state, monotonic
//! artificial viscosity, and time-step constraints. Every kernel here
//! is local to a subdomain's own elements plus whatever ghost values the
//! halo exchange has already deposited; none of them touch the network.

pub mod eos;
pub mod error;
pub mod force;
pub mod hourglass;
pub mod kinematics;
pub mod monoq;
pub mod shape;
pub mod timestep;

pub use error::KernelError;
pub use force::{calc_volume_force_for_elems, gather_forces_to_nodes};
pub use kinematics::{calc_kinematics_for_elems, ElemKinematics};
pub use monoq::{calc_monotonic_q_for_elems, calc_monotonic_q_gradients_for_elems, ElemMonoQGradients};
pub use timestep::{calc_time_constraints, TimeConstraints};
