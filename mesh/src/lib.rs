//! Mesh data model for the Lagrangian shock-hydrodynamics solver:
//! the `Domain` record and the index tables/constants every other
//! crate in this workspace is built around.

pub mod boundary;
pub mod domain;
pub mod error;
pub mod ghost;
pub mod params;
pub mod topology;

pub use boundary::{Axis, FaceKind, Side};
pub use domain::Domain;
pub use error::DomainError;
pub use params::SimParams;
pub use topology::ProcLayout;
