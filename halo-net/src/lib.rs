//! Point-to-point halo exchange between subdomain neighbors: topology,
//! pack/unpack buffers, TCP transport, and the three-phase exchange
//! protocol (spec §4.1).

pub mod buffer;
pub mod channel;
mod connect;
pub mod error;
pub mod exchange;
pub mod king;
pub mod neighbor;

pub use channel::HaloConnections;
pub use error::CommError;
pub use exchange::{comm_mono_q, comm_sbn, comm_sync_pos_vel, ExchangeKind};
pub use king::KingConnections;
pub use neighbor::NeighborTopology;
