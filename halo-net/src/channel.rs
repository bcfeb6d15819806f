//! Transport: one TCP stream per present neighbor slot, generalizing
//! the teacher's all-to-all party mesh (`mpc-net::multi::Connections`)
//! to the sparse 26-slot lattice topology of spec §4.1.
//!
//! Connection setup follows the same deadlock-free rule the teacher
//! uses for its pairwise handshake: of any two ranks that must talk,
//! the lower-numbered one connects out and the higher-numbered one
//! accepts. Each accepted stream announces its rank with an 8-byte
//! handshake so it can be matched back to the slot it fills, since a
//! listener can't otherwise tell which neighbor just dialed in.

use std::net::SocketAddr;

use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;

use crate::connect::connect_with_retry;
use crate::error::CommError;
use crate::neighbor::{NeighborTopology, NUM_SLOTS};

pub struct HaloConnections {
    pub my_rank: usize,
    pub topology: NeighborTopology,
    // Read and write halves are tracked independently (rather than as
    // a joined pair) because `CommRecv` and `CommSend` own them for
    // the duration of their respective spawned tasks concurrently:
    // the same slot is often both sending and receiving at once.
    read_halves: Vec<Option<OwnedReadHalf>>,
    write_halves: Vec<Option<OwnedWriteHalf>>,
}

impl HaloConnections {
    /// `addr_book[r]` is the socket address of rank `r`.
    pub async fn connect_all(
        my_rank: usize,
        topology: NeighborTopology,
        addr_book: &[SocketAddr],
    ) -> Result<Self, CommError> {
        let present_ranks: Vec<(usize, usize)> = topology
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, s)| s.rank.map(|r| (slot, r)))
            .collect();

        let lower: Vec<(usize, usize)> = present_ranks
            .iter()
            .copied()
            .filter(|&(_, r)| r < my_rank)
            .collect();
        let higher: Vec<(usize, usize)> = present_ranks
            .iter()
            .copied()
            .filter(|&(_, r)| r > my_rank)
            .collect();

        let mut read_halves: Vec<Option<OwnedReadHalf>> = (0..NUM_SLOTS).map(|_| None).collect();
        let mut write_halves: Vec<Option<OwnedWriteHalf>> = (0..NUM_SLOTS).map(|_| None).collect();

        if !lower.is_empty() {
            let listener = TcpListener::bind(addr_book[my_rank])
                .await
                .map_err(|source| CommError::Connect {
                    rank: my_rank,
                    source,
                })?;
            let mut by_rank = std::collections::HashMap::new();
            for _ in 0..lower.len() {
                let (stream, _peer) =
                    listener.accept().await.map_err(|source| CommError::Io {
                        rank: my_rank,
                        source,
                    })?;
                let (mut rh, wh) = stream.into_split();
                let mut rank_buf = [0u8; 8];
                rh.read_exact(&mut rank_buf)
                    .await
                    .map_err(|source| CommError::Io {
                        rank: my_rank,
                        source,
                    })?;
                let their_rank = u64::from_le_bytes(rank_buf) as usize;
                debug!("rank {my_rank} accepted connection from rank {their_rank}");
                by_rank.insert(their_rank, (rh, wh));
            }
            for (slot, rank) in lower {
                if let Some((rh, wh)) = by_rank.remove(&rank) {
                    read_halves[slot] = Some(rh);
                    write_halves[slot] = Some(wh);
                }
            }
        }

        for (slot, rank) in higher {
            let stream = connect_with_retry(rank, addr_book[rank]).await?;
            let (rh, mut wh) = stream.into_split();
            wh.write_all(&(my_rank as u64).to_le_bytes())
                .await
                .map_err(|source| CommError::Io { rank, source })?;
            debug!("rank {my_rank} connected out to rank {rank}");
            read_halves[slot] = Some(rh);
            write_halves[slot] = Some(wh);
        }

        Ok(Self {
            my_rank,
            topology,
            read_halves,
            write_halves,
        })
    }

    pub fn read_half(&mut self, slot: usize) -> Option<&mut OwnedReadHalf> {
        self.read_halves[slot].as_mut()
    }

    pub fn write_half(&mut self, slot: usize) -> Option<&mut OwnedWriteHalf> {
        self.write_halves[slot].as_mut()
    }

    pub fn take_read_half(&mut self, slot: usize) -> Option<OwnedReadHalf> {
        self.read_halves[slot].take()
    }

    pub fn take_write_half(&mut self, slot: usize) -> Option<OwnedWriteHalf> {
        self.write_halves[slot].take()
    }

    pub fn put_read_half(&mut self, slot: usize, half: OwnedReadHalf) {
        self.read_halves[slot] = Some(half);
    }

    pub fn put_write_half(&mut self, slot: usize, half: OwnedWriteHalf) {
        self.write_halves[slot] = Some(half);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbor::NeighborTopology;
    use mesh::ProcLayout;

    /// Brings up the full 8-rank `tp=2` cube over loopback TCP and
    /// checks every present slot ends up wired to the rank the topology
    /// says it should be: each side writes its own rank over the slot
    /// it thinks it opened, the other reads it back and compares
    /// against `topology.slots[slot].rank`.
    #[tokio::test(flavor = "multi_thread")]
    async fn connect_all_wires_every_present_slot_to_the_right_rank() {
        let num_ranks = 8;
        let mut addr_book = Vec::with_capacity(num_ranks);
        for _ in 0..num_ranks {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            addr_book.push(listener.local_addr().unwrap());
        }

        let mut tasks = Vec::new();
        for rank in 0..num_ranks {
            let addr_book = addr_book.clone();
            tasks.push(tokio::spawn(async move {
                let layout = ProcLayout::new(rank, num_ranks).unwrap();
                let topology = NeighborTopology::build(&layout);
                let expected: Vec<(usize, usize)> = topology
                    .slots
                    .iter()
                    .enumerate()
                    .filter_map(|(slot, s)| s.rank.map(|r| (slot, r)))
                    .collect();

                let mut conn = HaloConnections::connect_all(rank, topology, &addr_book)
                    .await
                    .unwrap();

                for (slot, peer_rank) in expected {
                    let wh = conn.write_half(slot).unwrap();
                    wh.write_all(&(rank as u64).to_le_bytes()).await.unwrap();

                    let rh = conn.read_half(slot).unwrap();
                    let mut buf = [0u8; 8];
                    rh.read_exact(&mut buf).await.unwrap();
                    assert_eq!(u64::from_le_bytes(buf) as usize, peer_rank);
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
    }
}
