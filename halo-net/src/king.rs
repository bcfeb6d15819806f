//! Star-topology collective used for the one cross-rank operation the
//! 26-neighbor mesh can't express: `TimeIncrement`'s global
//! `Allreduce(MIN)` over the candidate `newdt` (spec §4.2). Generalizes
//! the teacher's aggregator role (`mpc-net`'s king: every party sends
//! to one party, who computes and replies to all) from an MPC king
//! computation to a plain numeric reduction.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;

use crate::connect::connect_with_retry;
use crate::error::CommError;

type Peer = (OwnedReadHalf, OwnedWriteHalf);

/// Rank 0 is always the king. Every other rank opens one extra
/// connection to rank 0 (on top of whatever 26-neighbor links it also
/// has to rank 0, if any), since the Allreduce is over all ranks, not
/// just neighbors.
pub struct KingConnections {
    my_rank: usize,
    num_ranks: usize,
    king_peers: Vec<Option<Peer>>,
    to_king: Option<Peer>,
}

impl KingConnections {
    pub async fn connect_all(
        my_rank: usize,
        num_ranks: usize,
        addr_book: &[SocketAddr],
    ) -> Result<Self, CommError> {
        if num_ranks == 1 {
            return Ok(Self { my_rank, num_ranks, king_peers: Vec::new(), to_king: None });
        }

        if my_rank == 0 {
            let listener = TcpListener::bind(addr_book[0])
                .await
                .map_err(|source| CommError::Connect { rank: 0, source })?;
            let mut by_rank = HashMap::new();
            for _ in 1..num_ranks {
                let (stream, _peer) = listener
                    .accept()
                    .await
                    .map_err(|source| CommError::Io { rank: 0, source })?;
                let (mut rh, wh) = stream.into_split();
                let mut buf = [0u8; 8];
                rh.read_exact(&mut buf)
                    .await
                    .map_err(|source| CommError::Io { rank: 0, source })?;
                let their_rank = u64::from_le_bytes(buf) as usize;
                by_rank.insert(their_rank, (rh, wh));
            }
            let king_peers = (1..num_ranks).map(|r| by_rank.remove(&r)).collect();
            Ok(Self { my_rank, num_ranks, king_peers, to_king: None })
        } else {
            let stream = connect_with_retry(0, addr_book[0]).await?;
            let (rh, mut wh) = stream.into_split();
            wh.write_all(&(my_rank as u64).to_le_bytes())
                .await
                .map_err(|source| CommError::Io { rank: my_rank, source })?;
            Ok(Self { my_rank, num_ranks, king_peers: Vec::new(), to_king: Some((rh, wh)) })
        }
    }

    /// `Allreduce(MIN)`: every rank contributes `value`, every rank
    /// gets back the global minimum.
    pub async fn allreduce_min(&mut self, value: f64) -> Result<f64, CommError> {
        if self.num_ranks == 1 {
            return Ok(value);
        }

        if self.my_rank == 0 {
            let mut global_min = value;
            for peer in self.king_peers.iter_mut() {
                let (rh, _) = peer.as_mut().expect("king must hold every peer connection");
                let mut buf = [0u8; 8];
                rh.read_exact(&mut buf)
                    .await
                    .map_err(|source| CommError::Io { rank: 0, source })?;
                global_min = global_min.min(f64::from_le_bytes(buf));
            }
            for peer in self.king_peers.iter_mut() {
                let (_, wh) = peer.as_mut().expect("king must hold every peer connection");
                wh.write_all(&global_min.to_le_bytes())
                    .await
                    .map_err(|source| CommError::Io { rank: 0, source })?;
            }
            Ok(global_min)
        } else {
            let (rh, wh) = self
                .to_king
                .as_mut()
                .expect("non-king rank must have a connection to the king");
            wh.write_all(&value.to_le_bytes())
                .await
                .map_err(|source| CommError::Io { rank: self.my_rank, source })?;
            let mut buf = [0u8; 8];
            rh.read_exact(&mut buf)
                .await
                .map_err(|source| CommError::Io { rank: self.my_rank, source })?;
            Ok(f64::from_le_bytes(buf))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn allreduce_min_over_loopback() {
        let num_ranks = 4;
        // Reserve an ephemeral port for the king, then release it
        // immediately; KingConnections::connect_all rebinds it. Mirrors
        // the teacher's own `new_local_testnet` ephemeral-port pattern
        // (mpc-net/src/multi.rs).
        let king_addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let addr_book = vec![king_addr];

        let mut tasks = Vec::new();
        for rank in 0..num_ranks {
            let addr_book = addr_book.clone();
            tasks.push(tokio::spawn(async move {
                let mut king = KingConnections::connect_all(rank, num_ranks, &addr_book)
                    .await
                    .unwrap();
                king.allreduce_min(10.0 - rank as f64).await.unwrap()
            }));
        }

        for task in tasks {
            let global_min = task.await.unwrap();
            // ranks contribute 10,9,8,7 -> minimum is 7
            assert_eq!(global_min, 7.0);
        }
    }

    #[tokio::test]
    async fn single_rank_allreduce_is_identity() {
        let mut king = KingConnections::connect_all(0, 1, &[]).await.unwrap();
        assert_eq!(king.allreduce_min(42.0).await.unwrap(), 42.0);
    }
}
