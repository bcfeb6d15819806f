//! The three-phase halo-exchange protocol (spec §4.1, §4.2): post
//! receives, pack and send, then complete with the reduction the
//! message kind calls for.
//!
//! `CommRecv` posts one non-blocking receive per active neighbor slot
//! by spawning a task that owns that slot's read half for the
//! duration of the read; the returned `JoinHandle` *is* the posted
//! request. `CommSend` packs directly from the live field arrays and
//! writes out under its own spawned task. The completion routine
//! (`comm_sbn` / `comm_sync_pos_vel` / `comm_mono_q`) awaits each
//! slot's recv handle in the same fixed order used to post it, then
//! reduces into the destination fields; afterwards it awaits every
//! send handle, matching spec §5's "all 26 send requests must have
//! been waited on" rule.

use mesh::ghost::{self, FaceId};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;

use crate::buffer::{self, Reduce};
use crate::channel::HaloConnections;
use crate::error::CommError;
use crate::neighbor::{SlotKind, Varying, NUM_SLOTS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Forces / nodal mass: receiver sums.
    Sbn,
    /// Position / velocity: receiver assigns, only the max-side
    /// neighbor of each pair receives.
    SyncPosVel,
    /// Element velocity gradients: receiver writes into the ghost
    /// region past `numElem`; faces only (spec: "ghosts live only on
    /// faces").
    MonoQ,
}

impl ExchangeKind {
    fn reduce(self) -> Reduce {
        match self {
            ExchangeKind::Sbn => Reduce::Sum,
            ExchangeKind::SyncPosVel => Reduce::Assign,
            ExchangeKind::MonoQ => Reduce::Assign,
        }
    }

    fn plane_only(self) -> bool {
        matches!(self, ExchangeKind::MonoQ)
    }

    pub const fn tag(self) -> u32 {
        match self {
            ExchangeKind::Sbn => 1024,
            ExchangeKind::SyncPosVel => 2048,
            ExchangeKind::MonoQ => 3072,
        }
    }
}

/// Per spec §4.1: "only max-side neighbors receive" for position/
/// velocity sync. We resolve "which side" with the same total order
/// the rest of this pack uses for king/leader disambiguation: the
/// neighbor with the smaller rank is the min side. This is a fixed,
/// globally consistent tie-break, recorded as a deliberate choice in
/// DESIGN.md rather than re-derived per axis for edges/corners (whose
/// min/max sense is not well-defined component-wise).
fn is_max_side(my_rank: usize, neighbor_rank: usize) -> bool {
    my_rank > neighbor_rank
}

fn active_slots(conn: &HaloConnections, kind: ExchangeKind) -> Vec<usize> {
    (0..NUM_SLOTS)
        .filter(|&slot| {
            let s = &conn.topology.slots[slot];
            if !s.present {
                return false;
            }
            if kind.plane_only() && s.kind != SlotKind::Face {
                return false;
            }
            true
        })
        .collect()
}

fn do_recv(conn: &HaloConnections, kind: ExchangeKind, slot: usize) -> bool {
    match kind {
        ExchangeKind::Sbn | ExchangeKind::MonoQ => true,
        ExchangeKind::SyncPosVel => {
            let rank = conn.topology.slots[slot].rank.unwrap();
            is_max_side(conn.my_rank, rank)
        }
    }
}

fn do_send(conn: &HaloConnections, kind: ExchangeKind, slot: usize) -> bool {
    match kind {
        ExchangeKind::Sbn | ExchangeKind::MonoQ => true,
        ExchangeKind::SyncPosVel => !do_recv(conn, kind, slot),
    }
}

async fn recv_payload(
    mut rh: OwnedReadHalf,
    len: usize,
) -> Result<(OwnedReadHalf, Vec<f64>), std::io::Error> {
    let mut bytes = vec![0u8; len * 8];
    rh.read_exact(&mut bytes).await?;
    let mut out = vec![0.0f64; len];
    for (i, chunk) in bytes.chunks_exact(8).enumerate() {
        out[i] = f64::from_le_bytes(chunk.try_into().unwrap());
    }
    Ok((rh, out))
}

async fn send_payload(
    mut wh: OwnedWriteHalf,
    data: Vec<f64>,
) -> Result<OwnedWriteHalf, std::io::Error> {
    let mut bytes = Vec::with_capacity(data.len() * 8);
    for v in &data {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    wh.write_all(&bytes).await?;
    Ok(wh)
}

type RecvHandle = JoinHandle<Result<(OwnedReadHalf, Vec<f64>), std::io::Error>>;
type SendHandle = JoinHandle<Result<OwnedWriteHalf, std::io::Error>>;

/// `CommRecv`: post one non-blocking receive per active, `doRecv`-
/// eligible neighbor slot. `d` is the field's cube edge length (`nx`
/// for element fields, `nx+1` for node fields).
fn post_recvs(
    conn: &mut HaloConnections,
    kind: ExchangeKind,
    num_fields: usize,
    d: usize,
) -> Vec<Option<RecvHandle>> {
    let slots = active_slots(conn, kind);
    let mut handles: Vec<Option<RecvHandle>> = (0..NUM_SLOTS).map(|_| None).collect();
    for slot in slots {
        if !do_recv(conn, kind, slot) {
            continue;
        }
        let len = num_fields * per_field_len(conn.topology.slots[slot].kind, d);
        if let Some(rh) = conn.take_read_half(slot) {
            handles[slot] = Some(tokio::spawn(recv_payload(rh, len)));
        }
    }
    handles
}

fn per_field_len(kind: SlotKind, d: usize) -> usize {
    match kind {
        SlotKind::Face => d * d,
        SlotKind::Edge => d,
        SlotKind::Corner => 1,
    }
}

/// Packs one field's face/edge/corner payload for `slot` into `out`.
fn pack_slot(
    fields: &[&[f64]],
    d: usize,
    slot: usize,
    kind_geom: SlotKind,
    varying: Varying,
    offset: (i64, i64, i64),
    out: &mut [f64],
) {
    let per_field = per_field_len(kind_geom, d);
    for (fi, field) in fields.iter().enumerate() {
        let chunk = &mut out[fi * per_field..(fi + 1) * per_field];
        match kind_geom {
            SlotKind::Face => {
                let (axis, fixed) = buffer::face_axis_and_fixed(offset, d);
                buffer::pack_face(field, d, axis, fixed, chunk);
            }
            SlotKind::Edge => {
                let fixed = buffer::edge_fixed(offset, varying, d);
                buffer::pack_edge(field, d, varying, fixed, chunk);
            }
            SlotKind::Corner => {
                let point = buffer::corner_point(offset, d);
                buffer::pack_corner(field, d, point, chunk);
            }
        }
    }
    let _ = slot;
}

/// `CommSend`: pack directly from the live field arrays and post a
/// non-blocking send for every active, `doSend`-eligible slot.
fn post_sends(
    conn: &mut HaloConnections,
    kind: ExchangeKind,
    fields: &[&[f64]],
    d: usize,
) -> Vec<Option<SendHandle>> {
    let slots = active_slots(conn, kind);
    let mut handles: Vec<Option<SendHandle>> = (0..NUM_SLOTS).map(|_| None).collect();
    for slot in slots {
        if !do_send(conn, kind, slot) {
            continue;
        }
        let s = conn.topology.slots[slot];
        let per_field = per_field_len(s.kind, d);
        let mut out = vec![0.0; fields.len() * per_field];
        pack_slot(fields, d, slot, s.kind, s.varying, s.offset, &mut out);
        if let Some(wh) = conn.take_write_half(slot) {
            handles[slot] = Some(tokio::spawn(send_payload(wh, out)));
        }
    }
    handles
}

async fn wait_sends(
    conn: &mut HaloConnections,
    handles: Vec<Option<SendHandle>>,
) -> Result<(), CommError> {
    for (slot, handle) in handles.into_iter().enumerate() {
        if let Some(handle) = handle {
            let rank = conn.topology.slots[slot].rank.unwrap_or(usize::MAX);
            let wh = handle
                .await
                .map_err(|_| CommError::SendTaskLost { rank })?
                .map_err(|source| CommError::Io { rank, source })?;
            conn.put_write_half(slot, wh);
        }
    }
    Ok(())
}

/// Completion routine shared by SBN and SyncPosVel: both write into
/// the ordinary (non-ghosted) destination fields, differing only in
/// the reduce operator.
async fn complete_into_fields(
    conn: &mut HaloConnections,
    kind: ExchangeKind,
    recv_handles: Vec<Option<RecvHandle>>,
    fields: &mut [&mut [f64]],
    d: usize,
) -> Result<(), CommError> {
    let reduce = kind.reduce();
    for (slot, handle) in recv_handles.into_iter().enumerate() {
        let Some(handle) = handle else { continue };
        let s = conn.topology.slots[slot];
        let rank = s.rank.unwrap();
        let (rh, inp) = handle
            .await
            .map_err(|_| CommError::SendTaskLost { rank })?
            .map_err(|source| CommError::Io { rank, source })?;
        let per_field = per_field_len(s.kind, d);
        for (fi, field) in fields.iter_mut().enumerate() {
            let chunk = &inp[fi * per_field..(fi + 1) * per_field];
            match s.kind {
                SlotKind::Face => {
                    let (axis, fixed) = buffer::face_axis_and_fixed(s.offset, d);
                    buffer::unpack_face(field, d, axis, fixed, chunk, reduce);
                }
                SlotKind::Edge => {
                    let fixed = buffer::edge_fixed(s.offset, s.varying, d);
                    buffer::unpack_edge(field, d, s.varying, fixed, chunk, reduce);
                }
                SlotKind::Corner => {
                    let point = buffer::corner_point(s.offset, d);
                    buffer::unpack_corner(field, d, point, chunk, reduce);
                }
            }
        }
        conn.put_read_half(slot, rh);
    }
    Ok(())
}

/// Completion routine for MonoQ: writes into the ghost region past
/// `numElem` of the ghost-extended destination fields, face-only
/// (spec §4.2 `CalcQForElems`, I5).
async fn complete_into_ghosts(
    conn: &mut HaloConnections,
    recv_handles: Vec<Option<RecvHandle>>,
    ghost_fields: &mut [&mut [f64]],
    num_elem: usize,
    nx: usize,
) -> Result<(), CommError> {
    for (slot, handle) in recv_handles.into_iter().enumerate() {
        let Some(handle) = handle else { continue };
        let s = conn.topology.slots[slot];
        debug_assert_eq!(s.kind, SlotKind::Face);
        let rank = s.rank.unwrap();
        let (rh, inp) = handle
            .await
            .map_err(|_| CommError::SendTaskLost { rank })?
            .map_err(|source| CommError::Io { rank, source })?;
        let face = slot_to_face(slot);
        let per_field = nx * nx;
        for (fi, field) in ghost_fields.iter_mut().enumerate() {
            let chunk = &inp[fi * per_field..(fi + 1) * per_field];
            for (in_plane, &v) in chunk.iter().enumerate() {
                field[ghost::ghost_slot(num_elem, nx, face, in_plane)] = v;
            }
        }
        conn.put_read_half(slot, rh);
    }
    Ok(())
}

fn slot_to_face(slot: usize) -> FaceId {
    match slot {
        0 => FaceId::XiM,
        1 => FaceId::XiP,
        2 => FaceId::EtaM,
        3 => FaceId::EtaP,
        4 => FaceId::ZetaM,
        5 => FaceId::ZetaP,
        _ => unreachable!("only face slots (0..6) carry MonoQ ghost data"),
    }
}

/// `CommSBN`: summation halo exchange for forces / nodal mass over
/// all 26 neighbor slots.
pub async fn comm_sbn(
    conn: &mut HaloConnections,
    fields: &mut [&mut [f64]],
    d: usize,
) -> Result<(), CommError> {
    let num_fields = fields.len();
    let recv_handles = post_recvs(conn, ExchangeKind::Sbn, num_fields, d);
    let read_only: Vec<&[f64]> = fields.iter().map(|f| &**f).collect();
    let send_handles = post_sends(conn, ExchangeKind::Sbn, &read_only, d);
    complete_into_fields(conn, ExchangeKind::Sbn, recv_handles, fields, d).await?;
    wait_sends(conn, send_handles).await
}

/// `CommSyncPosVel`: assignment halo exchange for position/velocity,
/// max-side-only receive.
pub async fn comm_sync_pos_vel(
    conn: &mut HaloConnections,
    fields: &mut [&mut [f64]],
    d: usize,
) -> Result<(), CommError> {
    let num_fields = fields.len();
    let recv_handles = post_recvs(conn, ExchangeKind::SyncPosVel, num_fields, d);
    let read_only: Vec<&[f64]> = fields.iter().map(|f| &**f).collect();
    let send_handles = post_sends(conn, ExchangeKind::SyncPosVel, &read_only, d);
    complete_into_fields(conn, ExchangeKind::SyncPosVel, recv_handles, fields, d).await?;
    wait_sends(conn, send_handles).await
}

/// `CommMonoQ`: ghost-append exchange of element velocity gradients,
/// faces only.
pub async fn comm_mono_q(
    conn: &mut HaloConnections,
    send_fields: &[&[f64]],
    ghost_fields: &mut [&mut [f64]],
    num_elem: usize,
    nx: usize,
) -> Result<(), CommError> {
    let num_fields = send_fields.len();
    let recv_handles = post_recvs(conn, ExchangeKind::MonoQ, num_fields, nx);
    let send_handles = post_sends(conn, ExchangeKind::MonoQ, send_fields, nx);
    complete_into_ghosts(conn, recv_handles, ghost_fields, num_elem, nx).await?;
    wait_sends(conn, send_handles).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::HaloConnections;
    use crate::neighbor::NeighborTopology;
    use mesh::ProcLayout;
    use tokio::net::TcpListener;

    /// Every rank's single-element (`nx=1`, `d=2`) subdomain is all
    /// corners: its 8 nodes are shared with some subset of its (up to
    /// 7) present neighbors. Seed every rank's node field with 1.0 and
    /// run `comm_sbn`; the globally-central node — index `(1,1,1)` in
    /// rank 0's own local numbering, at the far corner of its cube —
    /// is touched by all 3 of rank 0's present faces, all 3 present
    /// edges, and its 1 present corner, each carrying that same point,
    /// so it must sum to `1 (own) + 7 (one per present slot) = 8`, one
    /// contribution per rank of the `tp=2` cube.
    #[tokio::test(flavor = "multi_thread")]
    async fn sbn_sums_one_contribution_per_rank_at_the_shared_center_node() {
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
                let mut conn = HaloConnections::connect_all(rank, topology, &addr_book)
                    .await
                    .unwrap();

                let mut field = vec![1.0f64; 8];
                {
                    let mut fields: Vec<&mut [f64]> = vec![&mut field];
                    comm_sbn(&mut conn, &mut fields, 2).await.unwrap();
                }
                field
            }));
        }

        let rank0_field = tasks.into_iter().next().unwrap().await.unwrap();
        assert_eq!(rank0_field[7], 8.0);
    }
}
