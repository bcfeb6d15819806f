//! Flat send/recv scratch buffers and the pack/unpack template kernels
//! (spec §4.1 "Buffer layout", §9 "Deep nested conditional packing").
//!
//! Rather than the 26 near-identical pack/send/recv/unpack blocks the
//! original repeats, every slot's region of the flat buffer is derived
//! from `BufferLayout`, and every slot's pack/unpack is one of 6
//! template kernels selected by `(SlotKind, Varying)`.

use crate::neighbor::{Varying, NUM_SLOTS};

/// `128 / size_of::<f64>()`: corner messages are tiny but must not
/// share a cache line with their neighbors (spec §4.1).
pub const CACHE_COHERENCE_PAD_REAL: usize = 16;

fn round_up_to_cache_line(n: usize) -> usize {
    let pad = CACHE_COHERENCE_PAD_REAL;
    ((n + pad - 1) / pad) * pad
}

/// Per-exchange buffer geometry: how many `f64` each of the 26 slots
/// occupies and at what offset, for a given field count and cube edge
/// length `d` (`nx` for element fields, `nx+1` for node fields).
#[derive(Clone, Debug)]
pub struct BufferLayout {
    pub num_fields: usize,
    pub d: usize,
    pub plane_slot_len: usize,
    pub edge_slot_len: usize,
    pub corner_slot_len: usize,
    offsets: [usize; NUM_SLOTS],
    pub total_len: usize,
}

impl BufferLayout {
    pub fn new(num_fields: usize, d: usize) -> Self {
        let max_plane_size = d * d;
        let max_edge_size = d;
        let plane_slot_len = round_up_to_cache_line(num_fields * max_plane_size);
        let edge_slot_len = round_up_to_cache_line(num_fields * max_edge_size);
        let corner_slot_len = CACHE_COHERENCE_PAD_REAL.max(num_fields);

        let mut offsets = [0usize; NUM_SLOTS];
        let mut acc = 0usize;
        for i in 0..6 {
            offsets[i] = acc;
            acc += plane_slot_len;
        }
        for i in 6..18 {
            offsets[i] = acc;
            acc += edge_slot_len;
        }
        for i in 18..26 {
            offsets[i] = acc;
            acc += corner_slot_len;
        }

        Self {
            num_fields,
            d,
            plane_slot_len,
            edge_slot_len,
            corner_slot_len,
            offsets,
            total_len: acc,
        }
    }

    pub fn slot_len(&self, slot_index: usize) -> usize {
        match slot_index {
            0..=5 => self.plane_slot_len,
            6..=17 => self.edge_slot_len,
            18..=25 => self.corner_slot_len,
            _ => unreachable!(),
        }
    }

    /// The payload length actually used within a slot's (padded) region.
    pub fn payload_len(&self, slot_index: usize) -> usize {
        match slot_index {
            0..=5 => self.num_fields * self.d * self.d,
            6..=17 => self.num_fields * self.d,
            18..=25 => self.num_fields,
            _ => unreachable!(),
        }
    }

    pub fn slot_bytes(&self, slot_index: usize) -> std::ops::Range<usize> {
        let start = self.offsets[slot_index];
        start..start + self.payload_len(slot_index)
    }

    pub fn new_buffer(&self) -> Vec<f64> {
        vec![0.0; self.total_len]
    }
}

/// One field's flat, row-major (x fastest, then y, then z) cube array.
pub type Field<'a> = &'a [f64];
pub type FieldMut<'a> = &'a mut [f64];

/// Packs one field's values on the X face (i fixed) into `out`
/// (spec: "stride-dx" — consecutive face points are `d` apart).
pub fn pack_face_x(field: Field, d: usize, i_fixed: usize, out: &mut [f64]) {
    let mut idx = 0;
    for k in 0..d {
        for j in 0..d {
            out[idx] = field[i_fixed + j * d + k * d * d];
            idx += 1;
        }
    }
}

/// Packs one field's values on the Y face (j fixed) into `out`
/// (spec: "`dx` contiguous values stride `dx*dy` apart").
pub fn pack_face_y(field: Field, d: usize, j_fixed: usize, out: &mut [f64]) {
    let mut idx = 0;
    for k in 0..d {
        let base = j_fixed * d + k * d * d;
        out[idx..idx + d].copy_from_slice(&field[base..base + d]);
        idx += d;
    }
}

/// Packs one field's values on the Z face (k fixed) into `out`
/// (spec: "a single memcpy of `dx*dy` suffices").
pub fn pack_face_z(field: Field, d: usize, k_fixed: usize, out: &mut [f64]) {
    let base = k_fixed * d * d;
    out.copy_from_slice(&field[base..base + d * d]);
}

pub fn pack_face(field: Field, d: usize, axis: Varying3, i_fixed: usize, out: &mut [f64]) {
    match axis {
        Varying3::X => pack_face_x(field, d, i_fixed, out),
        Varying3::Y => pack_face_y(field, d, i_fixed, out),
        Varying3::Z => pack_face_z(field, d, i_fixed, out),
    }
}

/// Which of the three axes is fixed for a face (named distinctly from
/// [`Varying`], which names the axis that *varies* on an edge).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Varying3 {
    X,
    Y,
    Z,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reduce {
    /// SBN: receiver sums incoming values into local field values.
    Sum,
    /// SyncPosVel: receiver overwrites local field values.
    Assign,
}

fn unpack_face_x(field: FieldMut, d: usize, i_fixed: usize, inp: &[f64], reduce: Reduce) {
    let mut idx = 0;
    for k in 0..d {
        for j in 0..d {
            let dst = i_fixed + j * d + k * d * d;
            match reduce {
                Reduce::Sum => field[dst] += inp[idx],
                Reduce::Assign => field[dst] = inp[idx],
            }
            idx += 1;
        }
    }
}

fn unpack_face_y(field: FieldMut, d: usize, j_fixed: usize, inp: &[f64], reduce: Reduce) {
    let mut idx = 0;
    for k in 0..d {
        let base = j_fixed * d + k * d * d;
        for i in 0..d {
            match reduce {
                Reduce::Sum => field[base + i] += inp[idx + i],
                Reduce::Assign => field[base + i] = inp[idx + i],
            }
        }
        idx += d;
    }
}

fn unpack_face_z(field: FieldMut, d: usize, k_fixed: usize, inp: &[f64], reduce: Reduce) {
    let base = k_fixed * d * d;
    for i in 0..d * d {
        match reduce {
            Reduce::Sum => field[base + i] += inp[i],
            Reduce::Assign => field[base + i] = inp[i],
        }
    }
}

pub fn unpack_face(
    field: FieldMut,
    d: usize,
    axis: Varying3,
    i_fixed: usize,
    inp: &[f64],
    reduce: Reduce,
) {
    match axis {
        Varying3::X => unpack_face_x(field, d, i_fixed, inp, reduce),
        Varying3::Y => unpack_face_y(field, d, i_fixed, inp, reduce),
        Varying3::Z => unpack_face_z(field, d, i_fixed, inp, reduce),
    }
}

/// Packs one field's values along an edge line into `out`. `fixed`
/// gives the two pinned coordinates in the plane orthogonal to
/// `varying`.
pub fn pack_edge(field: Field, d: usize, varying: Varying, fixed: (usize, usize), out: &mut [f64]) {
    match varying {
        Varying::X => {
            let (j, k) = fixed;
            let base = j * d + k * d * d;
            out.copy_from_slice(&field[base..base + d]);
        }
        Varying::Y => {
            let (i, k) = fixed;
            for (idx, j) in (0..d).enumerate() {
                out[idx] = field[i + j * d + k * d * d];
            }
        }
        Varying::Z => {
            let (i, j) = fixed;
            for (idx, k) in (0..d).enumerate() {
                out[idx] = field[i + j * d + k * d * d];
            }
        }
        Varying::None => unreachable!("edge slot must have a varying axis"),
    }
}

pub fn unpack_edge(
    field: FieldMut,
    d: usize,
    varying: Varying,
    fixed: (usize, usize),
    inp: &[f64],
    reduce: Reduce,
) {
    let apply = |field: &mut [f64], dst: usize, v: f64| match reduce {
        Reduce::Sum => field[dst] += v,
        Reduce::Assign => field[dst] = v,
    };
    match varying {
        Varying::X => {
            let (j, k) = fixed;
            let base = j * d + k * d * d;
            for idx in 0..d {
                apply(field, base + idx, inp[idx]);
            }
        }
        Varying::Y => {
            let (i, k) = fixed;
            for (idx, j) in (0..d).enumerate() {
                apply(field, i + j * d + k * d * d, inp[idx]);
            }
        }
        Varying::Z => {
            let (i, j) = fixed;
            for (idx, k) in (0..d).enumerate() {
                apply(field, i + j * d + k * d * d, inp[idx]);
            }
        }
        Varying::None => unreachable!("edge slot must have a varying axis"),
    }
}

pub fn pack_corner(field: Field, d: usize, point: (usize, usize, usize), out: &mut [f64]) {
    let (i, j, k) = point;
    out[0] = field[i + j * d + k * d * d];
}

pub fn unpack_corner(
    field: FieldMut,
    d: usize,
    point: (usize, usize, usize),
    inp: &[f64],
    reduce: Reduce,
) {
    let (i, j, k) = point;
    let dst = i + j * d + k * d * d;
    match reduce {
        Reduce::Sum => field[dst] += inp[0],
        Reduce::Assign => field[dst] = inp[0],
    }
}

fn pin(sign: i64, d: usize) -> usize {
    if sign < 0 {
        0
    } else {
        d - 1
    }
}

/// Which axis a face's offset pins, and at which of the two lattice
/// coordinates (`0` or `d-1`).
pub fn face_axis_and_fixed(offset: (i64, i64, i64), d: usize) -> (Varying3, usize) {
    match offset {
        (c, 0, 0) if c != 0 => (Varying3::X, pin(c, d)),
        (0, r, 0) if r != 0 => (Varying3::Y, pin(r, d)),
        (0, 0, p) if p != 0 => (Varying3::Z, pin(p, d)),
        _ => unreachable!("face offset must pin exactly one axis"),
    }
}

/// The two pinned coordinates for an edge, in the order `pack_edge`/
/// `unpack_edge` expect for that edge's varying axis.
pub fn edge_fixed(offset: (i64, i64, i64), varying: Varying, d: usize) -> (usize, usize) {
    match varying {
        Varying::X => (pin(offset.1, d), pin(offset.2, d)),
        Varying::Y => (pin(offset.0, d), pin(offset.2, d)),
        Varying::Z => (pin(offset.0, d), pin(offset.1, d)),
        Varying::None => unreachable!("edge slot must have a varying axis"),
    }
}

pub fn corner_point(offset: (i64, i64, i64), d: usize) -> (usize, usize, usize) {
    (pin(offset.0, d), pin(offset.1, d), pin(offset.2, d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_slots_are_disjoint_and_cache_aligned() {
        let layout = BufferLayout::new(3, 8);
        assert_eq!(layout.plane_slot_len % CACHE_COHERENCE_PAD_REAL, 0);
        assert_eq!(layout.edge_slot_len % CACHE_COHERENCE_PAD_REAL, 0);
        let mut ranges = Vec::new();
        for i in 0..NUM_SLOTS {
            let r = layout.offsets[i]..layout.offsets[i] + layout.slot_len(i);
            for other in &ranges {
                let o: &std::ops::Range<usize> = other;
                assert!(r.start >= o.end || r.end <= o.start, "overlap");
            }
            ranges.push(r);
        }
    }

    #[test]
    fn pack_then_unpack_assign_round_trips_a_face() {
        let d = 4;
        let mut field = vec![0.0; d * d * d];
        for (i, v) in field.iter_mut().enumerate() {
            *v = i as f64;
        }
        let mut out = vec![0.0; d * d];
        pack_face_z(&field, d, d - 1, &mut out);

        let mut dst = vec![-1.0; d * d * d];
        unpack_face_z(&mut dst, d, d - 1, &out, Reduce::Assign);
        let base = (d - 1) * d * d;
        assert_eq!(&dst[base..base + d * d], &field[base..base + d * d]);
    }

    #[test]
    fn sbn_unpack_sums_rather_than_overwrites() {
        let d = 3;
        let mut field = vec![1.0; d * d];
        let inp = vec![2.0; d];
        unpack_edge(&mut field, d, Varying::X, (0, 0), &inp, Reduce::Sum);
        assert!(field[0..d].iter().all(|&v| v == 3.0));
    }
}
