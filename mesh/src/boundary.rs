//! Boundary-condition bitmask for a single element (spec §3: "18 bits
//! encoding SYMM/FREE/COMM on each of ±X/±Y/±Z faces").
//!
//! Three bits per face: exactly one of SYMM/FREE/COMM is set. Six faces
//! in fixed order XI_M, XI_P, ETA_M, ETA_P, ZETA_M, ZETA_P give 18 bits
//! total, matching the original source's packed `elemBC` field.

pub const XI_M: u32 = 0x7;
pub const XI_M_SYMM: u32 = 0x1;
pub const XI_M_FREE: u32 = 0x2;
pub const XI_M_COMM: u32 = 0x4;

pub const XI_P: u32 = 0x7 << 3;
pub const XI_P_SYMM: u32 = 0x1 << 3;
pub const XI_P_FREE: u32 = 0x2 << 3;
pub const XI_P_COMM: u32 = 0x4 << 3;

pub const ETA_M: u32 = 0x7 << 6;
pub const ETA_M_SYMM: u32 = 0x1 << 6;
pub const ETA_M_FREE: u32 = 0x2 << 6;
pub const ETA_M_COMM: u32 = 0x4 << 6;

pub const ETA_P: u32 = 0x7 << 9;
pub const ETA_P_SYMM: u32 = 0x1 << 9;
pub const ETA_P_FREE: u32 = 0x2 << 9;
pub const ETA_P_COMM: u32 = 0x4 << 9;

pub const ZETA_M: u32 = 0x7 << 12;
pub const ZETA_M_SYMM: u32 = 0x1 << 12;
pub const ZETA_M_FREE: u32 = 0x2 << 12;
pub const ZETA_M_COMM: u32 = 0x4 << 12;

pub const ZETA_P: u32 = 0x7 << 15;
pub const ZETA_P_SYMM: u32 = 0x1 << 15;
pub const ZETA_P_FREE: u32 = 0x2 << 15;
pub const ZETA_P_COMM: u32 = 0x4 << 15;

/// One mesh axis, used to select which triple of SYMM/FREE/COMM bits
/// a face check or monotonic-Q region resolution should look at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Xi,
    Eta,
    Zeta,
}

/// One of the two faces along an axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Minus,
    Plus,
}

/// What governs the element's neighbor value on one face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceKind {
    /// Interior: use the actual neighbor's value.
    Comm,
    /// Mirror: use this element's own value.
    Symm,
    /// Outer boundary with nothing beyond: treat as zero.
    Free,
}

pub fn face_kind(elem_bc: u32, axis: Axis, side: Side) -> FaceKind {
    let (symm, free, comm) = match (axis, side) {
        (Axis::Xi, Side::Minus) => (XI_M_SYMM, XI_M_FREE, XI_M_COMM),
        (Axis::Xi, Side::Plus) => (XI_P_SYMM, XI_P_FREE, XI_P_COMM),
        (Axis::Eta, Side::Minus) => (ETA_M_SYMM, ETA_M_FREE, ETA_M_COMM),
        (Axis::Eta, Side::Plus) => (ETA_P_SYMM, ETA_P_FREE, ETA_P_COMM),
        (Axis::Zeta, Side::Minus) => (ZETA_M_SYMM, ZETA_M_FREE, ZETA_M_COMM),
        (Axis::Zeta, Side::Plus) => (ZETA_P_SYMM, ZETA_P_FREE, ZETA_P_COMM),
    };
    if elem_bc & symm != 0 {
        FaceKind::Symm
    } else if elem_bc & free != 0 {
        FaceKind::Free
    } else if elem_bc & comm != 0 {
        FaceKind::Comm
    } else {
        // No flag set means a purely-local interior face: behaves like
        // an ordinary comm face whose "neighbor" is resolved through
        // same-subdomain connectivity rather than the network.
        FaceKind::Comm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_face_is_independent() {
        let bc = XI_M_SYMM | XI_P_FREE | ETA_M_COMM;
        assert_eq!(face_kind(bc, Axis::Xi, Side::Minus), FaceKind::Symm);
        assert_eq!(face_kind(bc, Axis::Xi, Side::Plus), FaceKind::Free);
        assert_eq!(face_kind(bc, Axis::Eta, Side::Minus), FaceKind::Comm);
    }
}
