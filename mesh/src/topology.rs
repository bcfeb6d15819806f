//! Process-layout half of spec §6 ("External interfaces — process
//! topology"): mapping a flat rank to its `(col, row, plane)` cell in
//! the `tp x tp x tp` lattice of subdomains, and back.

use crate::error::DomainError;

/// Where a single subdomain sits in the `tp x tp x tp` lattice of ranks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcLayout {
    pub tp: usize,
    pub rank: usize,
    pub col: usize,
    pub row: usize,
    pub plane: usize,
}

impl ProcLayout {
    /// `rank = col + row*tp + plane*tp^2`, inverted.
    pub fn new(rank: usize, num_ranks: usize) -> Result<Self, DomainError> {
        let tp = integer_cube_root(num_ranks)
            .ok_or(DomainError::NotAPerfectCube(num_ranks))?;
        if rank >= num_ranks {
            return Err(DomainError::RankOutOfRange {
                rank,
                tp,
                expected: num_ranks,
            });
        }
        let col = rank % tp;
        let row = (rank / tp) % tp;
        let plane = rank / (tp * tp);
        Ok(Self {
            tp,
            rank,
            col,
            row,
            plane,
        })
    }

    pub fn rank_of(&self, col: usize, row: usize, plane: usize) -> usize {
        col + row * self.tp + plane * self.tp * self.tp
    }

    pub fn has_neighbor(&self, dcol: i64, drow: i64, dplane: i64) -> bool {
        self.neighbor_coords(dcol, drow, dplane).is_some()
    }

    /// Coordinates of the neighbor offset by `(dcol, drow, dplane)`
    /// from this subdomain, or `None` if that neighbor falls outside
    /// the lattice (there is no wraparound: LULESH's decomposition is
    /// a bounded cube, not periodic).
    pub fn neighbor_coords(
        &self,
        dcol: i64,
        drow: i64,
        dplane: i64,
    ) -> Option<(usize, usize, usize)> {
        let tp = self.tp as i64;
        let col = self.col as i64 + dcol;
        let row = self.row as i64 + drow;
        let plane = self.plane as i64 + dplane;
        if col < 0 || col >= tp || row < 0 || row >= tp || plane < 0 || plane >= tp {
            None
        } else {
            Some((col as usize, row as usize, plane as usize))
        }
    }

    pub fn is_on_global_min_x(&self) -> bool {
        self.col == 0
    }
    pub fn is_on_global_max_x(&self) -> bool {
        self.col == self.tp - 1
    }
    pub fn is_on_global_min_y(&self) -> bool {
        self.row == 0
    }
    pub fn is_on_global_max_y(&self) -> bool {
        self.row == self.tp - 1
    }
    pub fn is_on_global_min_z(&self) -> bool {
        self.plane == 0
    }
    pub fn is_on_global_max_z(&self) -> bool {
        self.plane == self.tp - 1
    }
}

/// Returns `Some(root)` iff `n == root^3` for some non-negative integer.
pub fn integer_cube_root(n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let approx = (n as f64).cbrt().round() as usize;
    for cand in approx.saturating_sub(1)..=approx + 1 {
        if cand > 0 && cand * cand * cand == n {
            return Some(cand);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_cube_process_counts() {
        assert!(ProcLayout::new(0, 7).is_err());
        assert!(ProcLayout::new(0, 9).is_err());
    }

    #[test]
    fn round_trips_rank_to_coords() {
        let layout = ProcLayout::new(5, 8).unwrap();
        assert_eq!(layout.tp, 2);
        assert_eq!((layout.col, layout.row, layout.plane), (1, 0, 1));
        assert_eq!(layout.rank_of(1, 0, 1), 5);
    }

    #[test]
    fn single_rank_has_no_neighbors() {
        let layout = ProcLayout::new(0, 1).unwrap();
        assert!(!layout.has_neighbor(1, 0, 0));
        assert!(!layout.has_neighbor(-1, 0, 0));
    }

    #[test]
    fn corner_rank_sees_only_in_bounds_neighbors() {
        // tp=2: rank 0 sits at (0,0,0), the origin corner.
        let layout = ProcLayout::new(0, 8).unwrap();
        assert!(layout.has_neighbor(1, 0, 0));
        assert!(!layout.has_neighbor(-1, 0, 0));
        assert!(layout.has_neighbor(1, 1, 1));
        assert!(!layout.has_neighbor(-1, -1, -1));
    }
}
