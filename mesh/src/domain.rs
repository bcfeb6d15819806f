//! The `Domain`: structure-of-arrays storage for one subdomain's
//! element- and node-centered meshes, plus the index tables that let
//! the Lagrange driver avoid atomics (spec §3, §9 "Cyclic references").
//!
//! Built once in `Domain::new` and threaded explicitly through every
//! kernel and every halo-exchange call — there is no module-level
//! mutable state (spec §9, "Global mutable state").

use log::debug;

use crate::boundary::{self, Axis, FaceKind, Side};
use crate::error::DomainError;
use crate::ghost::{self, FaceId};
use crate::params::SimParams;
use crate::topology::ProcLayout;

/// Initial energy deposited at the origin element of the global mesh
/// (spec §8, testable property 6).
pub const INITIAL_ENERGY_DEPOSIT: f64 = 3.948746e7;

pub struct Domain {
    pub layout: ProcLayout,
    pub params: SimParams,

    pub nx: usize,
    pub num_elem: usize,
    pub num_node: usize,

    // --- element-centered (len = num_elem) ---
    pub e: Vec<f64>,
    pub p: Vec<f64>,
    pub q: Vec<f64>,
    pub ql: Vec<f64>,
    pub qq: Vec<f64>,
    pub v: Vec<f64>,
    pub volo: Vec<f64>,
    pub delv: Vec<f64>,
    pub vdov: Vec<f64>,
    pub arealg: Vec<f64>,
    pub ss: Vec<f64>,
    pub elem_mass: Vec<f64>,
    pub mat_elemlist: Vec<usize>,
    pub nodelist: Vec<usize>,
    pub lxim: Vec<usize>,
    pub lxip: Vec<usize>,
    pub letam: Vec<usize>,
    pub letap: Vec<usize>,
    pub lzetam: Vec<usize>,
    pub lzetap: Vec<usize>,
    pub elem_bc: Vec<u32>,

    // --- node-centered (len = num_node) ---
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub xd: Vec<f64>,
    pub yd: Vec<f64>,
    pub zd: Vec<f64>,
    pub xdd: Vec<f64>,
    pub ydd: Vec<f64>,
    pub zdd: Vec<f64>,
    pub fx: Vec<f64>,
    pub fy: Vec<f64>,
    pub fz: Vec<f64>,
    pub nodal_mass: Vec<f64>,

    pub symm_x: Vec<usize>,
    pub symm_y: Vec<usize>,
    pub symm_z: Vec<usize>,

    // --- node -> element inverse adjacency ---
    pub node_elem_count: Vec<usize>,
    pub node_elem_start: Vec<usize>,
    pub node_elem_corner_list: Vec<usize>,

    // --- global simulation state ---
    pub time: f64,
    pub deltatime: f64,
    pub cycle: u64,
}

fn node_index(nx: usize, i: usize, j: usize, k: usize) -> usize {
    let n1 = nx + 1;
    i + j * n1 + k * n1 * n1
}

fn elem_index(nx: usize, i: usize, j: usize, k: usize) -> usize {
    i + j * nx + k * nx * nx
}

/// The 8 corner offsets of a hex element in the node lattice, in the
/// fixed winding LULESH uses (columns 4..7 of the shape-function
/// derivatives are negations of columns 2,3,0,1 of this same order).
const CORNER_OFFSETS: [(usize, usize, usize); 8] = [
    (0, 0, 0),
    (1, 0, 0),
    (1, 1, 0),
    (0, 1, 0),
    (0, 0, 1),
    (1, 0, 1),
    (1, 1, 1),
    (0, 1, 1),
];

impl Domain {
    pub fn new(
        rank: usize,
        num_ranks: usize,
        nx: usize,
        params: SimParams,
    ) -> Result<Self, DomainError> {
        if nx == 0 {
            return Err(DomainError::InvalidEdgeLength(nx));
        }
        let layout = ProcLayout::new(rank, num_ranks)?;
        debug!(
            "building domain: rank={} tp={} coords=({},{},{}) nx={}",
            rank, layout.tp, layout.col, layout.row, layout.plane, nx
        );

        let num_elem = nx * nx * nx;
        let num_node = (nx + 1) * (nx + 1) * (nx + 1);
        let ds = 1.0 / nx as f64;

        let mut x = vec![0.0; num_node];
        let mut y = vec![0.0; num_node];
        let mut z = vec![0.0; num_node];
        for k in 0..=nx {
            for j in 0..=nx {
                for i in 0..=nx {
                    let n = node_index(nx, i, j, k);
                    x[n] = (layout.col as f64) + i as f64 * ds;
                    y[n] = (layout.row as f64) + j as f64 * ds;
                    z[n] = (layout.plane as f64) + k as f64 * ds;
                }
            }
        }

        let mut nodelist = vec![0usize; 8 * num_elem];
        for k in 0..nx {
            for j in 0..nx {
                for i in 0..nx {
                    let e = elem_index(nx, i, j, k);
                    for (c, (di, dj, dk)) in CORNER_OFFSETS.iter().enumerate() {
                        nodelist[8 * e + c] =
                            node_index(nx, i + di, j + dj, k + dk);
                    }
                }
            }
        }

        let mut elem_bc = vec![0u32; num_elem];
        let mut lxim = vec![0usize; num_elem];
        let mut lxip = vec![0usize; num_elem];
        let mut letam = vec![0usize; num_elem];
        let mut letap = vec![0usize; num_elem];
        let mut lzetam = vec![0usize; num_elem];
        let mut lzetap = vec![0usize; num_elem];

        for k in 0..nx {
            for j in 0..nx {
                for i in 0..nx {
                    let e = elem_index(nx, i, j, k);
                    let mut bc = 0u32;

                    if i == 0 {
                        if layout.is_on_global_min_x() {
                            bc |= boundary::XI_M_SYMM;
                            lxim[e] = e;
                        } else {
                            bc |= boundary::XI_M_COMM;
                            lxim[e] = ghost::ghost_slot(num_elem, nx, FaceId::XiM, j + k * nx);
                        }
                    } else {
                        lxim[e] = elem_index(nx, i - 1, j, k);
                    }

                    if i == nx - 1 {
                        if layout.is_on_global_max_x() {
                            bc |= boundary::XI_P_FREE;
                            lxip[e] = e;
                        } else {
                            bc |= boundary::XI_P_COMM;
                            lxip[e] = ghost::ghost_slot(num_elem, nx, FaceId::XiP, j + k * nx);
                        }
                    } else {
                        lxip[e] = elem_index(nx, i + 1, j, k);
                    }

                    if j == 0 {
                        if layout.is_on_global_min_y() {
                            bc |= boundary::ETA_M_SYMM;
                            letam[e] = e;
                        } else {
                            bc |= boundary::ETA_M_COMM;
                            letam[e] = ghost::ghost_slot(num_elem, nx, FaceId::EtaM, i + k * nx);
                        }
                    } else {
                        letam[e] = elem_index(nx, i, j - 1, k);
                    }

                    if j == nx - 1 {
                        if layout.is_on_global_max_y() {
                            bc |= boundary::ETA_P_FREE;
                            letap[e] = e;
                        } else {
                            bc |= boundary::ETA_P_COMM;
                            letap[e] = ghost::ghost_slot(num_elem, nx, FaceId::EtaP, i + k * nx);
                        }
                    } else {
                        letap[e] = elem_index(nx, i, j + 1, k);
                    }

                    if k == 0 {
                        if layout.is_on_global_min_z() {
                            bc |= boundary::ZETA_M_SYMM;
                            lzetam[e] = e;
                        } else {
                            bc |= boundary::ZETA_M_COMM;
                            lzetam[e] = ghost::ghost_slot(num_elem, nx, FaceId::ZetaM, i + j * nx);
                        }
                    } else {
                        lzetam[e] = elem_index(nx, i, j, k - 1);
                    }

                    if k == nx - 1 {
                        if layout.is_on_global_max_z() {
                            bc |= boundary::ZETA_P_FREE;
                            lzetap[e] = e;
                        } else {
                            bc |= boundary::ZETA_P_COMM;
                            lzetap[e] = ghost::ghost_slot(num_elem, nx, FaceId::ZetaP, i + j * nx);
                        }
                    } else {
                        lzetap[e] = elem_index(nx, i, j, k + 1);
                    }

                    elem_bc[e] = bc;
                }
            }
        }

        let volo = vec![ds * ds * ds; num_elem];
        let v = vec![1.0; num_elem];
        let elem_mass: Vec<f64> = volo.iter().map(|&vo| vo * params.refdens).collect();

        let (node_elem_count, node_elem_start, node_elem_corner_list) =
            build_inverse_connectivity(&nodelist, num_node, num_elem);

        let mut nodal_mass = vec![0.0; num_node];
        for n in 0..num_node {
            let start = node_elem_start[n];
            let count = node_elem_count[n];
            for slot in &node_elem_corner_list[start..start + count] {
                let elem = slot / 8;
                nodal_mass[n] += elem_mass[elem] / 8.0;
            }
        }

        let mut symm_x = Vec::new();
        let mut symm_y = Vec::new();
        let mut symm_z = Vec::new();
        if layout.is_on_global_min_x() {
            for k in 0..=nx {
                for j in 0..=nx {
                    symm_x.push(node_index(nx, 0, j, k));
                }
            }
        }
        if layout.is_on_global_min_y() {
            for k in 0..=nx {
                for i in 0..=nx {
                    symm_y.push(node_index(nx, i, 0, k));
                }
            }
        }
        if layout.is_on_global_min_z() {
            for j in 0..=nx {
                for i in 0..=nx {
                    symm_z.push(node_index(nx, i, j, 0));
                }
            }
        }

        let mut e = vec![0.0; num_elem];
        if layout.col == 0 && layout.row == 0 && layout.plane == 0 {
            e[elem_index(nx, 0, 0, 0)] = INITIAL_ENERGY_DEPOSIT;
        }

        Ok(Self {
            layout,
            params,
            nx,
            num_elem,
            num_node,
            e,
            p: vec![0.0; num_elem],
            q: vec![0.0; num_elem],
            ql: vec![0.0; num_elem],
            qq: vec![0.0; num_elem],
            v,
            volo,
            delv: vec![0.0; num_elem],
            vdov: vec![0.0; num_elem],
            arealg: vec![0.0; num_elem],
            ss: vec![0.0; num_elem],
            elem_mass,
            mat_elemlist: vec![0; num_elem],
            nodelist,
            lxim,
            lxip,
            letam,
            letap,
            lzetam,
            lzetap,
            elem_bc,
            x,
            y,
            z,
            xd: vec![0.0; num_node],
            yd: vec![0.0; num_node],
            zd: vec![0.0; num_node],
            xdd: vec![0.0; num_node],
            ydd: vec![0.0; num_node],
            zdd: vec![0.0; num_node],
            fx: vec![0.0; num_node],
            fy: vec![0.0; num_node],
            fz: vec![0.0; num_node],
            nodal_mass,
            symm_x,
            symm_y,
            symm_z,
            node_elem_count,
            node_elem_start,
            node_elem_corner_list,
            time: 0.0,
            deltatime: 1.0e-7,
            cycle: 0,
        })
    }

    /// The face-neighbor relation resolved per the element's boundary
    /// bitmask (spec §4.2, `CalcMonotonicQRegionForElems`).
    pub fn face_kind(&self, elem: usize, axis: Axis, side: Side) -> FaceKind {
        boundary::face_kind(self.elem_bc[elem], axis, side)
    }
}

/// Flattens the element->node `nodelist` into a node->element index,
/// per spec §3 ("scatter -> gather trick"): two passes, count then
/// fill, so the kernel loop can read a contiguous range per node
/// without ever writing concurrently to the same slot.
fn build_inverse_connectivity(
    nodelist: &[usize],
    num_node: usize,
    num_elem: usize,
) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
    let mut count = vec![0usize; num_node];
    for &n in nodelist {
        count[n] += 1;
    }
    let mut start = vec![0usize; num_node];
    let mut acc = 0usize;
    for n in 0..num_node {
        start[n] = acc;
        acc += count[n];
    }
    let mut cursor = start.clone();
    let mut corner_list = vec![0usize; 8 * num_elem];
    for elem in 0..num_elem {
        for corner in 0..8 {
            let n = nodelist[8 * elem + corner];
            corner_list[cursor[n]] = elem * 8 + corner;
            cursor[n] += 1;
        }
    }
    (count, start, corner_list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_rank_domain_has_positive_volumes() {
        let d = Domain::new(0, 1, 4, SimParams::default()).unwrap();
        assert!(d.v.iter().all(|&v| v > 0.0));
        assert!(d.volo.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn energy_deposit_lands_only_on_origin_rank_origin_element() {
        let d0 = Domain::new(0, 8, 3, SimParams::default()).unwrap();
        assert_eq!(d0.e[0], INITIAL_ENERGY_DEPOSIT);
        assert!(d0.e[1..].iter().all(|&e| e == 0.0));

        let d1 = Domain::new(1, 8, 3, SimParams::default()).unwrap();
        assert!(d1.e.iter().all(|&e| e == 0.0));
    }

    #[test]
    fn symmetry_planes_only_on_global_min_faces() {
        // tp=2: rank 0 is the (0,0,0) corner and owns all three planes.
        let d0 = Domain::new(0, 8, 3, SimParams::default()).unwrap();
        assert!(!d0.symm_x.is_empty());
        assert!(!d0.symm_y.is_empty());
        assert!(!d0.symm_z.is_empty());

        // rank 7 is the (1,1,1) corner, touching none of the global min faces.
        let d7 = Domain::new(7, 8, 3, SimParams::default()).unwrap();
        assert!(d7.symm_x.is_empty());
        assert!(d7.symm_y.is_empty());
        assert!(d7.symm_z.is_empty());
    }

    #[test]
    fn inverse_connectivity_covers_every_corner_exactly_once() {
        let d = Domain::new(0, 1, 3, SimParams::default()).unwrap();
        let total: usize = d.node_elem_count.iter().sum();
        assert_eq!(total, 8 * d.num_elem);
        let mut seen = vec![false; 8 * d.num_elem];
        for &slot in &d.node_elem_corner_list {
            assert!(!seen[slot], "corner slot {slot} visited twice");
            seen[slot] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn nodal_mass_sums_contributions_from_every_touching_element() {
        let d = Domain::new(0, 1, 2, SimParams::default()).unwrap();
        let total_nodal: f64 = d.nodal_mass.iter().sum();
        let total_elem: f64 = d.elem_mass.iter().sum();
        assert!((total_nodal - total_elem).abs() < 1e-12);
    }

    #[test]
    fn interior_face_neighbors_resolve_without_ghosts() {
        let d = Domain::new(0, 1, 4, SimParams::default()).unwrap();
        let center = elem_index(4, 2, 2, 2);
        assert!(d.lxim[center] < d.num_elem);
        assert!(d.lxip[center] < d.num_elem);
    }

    #[test]
    fn comm_faces_point_into_ghost_region() {
        // tp=2, rank 0 is at (0,0,0): its +x face (col+1 exists) is COMM.
        let nx = 3;
        let d = Domain::new(0, 8, nx, SimParams::default()).unwrap();
        let e = elem_index(nx, nx - 1, 0, 0);
        assert!(d.elem_bc[e] & boundary::XI_P_COMM != 0);
        assert!(d.lxip[e] >= d.num_elem);
    }
}
