use rayon::prelude::*;

use crate::atomic_array::AtomicArray;
use crate::types::{Destination, Edge, NodeId};

/// Which endpoints of each edge receive an adjacency entry in one CSR pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub forward: bool,
    pub reverse: bool,
}

impl Placement {
    /// Symmetrized graphs place both directions; otherwise `transpose`
    /// selects the incoming side.
    pub fn new(symmetrize: bool, transpose: bool) -> Self {
        Self {
            forward: symmetrize || !transpose,
            reverse: symmetrize || transpose,
        }
    }
}

/// Largest endpoint id in `edges`, or `None` for an empty edge list.
pub fn find_max_node_id<D: Destination>(edges: &[Edge<D>]) -> Option<NodeId> {
    edges.par_iter().map(|e| e.u.max(e.v.id())).max()
}

/// Node count implied by the edge list: largest id plus one, zero when empty.
pub fn discover_num_nodes<D: Destination>(edges: &[Edge<D>]) -> usize {
    find_max_node_id(edges).map_or(0, |max| max as usize + 1)
}

/// Counts how many adjacency slots every node needs for one pass.
pub fn count_degrees<D: Destination>(
    edges: &[Edge<D>],
    num_nodes: usize,
    placement: Placement,
) -> Vec<usize> {
    let degrees = AtomicArray::zeroed(num_nodes);
    edges.par_iter().for_each(|e| {
        if placement.forward {
            degrees.fetch_add(e.u as usize, 1);
        }
        if placement.reverse {
            degrees.fetch_add(e.v.id() as usize, 1);
        }
    });
    degrees.into_vec()
}
