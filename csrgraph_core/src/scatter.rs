use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::atomic_array::AtomicArray;
use crate::csr::Adjacency;
use crate::degree::{Placement, count_degrees};
use crate::prefix_sum::parallel_prefix_sum;
use crate::types::{Destination, Edge};

/// Raw pointer into a buffer that many threads write at disjoint indices.
struct SharedMut<T>(*mut T);

unsafe impl<T: Send> Send for SharedMut<T> {}
unsafe impl<T: Send> Sync for SharedMut<T> {}

impl<T> SharedMut<T> {
    /// # Safety
    ///
    /// `index` must be within the buffer's capacity and no other thread may
    /// write or read the same index concurrently.
    #[inline]
    unsafe fn write(&self, index: usize, value: T) {
        unsafe { self.0.add(index).write(value) }
    }
}

/// Builds one adjacency side from an edge list.
///
/// Counts degrees, turns them into offsets and scatters every edge into a
/// slot reserved by bumping its node's cursor. Slot order inside a node's
/// slice follows thread interleaving and is not meaningful.
pub fn make_csr<D: Destination>(
    edges: &[Edge<D>],
    num_nodes: usize,
    placement: Placement,
) -> Adjacency<D> {
    let start = Instant::now();
    let degrees = count_degrees(edges, num_nodes, placement);
    debug!("Computed degrees in {:?}", start.elapsed());

    let start = Instant::now();
    let offsets = parallel_prefix_sum(&degrees);
    drop(degrees);
    debug!("Computed prefix sum in {:?}", start.elapsed());

    let start = Instant::now();
    let total = offsets[num_nodes];
    // The cursors start as a copy of the offsets; `offsets` itself stays
    // untouched for the index.
    let cursors = AtomicArray::from_vec(offsets.clone());
    let mut neighbors: Vec<D> = Vec::with_capacity(total);
    let slots = SharedMut(neighbors.as_mut_ptr());

    // SAFETY: a cursor for node `n` starts at offsets[n] and is bumped once
    // per entry counted for `n`, so every returned slot lies in
    // [offsets[n], offsets[n + 1]) and no slot is returned twice. Together
    // the slots cover 0..total exactly once.
    edges.par_iter().for_each(|e| {
        if placement.forward {
            let slot = cursors.fetch_add(e.u as usize, 1);
            unsafe { slots.write(slot, e.v) };
        }
        if placement.reverse {
            let slot = cursors.fetch_add(e.v.id() as usize, 1);
            unsafe { slots.write(slot, e.source()) };
        }
    });
    debug_assert!((0..num_nodes).all(|n| cursors.load(n) == offsets[n + 1]));

    // SAFETY: all `total` slots were initialized above.
    unsafe { neighbors.set_len(total) };
    info!("Scattered {} adjacency slots in {:?}", total, start.elapsed());

    Adjacency::from_parts(offsets, neighbors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeList, NodeId, NodeWeight};

    fn edges(pairs: &[(u32, u32)]) -> EdgeList<NodeId> {
        pairs.iter().map(|&(u, v)| Edge::new(u, v)).collect()
    }

    fn sorted(slice: &[NodeId]) -> Vec<NodeId> {
        let mut v = slice.to_vec();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_forward_scatter() {
        let el = edges(&[(0, 1), (0, 2), (2, 1), (0, 1)]);
        let adj = make_csr(&el, 3, Placement::new(false, false));
        assert_eq!(adj.offsets(), &[0, 3, 3, 4]);
        assert_eq!(sorted(adj.get(0)), vec![1, 1, 2]);
        assert_eq!(adj.get(1), &[] as &[u32]);
        assert_eq!(adj.get(2), &[1]);
    }

    #[test]
    fn test_transposed_scatter() {
        let el = edges(&[(0, 1), (0, 2), (2, 1)]);
        let adj = make_csr(&el, 3, Placement::new(false, true));
        assert_eq!(adj.get(0), &[] as &[u32]);
        assert_eq!(sorted(adj.get(1)), vec![0, 2]);
        assert_eq!(adj.get(2), &[0]);
    }

    #[test]
    fn test_symmetrized_scatter_places_both_ends() {
        let el = edges(&[(0, 1), (1, 2)]);
        let adj = make_csr(&el, 3, Placement::new(true, false));
        assert_eq!(adj.num_slots(), 4);
        assert_eq!(adj.get(0), &[1]);
        assert_eq!(sorted(adj.get(1)), vec![0, 2]);
        assert_eq!(adj.get(2), &[1]);
    }

    #[test]
    fn test_reverse_records_keep_weights() {
        let el = vec![Edge::new(0, NodeWeight::new(1, 7))];
        let adj = make_csr(&el, 2, Placement::new(true, false));
        assert_eq!(adj.get(0), &[NodeWeight::new(1, 7)]);
        assert_eq!(adj.get(1), &[NodeWeight::new(0, 7)]);
    }

    #[test]
    fn test_every_edge_lands_somewhere() {
        let pairs: Vec<(u32, u32)> = (0..5000u32).map(|i| (i % 37, (i * 7) % 53)).collect();
        let el = edges(&pairs);
        let adj = make_csr(&el, 53, Placement::new(false, false));
        assert_eq!(adj.num_slots(), el.len());
        for e in &el {
            assert!(adj.get(e.u).contains(&e.v));
        }
    }

    #[test]
    fn test_empty_edge_list() {
        let adj = make_csr::<NodeId>(&[], 0, Placement::new(true, false));
        assert_eq!(adj.offsets(), &[0]);
        assert_eq!(adj.num_slots(), 0);
    }
}
