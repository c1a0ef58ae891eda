use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use crate::csr::{Adjacency, CsrGraph, split_by_offsets};
use crate::prefix_sum::parallel_prefix_sum;
use crate::types::{Destination, NodeId};

/// Sorts `slice`, drops repeated ids and entries equal to `node`, compacting
/// the survivors to the front. Returns how many survived.
///
/// Records with the same id count as duplicates regardless of weight; the
/// first after sorting (the lightest) is kept.
pub(crate) fn clean_slice<D: Destination>(slice: &mut [D], node: NodeId) -> usize {
    slice.sort_unstable();
    let mut len = 0;
    for i in 0..slice.len() {
        let d = slice[i];
        if d.id() == node || (len > 0 && slice[len - 1].id() == d.id()) {
            continue;
        }
        slice[len] = d;
        len += 1;
    }
    len
}

/// Cleans every node's slice in parallel and repacks the survivors into a
/// right-sized adjacency. The input is consumed and released.
pub fn squish_adjacency<D: Destination>(mut adj: Adjacency<D>) -> Adjacency<D> {
    let kept: Vec<usize> = adj
        .slices_mut()
        .into_par_iter()
        .enumerate()
        .map(|(n, slice)| clean_slice(slice, n as NodeId))
        .collect();

    let offsets = parallel_prefix_sum(&kept);
    let mut neighbors = vec![D::default(); offsets[kept.len()]];
    split_by_offsets(&mut neighbors, &offsets)
        .into_par_iter()
        .enumerate()
        .for_each(|(n, dst)| {
            let len = dst.len();
            dst.copy_from_slice(&adj.get(n as NodeId)[..len]);
        });

    Adjacency::from_parts(offsets, neighbors)
}

/// Squishes the outgoing side, and the incoming side when a directed graph
/// keeps one. Undirected graphs need the single pass.
pub fn squish_graph<D: Destination>(g: CsrGraph<D>) -> CsrGraph<D> {
    let start = Instant::now();
    let (_, directed, outgoing, incoming) = g.into_parts();
    let before = outgoing.num_slots();
    let outgoing = squish_adjacency(outgoing);
    let after = outgoing.num_slots();
    let squished = if directed {
        CsrGraph::directed(outgoing, incoming.map(squish_adjacency))
    } else {
        CsrGraph::undirected(outgoing)
    };
    info!(
        "Squish: {} -> {} outgoing slots in {:?}",
        before,
        after,
        start.elapsed()
    );
    squished
}
