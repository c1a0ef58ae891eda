use std::time::Instant;

use rayon::prelude::*;
use tracing::{error, info};

use crate::csr::{Adjacency, CsrGraph, split_by_offsets};
use crate::error::GraphError;
use crate::prefix_sum::parallel_prefix_sum;
use crate::types::{Destination, NodeId};

/// Degree-descending order of node ids; ties put the larger id first.
pub fn degree_order<D: Destination>(g: &CsrGraph<D>) -> Vec<NodeId> {
    let mut pairs: Vec<(usize, NodeId)> = (0..g.num_nodes() as NodeId)
        .into_par_iter()
        .map(|n| (g.out_degree(n), n))
        .collect();
    pairs.par_sort_unstable_by(|a, b| b.cmp(a));
    pairs.into_iter().map(|(_, n)| n).collect()
}

/// Renumbers nodes so that the highest-degree node becomes 0, the next 1,
/// and so on, and rebuilds the adjacency under the new ids with every slice
/// sorted.
///
/// Only defined for undirected graphs; a directed graph yields
/// [`GraphError::RelabelDirected`], which callers treat as fatal.
pub fn relabel_by_degree<D: Destination>(g: &CsrGraph<D>) -> Result<CsrGraph<D>, GraphError> {
    if g.is_directed() {
        error!("Cannot relabel directed graph");
        return Err(GraphError::RelabelDirected);
    }
    let start = Instant::now();
    let num_nodes = g.num_nodes();
    let order = degree_order(g);

    let mut new_ids = vec![0 as NodeId; num_nodes];
    for (new_id, &old_id) in order.iter().enumerate() {
        new_ids[old_id as usize] = new_id as NodeId;
    }
    let degrees: Vec<usize> = order.par_iter().map(|&old| g.out_degree(old)).collect();

    let offsets = parallel_prefix_sum(&degrees);
    let mut neighbors = vec![D::default(); offsets[num_nodes]];
    split_by_offsets(&mut neighbors, &offsets)
        .into_par_iter()
        .zip(order.par_iter())
        .for_each(|(dst, &old)| {
            for (slot, d) in dst.iter_mut().zip(g.out_neigh(old)) {
                *slot = d.with_id(new_ids[d.id() as usize]);
            }
            dst.sort_unstable();
        });

    info!("Relabel: {} nodes in {:?}", num_nodes, start.elapsed());
    Ok(CsrGraph::undirected(Adjacency::from_parts(offsets, neighbors)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeWeight;

    // 0-1, 1-2, 1-3, 2-3 stored in both directions.
    fn small_undirected() -> CsrGraph<NodeId> {
        CsrGraph::undirected(Adjacency::from_parts(
            vec![0, 1, 4, 6, 8],
            vec![1, 0, 2, 3, 1, 3, 1, 2],
        ))
    }

    fn edge_set<D: Destination>(g: &CsrGraph<D>, map: impl Fn(NodeId) -> NodeId) -> Vec<(NodeId, NodeId)> {
        let mut edges = Vec::new();
        for u in 0..g.num_nodes() as NodeId {
            for d in g.out_neigh(u) {
                let (a, b) = (map(u), map(d.id()));
                edges.push((a.min(b), a.max(b)));
            }
        }
        edges.sort_unstable();
        edges
    }

    #[test]
    fn test_degree_order() {
        // degrees: 0->1, 1->3, 2->2, 3->2; tie between 2 and 3 puts 3 first.
        assert_eq!(degree_order(&small_undirected()), vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_relabel_preserves_edges_under_permutation() {
        let g = small_undirected();
        let order = degree_order(&g);
        let r = relabel_by_degree(&g).unwrap();

        assert_eq!(r.num_nodes(), 4);
        assert_eq!(r.num_edges(), g.num_edges());
        assert_eq!(r.out_degree(0), 3);
        for n in 0..4 {
            assert!(r.out_neigh(n).windows(2).all(|w| w[0] < w[1]));
        }

        let mut new_ids = vec![0; 4];
        for (new, &old) in order.iter().enumerate() {
            new_ids[old as usize] = new as NodeId;
        }
        assert_eq!(edge_set(&g, |n| new_ids[n as usize]), edge_set(&r, |n| n));
    }

    #[test]
    fn test_relabel_keeps_weights() {
        let g = CsrGraph::undirected(Adjacency::from_parts(
            vec![0, 1, 3, 4],
            vec![
                NodeWeight::new(1, 5),
                NodeWeight::new(0, 5),
                NodeWeight::new(2, 8),
                NodeWeight::new(1, 8),
            ],
        ));
        let r = relabel_by_degree(&g).unwrap();
        // old 1 has degree 2 and becomes 0; old 2 and old 0 tie, 2 wins.
        assert_eq!(r.out_neigh(0), &[NodeWeight::new(1, 8), NodeWeight::new(2, 5)]);
        assert_eq!(r.out_neigh(1), &[NodeWeight::new(0, 8)]);
        assert_eq!(r.out_neigh(2), &[NodeWeight::new(0, 5)]);
    }

    #[test]
    fn test_relabel_directed_is_rejected() {
        let g: CsrGraph<NodeId> = CsrGraph::directed(Adjacency::from_parts(vec![0, 1, 1], vec![1]), None);
        let err = relabel_by_degree(&g).unwrap_err();
        assert!(matches!(err, GraphError::RelabelDirected));
        assert_eq!(err.exit_code(), crate::error::RELABEL_DIRECTED_EXIT);
    }

    #[test]
    fn test_relabel_empty() {
        let g: CsrGraph<NodeId> = CsrGraph::undirected(Adjacency::empty(0));
        let r = relabel_by_degree(&g).unwrap();
        assert_eq!(r.num_nodes(), 0);
    }
}
