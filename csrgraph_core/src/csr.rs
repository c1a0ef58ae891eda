use std::fmt::Write as _;

use tracing::info;

use crate::types::{Destination, NodeId, NodeWeight};

/// A Compressed Sparse Row adjacency: one flat neighbor array plus the
/// offsets that cut it into per-node slices.
///
/// Offsets and neighbors are allocated, replaced and dropped together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adjacency<D> {
    // Start of each node's slice in `neighbors`.
    // Length = num_nodes + 1
    offsets: Box<[usize]>,

    neighbors: Box<[D]>,
}

impl<D: Destination> Adjacency<D> {
    /// Pairs `offsets` with a neighbor array of exactly `offsets[n]` entries.
    pub(crate) fn from_parts(offsets: Vec<usize>, neighbors: Vec<D>) -> Self {
        debug_assert_eq!(offsets.last().copied().unwrap_or(0), neighbors.len());
        Self {
            offsets: offsets.into_boxed_slice(),
            neighbors: neighbors.into_boxed_slice(),
        }
    }

    pub fn empty(num_nodes: usize) -> Self {
        Self::from_parts(vec![0; num_nodes + 1], Vec::new())
    }

    /// Returns the neighbors of node `id`.
    /// Returns an empty slice if the ID is out of bounds.
    #[inline(always)]
    pub fn get(&self, id: NodeId) -> &[D] {
        let id = id as usize;
        if id + 1 < self.offsets.len() {
            &self.neighbors[self.offsets[id]..self.offsets[id + 1]]
        } else {
            &[]
        }
    }

    #[inline]
    pub fn degree(&self, id: NodeId) -> usize {
        self.get(id).len()
    }

    pub fn num_nodes(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Total neighbor slots, `offsets[num_nodes]`.
    pub fn num_slots(&self) -> usize {
        self.neighbors.len()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn neighbors(&self) -> &[D] {
        &self.neighbors
    }

    /// Per-node mutable slices of the neighbor array, indexed by node id.
    pub(crate) fn slices_mut(&mut self) -> Vec<&mut [D]> {
        split_by_offsets(&mut self.neighbors, &self.offsets)
    }
}

/// Cuts `data` into consecutive disjoint slices bounded by `offsets`.
pub(crate) fn split_by_offsets<'a, D>(mut data: &'a mut [D], offsets: &[usize]) -> Vec<&'a mut [D]> {
    let mut slices = Vec::with_capacity(offsets.len().saturating_sub(1));
    for w in offsets.windows(2) {
        let (head, tail) = std::mem::take(&mut data).split_at_mut(w[1] - w[0]);
        slices.push(head);
        data = tail;
    }
    slices
}

/// An immutable CSR graph.
///
/// Undirected (symmetrized) graphs keep a single adjacency holding both
/// directions of every edge. Directed graphs may also keep the incoming
/// adjacency when reverse traversal was requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsrGraph<D> {
    num_nodes: usize,
    directed: bool,
    outgoing: Adjacency<D>,
    incoming: Option<Adjacency<D>>,
}

pub type Graph = CsrGraph<NodeId>;
pub type WGraph = CsrGraph<NodeWeight>;

impl<D: Destination> CsrGraph<D> {
    pub fn undirected(outgoing: Adjacency<D>) -> Self {
        Self {
            num_nodes: outgoing.num_nodes(),
            directed: false,
            outgoing,
            incoming: None,
        }
    }

    pub fn directed(outgoing: Adjacency<D>, incoming: Option<Adjacency<D>>) -> Self {
        debug_assert!(
            incoming
                .as_ref()
                .is_none_or(|inc| inc.num_nodes() == outgoing.num_nodes())
        );
        Self {
            num_nodes: outgoing.num_nodes(),
            directed: true,
            outgoing,
            incoming,
        }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn is_weighted(&self) -> bool {
        D::WEIGHTED
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Edge count; an undirected edge is stored twice but counted once.
    pub fn num_edges(&self) -> usize {
        if self.directed {
            self.outgoing.num_slots()
        } else {
            self.outgoing.num_slots() / 2
        }
    }

    pub fn num_edges_directed(&self) -> usize {
        self.outgoing.num_slots()
    }

    pub fn out_degree(&self, n: NodeId) -> usize {
        self.outgoing.degree(n)
    }

    pub fn in_degree(&self, n: NodeId) -> usize {
        self.in_neigh(n).len()
    }

    pub fn out_neigh(&self, n: NodeId) -> &[D] {
        self.outgoing.get(n)
    }

    /// Incoming neighbors. Undirected graphs answer with the outgoing side;
    /// directed graphs built without a reverse side answer with nothing.
    pub fn in_neigh(&self, n: NodeId) -> &[D] {
        match (&self.incoming, self.directed) {
            (Some(incoming), _) => incoming.get(n),
            (None, false) => self.outgoing.get(n),
            (None, true) => &[],
        }
    }

    pub fn outgoing(&self) -> &Adjacency<D> {
        &self.outgoing
    }

    pub fn incoming(&self) -> Option<&Adjacency<D>> {
        self.incoming.as_ref()
    }

    pub fn has_incoming(&self) -> bool {
        self.incoming.is_some()
    }

    /// Copy of the offsets of one side, starting at zero.
    pub fn vertex_offsets(&self, in_graph: bool) -> Vec<usize> {
        let side = match (in_graph, &self.incoming) {
            (true, Some(incoming)) => incoming,
            _ => &self.outgoing,
        };
        side.offsets().to_vec()
    }

    pub(crate) fn into_parts(self) -> (usize, bool, Adjacency<D>, Option<Adjacency<D>>) {
        (self.num_nodes, self.directed, self.outgoing, self.incoming)
    }

    pub fn log_stats(&self) {
        let avg_degree = if self.num_nodes == 0 {
            0
        } else {
            self.num_edges() / self.num_nodes
        };
        info!(
            "Graph has {} nodes and {} {}directed edges for degree: {}",
            self.num_nodes,
            self.num_edges(),
            if self.directed { "" } else { "un" },
            avg_degree
        );
    }

    /// One line per node: `n: neighbor neighbor ...`.
    pub fn topology(&self) -> String {
        let mut out = String::new();
        for n in 0..self.num_nodes as NodeId {
            let _ = write!(out, "{}:", n);
            for d in self.out_neigh(n) {
                let _ = write!(out, " {}", d);
            }
            out.push('\n');
        }
        out
    }
}
