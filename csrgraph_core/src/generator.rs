//! Synthetic edge lists and synthetic weights.
//!
//! Every block of edges draws from its own `StdRng` seeded with
//! `seed + block`, so blocks run on any thread and a given seed always
//! yields the same edge multiset.

use std::time::Instant;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::info;

use crate::bucket::Bucket;
use crate::error::GraphError;
use crate::types::{Destination, Edge, EdgeList, NodeId, Weight};

/// Edges generated per parallel block.
const BLOCK_SIZE: usize = 1 << 18;

pub const DEFAULT_DEGREE: usize = 16;
pub const DEFAULT_SEED: u64 = 8;
pub const MAX_WEIGHT: Weight = 255;
/// Largest scale whose node ids still fit in a [`NodeId`].
pub const MAX_SCALE: u32 = 31;

// R-MAT quadrant probabilities; the fourth is 1 - A - B - C.
const KRON_A: f64 = 0.57;
const KRON_B: f64 = 0.19;
const KRON_C: f64 = 0.19;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Distribution {
    Uniform,
    /// Skewed (power-law) degrees via recursive quadrant selection.
    Kronecker,
}

fn block_rng(seed: u64, block: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add(block as u64))
}

#[derive(Clone, Debug)]
pub struct Generator {
    scale: u32,
    degree: usize,
    seed: u64,
}

impl Generator {
    /// Generator for `2^scale` nodes with `degree` edges per node.
    pub fn new(scale: u32, degree: usize, seed: u64) -> Result<Self, GraphError> {
        if scale > MAX_SCALE {
            return Err(GraphError::ScaleTooLarge {
                scale,
                max: MAX_SCALE,
            });
        }
        Ok(Self {
            scale,
            degree,
            seed,
        })
    }

    pub fn num_nodes(&self) -> usize {
        1usize << self.scale
    }

    pub fn num_edges(&self) -> usize {
        self.num_nodes() * self.degree
    }

    pub fn generate_edge_list<D: Destination>(&self, dist: Distribution) -> Result<EdgeList<D>> {
        let start = Instant::now();
        let num_edges = self.num_edges();
        let num_blocks = num_edges.div_ceil(BLOCK_SIZE);
        let bucket = Bucket::new();

        (0..num_blocks).into_par_iter().try_for_each(|block| {
            let mut rng = block_rng(self.seed, block);
            let block_end = ((block + 1) * BLOCK_SIZE).min(num_edges);
            let local: EdgeList<D> = (block * BLOCK_SIZE..block_end)
                .map(|_| match dist {
                    Distribution::Uniform => self.uniform_edge(&mut rng),
                    Distribution::Kronecker => self.kronecker_edge(&mut rng),
                })
                .map(|(u, v)| Edge::new(u, D::from_id(v)))
                .collect();
            bucket.bulk_absorb(local)
        })?;
        let mut edges = bucket.into_vec();

        if dist == Distribution::Kronecker {
            self.permute_ids(&mut edges);
        }
        info!(
            "Generated {} {:?} edges over {} nodes in {:?}",
            edges.len(),
            dist,
            self.num_nodes(),
            start.elapsed()
        );
        Ok(edges)
    }

    fn uniform_edge(&self, rng: &mut impl Rng) -> (NodeId, NodeId) {
        let n = self.num_nodes() as NodeId;
        (rng.random_range(0..n), rng.random_range(0..n))
    }

    fn kronecker_edge(&self, rng: &mut impl Rng) -> (NodeId, NodeId) {
        let (mut u, mut v) = (0 as NodeId, 0 as NodeId);
        for _ in 0..self.scale {
            let r: f64 = rng.random();
            let (du, dv) = if r < KRON_A {
                (0, 0)
            } else if r < KRON_A + KRON_B {
                (0, 1)
            } else if r < KRON_A + KRON_B + KRON_C {
                (1, 0)
            } else {
                (1, 1)
            };
            u = (u << 1) | du;
            v = (v << 1) | dv;
        }
        (u, v)
    }

    /// Scatters the low-numbered hubs a Kronecker graph concentrates on.
    fn permute_ids<D: Destination>(&self, edges: &mut [Edge<D>]) {
        let mut permutation: Vec<NodeId> = (0..self.num_nodes())
            .map(|n| n as NodeId)
            .collect();
        permutation.shuffle(&mut StdRng::seed_from_u64(self.seed));
        edges.par_iter_mut().for_each(|e| {
            e.u = permutation[e.u as usize];
            e.v = e.v.with_id(permutation[e.v.id() as usize]);
        });
    }
}

/// Gives every edge a weight in `1..=MAX_WEIGHT`.
pub fn insert_weights<D: Destination>(edges: &mut [Edge<D>], seed: u64) {
    edges
        .par_chunks_mut(BLOCK_SIZE)
        .enumerate()
        .for_each(|(block, chunk)| {
            let mut rng = block_rng(seed, block);
            for e in chunk {
                e.v.set_weight(rng.random_range(1..=MAX_WEIGHT));
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeWeight;

    fn sorted_pairs(edges: &[Edge<NodeId>]) -> Vec<(NodeId, NodeId)> {
        let mut pairs: Vec<_> = edges.iter().map(|e| (e.u, e.v)).collect();
        pairs.sort_unstable();
        pairs
    }

    #[test]
    fn test_uniform_sizes_and_range() {
        let generator = Generator::new(6, 4, DEFAULT_SEED).unwrap();
        let edges: EdgeList<NodeId> = generator.generate_edge_list(Distribution::Uniform).unwrap();
        assert_eq!(edges.len(), 256);
        assert!(edges.iter().all(|e| e.u < 64 && e.v < 64));
    }

    #[test]
    fn test_kronecker_sizes_and_range() {
        let generator = Generator::new(7, 8, DEFAULT_SEED).unwrap();
        let edges: EdgeList<NodeId> =
            generator.generate_edge_list(Distribution::Kronecker).unwrap();
        assert_eq!(edges.len(), 1024);
        assert!(edges.iter().all(|e| e.u < 128 && e.v < 128));
    }

    #[test]
    fn test_same_seed_same_multiset() {
        let a: EdgeList<NodeId> = Generator::new(5, 16, 3)
            .unwrap()
            .generate_edge_list(Distribution::Kronecker)
            .unwrap();
        let b: EdgeList<NodeId> = Generator::new(5, 16, 3)
            .unwrap()
            .generate_edge_list(Distribution::Kronecker)
            .unwrap();
        let c: EdgeList<NodeId> = Generator::new(5, 16, 4)
            .unwrap()
            .generate_edge_list(Distribution::Kronecker)
            .unwrap();
        assert_eq!(sorted_pairs(&a), sorted_pairs(&b));
        assert_ne!(sorted_pairs(&a), sorted_pairs(&c));
    }

    #[test]
    fn test_multiple_blocks() {
        let generator = Generator::new(15, 16, DEFAULT_SEED).unwrap();
        let edges: EdgeList<NodeId> = generator.generate_edge_list(Distribution::Uniform).unwrap();
        assert_eq!(edges.len(), 1 << 19);
    }

    #[test]
    fn test_insert_weights_in_range() {
        let mut edges: EdgeList<NodeWeight> = Generator::new(4, 16, DEFAULT_SEED)
            .unwrap()
            .generate_edge_list(Distribution::Uniform)
            .unwrap();
        assert!(edges.iter().all(|e| e.v.w == 1));
        insert_weights(&mut edges, DEFAULT_SEED);
        assert!(edges.iter().all(|e| (1..=MAX_WEIGHT).contains(&e.v.w)));
        assert!(edges.iter().any(|e| e.v.w != edges[0].v.w));
    }

    #[test]
    fn test_rejects_scale_beyond_node_id_range() {
        assert!(Generator::new(MAX_SCALE, 1, DEFAULT_SEED).is_ok());
        for scale in [MAX_SCALE + 1, 64, u32::MAX] {
            assert!(matches!(
                Generator::new(scale, 1, DEFAULT_SEED),
                Err(GraphError::ScaleTooLarge { max: MAX_SCALE, .. })
            ));
        }
    }

    #[test]
    fn test_scale_zero_has_one_node() {
        let generator = Generator::new(0, 4, DEFAULT_SEED).unwrap();
        let edges: EdgeList<NodeId> = generator.generate_edge_list(Distribution::Uniform).unwrap();
        assert_eq!(edges.len(), 4);
        assert!(edges.iter().all(|e| e.u == 0 && e.v == 0));
    }

    #[test]
    fn test_insert_weights_is_deterministic_across_blocks() {
        let edges: EdgeList<NodeWeight> = (0..(BLOCK_SIZE + 100) as NodeId)
            .map(|i| Edge::new(i, NodeWeight::from_id(i)))
            .collect();
        let mut a = edges.clone();
        let mut b = edges;
        insert_weights(&mut a, 11);
        insert_weights(&mut b, 11);
        assert_eq!(a, b);
        assert!(a.iter().all(|e| (1..=MAX_WEIGHT).contains(&e.v.w)));
        assert!(a.iter().any(|e| e.v.w == MAX_WEIGHT));
    }
}
