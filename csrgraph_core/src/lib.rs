//! Parallel construction of compressed sparse row (CSR) graphs from
//! unordered edge lists.
//!
//! The pipeline is: count degrees, prefix-sum them into offsets, scatter
//! every edge into a slot reserved with an atomic cursor, then "squish"
//! each node's slice (sort, dedup, drop self-loops). Undirected graphs can
//! additionally be relabeled by descending degree.

pub mod atomic_array;
pub mod bucket;
pub mod builder;
pub mod csr;
pub mod degree;
pub mod error;
pub mod generator;
pub mod prefix_sum;
pub mod reader;
pub mod relabel;
pub mod scatter;
pub mod serialize;
pub mod squish;
pub mod types;

pub use builder::{BuildOptions, EdgeSource, GraphBuilder};
pub use csr::{Adjacency, CsrGraph, Graph, WGraph};
pub use error::GraphError;
pub use types::{Destination, Edge, EdgeList, NodeId, NodeWeight, Weight};
