use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::csr::CsrGraph;
use crate::degree::{Placement, discover_num_nodes};
use crate::generator::{Distribution, Generator, insert_weights};
use crate::reader::{Ingested, Reader};
use crate::relabel::relabel_by_degree;
use crate::scatter::make_csr;
use crate::squish::squish_graph;
use crate::types::{Destination, EdgeList};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    /// Insert both directions of every edge and build an undirected graph.
    pub symmetrize: bool,
    /// Keep the incoming adjacency of directed graphs.
    pub invert: bool,
    /// Node count to use instead of discovering it from the edges. Never
    /// shrinks below the largest id plus one.
    pub num_nodes: Option<usize>,
    /// Seed for synthetic weights.
    pub weight_seed: u64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            symmetrize: false,
            invert: true,
            num_nodes: None,
            weight_seed: crate::generator::DEFAULT_SEED,
        }
    }
}

/// Where the edges of a build come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EdgeSource {
    File(PathBuf),
    Synthetic {
        scale: u32,
        degree: usize,
        distribution: Distribution,
        seed: u64,
    },
}

/// Turns edge sources into squished CSR graphs.
///
/// `D` selects unweighted ([`crate::NodeId`]) or weighted
/// ([`crate::NodeWeight`]) neighbor records.
pub struct GraphBuilder<D> {
    options: BuildOptions,
    _dest: PhantomData<D>,
}

impl<D: Destination> GraphBuilder<D> {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            _dest: PhantomData,
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Reads or generates the edges and builds a squished graph. A
    /// serialized graph file is returned as loaded, without rebuilding.
    pub fn build(&self, source: &EdgeSource) -> Result<CsrGraph<D>> {
        let (edges, has_weights) = match source {
            EdgeSource::File(path) => match Reader::new(path.clone())?.read::<D>()? {
                Ingested::Graph(graph) => return Ok(graph),
                Ingested::Edges { edges, has_weights } => (edges, has_weights),
            },
            EdgeSource::Synthetic {
                scale,
                degree,
                distribution,
                seed,
            } => {
                let generator = Generator::new(*scale, *degree, *seed)?;
                (generator.generate_edge_list(*distribution)?, false)
            }
        };
        let graph = self.build_from_edge_list(edges, has_weights);
        Ok(squish_graph(graph))
    }

    /// Builds the unsquished CSR from `edges`. Slices may hold duplicates and
    /// self-loops, in arbitrary order.
    pub fn build_from_edge_list(&self, mut edges: EdgeList<D>, has_weights: bool) -> CsrGraph<D> {
        let start = Instant::now();
        let discovered = discover_num_nodes(&edges);
        let num_nodes = match self.options.num_nodes {
            Some(requested) if requested < discovered => {
                warn!(
                    "Requested {} nodes but edges reference {}; using {}",
                    requested, discovered, discovered
                );
                discovered
            }
            Some(requested) => requested,
            None => discovered,
        };
        debug!("Building from {} edges over {} nodes", edges.len(), num_nodes);

        if D::WEIGHTED && !has_weights {
            insert_weights(&mut edges, self.options.weight_seed);
        }

        let symmetrize = self.options.symmetrize;
        let outgoing = make_csr(&edges, num_nodes, Placement::new(symmetrize, false));
        let graph = if symmetrize {
            CsrGraph::undirected(outgoing)
        } else {
            let incoming = self
                .options
                .invert
                .then(|| make_csr(&edges, num_nodes, Placement::new(false, true)));
            CsrGraph::directed(outgoing, incoming)
        };
        info!("Build Time: {:?}", start.elapsed());
        graph
    }

    /// Builds and squishes in one step.
    pub fn build_squished(&self, edges: EdgeList<D>, has_weights: bool) -> CsrGraph<D> {
        squish_graph(self.build_from_edge_list(edges, has_weights))
    }

    /// Degree-ordered relabeling; see [`relabel_by_degree`].
    pub fn relabel(&self, graph: &CsrGraph<D>) -> Result<CsrGraph<D>> {
        Ok(relabel_by_degree(graph)?)
    }
}
