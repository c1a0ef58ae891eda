use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};

/// Dense node identifier, always in `0..num_nodes`.
pub type NodeId = u32;
pub type Weight = u32;

/// A neighbor record stored in the CSR neighbor array.
///
/// Unweighted graphs store bare [`NodeId`]s; weighted graphs store
/// [`NodeWeight`] pairs. Identity (for deduplication and self-loop removal)
/// only looks at [`Destination::id`].
pub trait Destination: Copy + Default + Ord + Send + Sync + Debug + Display + 'static {
    const WEIGHTED: bool;

    /// Neighbor record for `id` with the default weight of 1.
    fn from_id(id: NodeId) -> Self;

    fn id(&self) -> NodeId;

    /// Same record pointing at `id` instead, keeping any weight.
    fn with_id(self, id: NodeId) -> Self;

    fn weight(&self) -> Weight;

    fn set_weight(&mut self, w: Weight);
}

impl Destination for NodeId {
    const WEIGHTED: bool = false;

    #[inline]
    fn from_id(id: NodeId) -> Self {
        id
    }

    #[inline]
    fn id(&self) -> NodeId {
        *self
    }

    #[inline]
    fn with_id(self, id: NodeId) -> Self {
        id
    }

    #[inline]
    fn weight(&self) -> Weight {
        1
    }

    #[inline]
    fn set_weight(&mut self, _w: Weight) {}
}

/// Weighted neighbor record.
///
/// Orders by id first and weight second, so sorting a slice puts the
/// lightest copy of a parallel edge first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeWeight {
    pub v: NodeId,
    pub w: Weight,
}

impl NodeWeight {
    pub fn new(v: NodeId, w: Weight) -> Self {
        Self { v, w }
    }
}

impl Ord for NodeWeight {
    fn cmp(&self, other: &Self) -> Ordering {
        self.v.cmp(&other.v).then(self.w.cmp(&other.w))
    }
}

impl PartialOrd for NodeWeight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for NodeWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.v, self.w)
    }
}

impl Destination for NodeWeight {
    const WEIGHTED: bool = true;

    #[inline]
    fn from_id(id: NodeId) -> Self {
        Self { v: id, w: 1 }
    }

    #[inline]
    fn id(&self) -> NodeId {
        self.v
    }

    #[inline]
    fn with_id(self, id: NodeId) -> Self {
        Self { v: id, w: self.w }
    }

    #[inline]
    fn weight(&self) -> Weight {
        self.w
    }

    #[inline]
    fn set_weight(&mut self, w: Weight) {
        self.w = w;
    }
}

/// A directed edge `u -> v`. For weighted graphs the weight rides on `v`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge<D> {
    pub u: NodeId,
    pub v: D,
}

impl<D: Destination> Edge<D> {
    pub fn new(u: NodeId, v: D) -> Self {
        Self { u, v }
    }

    /// Record to place in `v`'s slice when scattering the reverse direction:
    /// the source id, carrying the edge's weight.
    #[inline]
    pub fn source(&self) -> D {
        self.v.with_id(self.u)
    }
}

/// Unordered, possibly duplicated edges produced by ingestion.
pub type EdgeList<D> = Vec<Edge<D>>;
