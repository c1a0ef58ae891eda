use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::{DataFrame, LazyFrame, PlPath};
use rayon::prelude::*;
use tracing::info;

use crate::bucket::Bucket;
use crate::csr::CsrGraph;
use crate::error::GraphError;
use crate::serialize::load_graph;
use crate::types::{Destination, Edge, EdgeList, NodeId, Weight};

/// Lines per parallel parse block.
const PARSE_BLOCK: usize = 1 << 16;

/// What a graph file holds, decided by its suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    /// `.el`: `u v` per line.
    EdgeList,
    /// `.wel`: `u v w` per line.
    WeightedEdgeList,
    /// `.parquet`: `src`, `dst` and optional `weight` columns.
    Parquet,
    /// `.sg`: serialized unweighted graph.
    Serialized,
    /// `.wsg`: serialized weighted graph.
    WeightedSerialized,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self, GraphError> {
        let suffix = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        match suffix {
            "el" => Ok(FileKind::EdgeList),
            "wel" => Ok(FileKind::WeightedEdgeList),
            "parquet" => Ok(FileKind::Parquet),
            "sg" => Ok(FileKind::Serialized),
            "wsg" => Ok(FileKind::WeightedSerialized),
            _ => Err(GraphError::UnknownSuffix(path.display().to_string())),
        }
    }

    pub fn is_serialized(self) -> bool {
        matches!(self, FileKind::Serialized | FileKind::WeightedSerialized)
    }
}

/// Result of ingesting a file.
#[derive(Debug)]
pub enum Ingested<D> {
    /// Raw edges; `has_weights` tells whether the input carried weights.
    Edges {
        edges: EdgeList<D>,
        has_weights: bool,
    },
    /// A prebuilt graph that skips construction.
    Graph(CsrGraph<D>),
}

pub struct Reader {
    path: PathBuf,
    kind: FileKind,
}

impl Reader {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, GraphError> {
        let path = path.into();
        let kind = FileKind::from_path(&path)?;
        Ok(Self { path, kind })
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn read<D: Destination>(&self) -> Result<Ingested<D>> {
        let start = Instant::now();
        let ingested = match self.kind {
            FileKind::Serialized | FileKind::WeightedSerialized => {
                let file_weighted = self.kind == FileKind::WeightedSerialized;
                if file_weighted != D::WEIGHTED {
                    return Err(GraphError::weight_mismatch(D::WEIGHTED))
                        .with_context(|| format!("Cannot load {}", self.path.display()));
                }
                Ingested::Graph(load_graph(&self.path)?)
            }
            FileKind::EdgeList => Ingested::Edges {
                edges: self.read_text(false)?,
                has_weights: false,
            },
            FileKind::WeightedEdgeList => Ingested::Edges {
                edges: self.read_text(true)?,
                has_weights: true,
            },
            FileKind::Parquet => {
                let (edges, has_weights) = self.read_parquet()?;
                Ingested::Edges { edges, has_weights }
            }
        };
        info!("Read {} in {:?}", self.path.display(), start.elapsed());
        Ok(ingested)
    }

    fn read_text<D: Destination>(&self, weighted_file: bool) -> Result<EdgeList<D>> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Error reading {}", self.path.display()))?;
        let edges = parse_edge_text(&contents, weighted_file)
            .with_context(|| format!("Error parsing {}", self.path.display()))?;
        Ok(edges)
    }

    fn read_parquet<D: Destination>(&self) -> Result<(EdgeList<D>, bool)> {
        let path: PlPath = PlPath::Local(Arc::from(self.path.as_path()));
        let df: DataFrame = LazyFrame::scan_parquet(path, Default::default())?.collect()?;

        let src = df.column("src")?.u32()?;
        let dst = df.column("dst")?.u32()?;
        let weights = match df.column("weight") {
            Ok(column) => Some(column.u32()?),
            Err(_) => None,
        };

        let mut edges: EdgeList<D> = Vec::with_capacity(df.height());
        match weights {
            Some(w_col) => {
                for ((opt_u, opt_v), opt_w) in src.into_iter().zip(dst.into_iter()).zip(w_col.into_iter())
                {
                    if let (Some(u), Some(v), Some(w)) = (opt_u, opt_v, opt_w) {
                        let mut d = D::from_id(v);
                        d.set_weight(w);
                        edges.push(Edge::new(u, d));
                    }
                }
            }
            None => {
                for (opt_u, opt_v) in src.into_iter().zip(dst.into_iter()) {
                    if let (Some(u), Some(v)) = (opt_u, opt_v) {
                        edges.push(Edge::new(u, D::from_id(v)));
                    }
                }
            }
        }
        Ok((edges, weights.is_some()))
    }
}

/// Parses a text edge list in parallel blocks.
///
/// Blank lines and lines starting with `#` or `%` are skipped. Edges come
/// out grouped by block in no particular block order.
pub fn parse_edge_text<D: Destination>(
    contents: &str,
    weighted_file: bool,
) -> Result<EdgeList<D>, GraphError> {
    let lines: Vec<&str> = contents.lines().collect();
    let bucket = Bucket::new();
    lines
        .par_chunks(PARSE_BLOCK)
        .enumerate()
        .try_for_each(|(block, chunk)| {
            let mut local = Vec::with_capacity(chunk.len());
            for (i, line) in chunk.iter().enumerate() {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') {
                    continue;
                }
                let edge = parse_edge_line(trimmed, weighted_file).ok_or_else(|| {
                    GraphError::Parse {
                        line: block * PARSE_BLOCK + i + 1,
                        content: line.to_string(),
                    }
                })?;
                local.push(edge);
            }
            bucket.bulk_absorb(local)
        })?;
    Ok(bucket.into_vec())
}

fn parse_edge_line<D: Destination>(line: &str, weighted_file: bool) -> Option<Edge<D>> {
    let mut parts = line.split_whitespace();
    let u = parts.next()?.parse::<NodeId>().ok()?;
    let v = parts.next()?.parse::<NodeId>().ok()?;
    let mut d = D::from_id(v);
    if weighted_file {
        let w = parts.next()?.parse::<Weight>().ok()?;
        d.set_weight(w);
    }
    match parts.next() {
        Some(_) => None,
        None => Some(Edge::new(u, d)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeWeight;

    #[test]
    fn test_file_kind_from_suffix() {
        assert_eq!(FileKind::from_path(Path::new("g.el")).unwrap(), FileKind::EdgeList);
        assert_eq!(
            FileKind::from_path(Path::new("dir/g.wel")).unwrap(),
            FileKind::WeightedEdgeList
        );
        assert_eq!(FileKind::from_path(Path::new("g.parquet")).unwrap(), FileKind::Parquet);
        assert!(FileKind::from_path(Path::new("g.sg")).unwrap().is_serialized());
        assert!(FileKind::from_path(Path::new("g.wsg")).unwrap().is_serialized());
        assert!(matches!(
            FileKind::from_path(Path::new("g.txt")),
            Err(GraphError::UnknownSuffix(_))
        ));
        assert!(matches!(
            FileKind::from_path(Path::new("noext")),
            Err(GraphError::UnknownSuffix(_))
        ));
    }

    #[test]
    fn test_parse_unweighted_text() {
        let text = "# comment\n0 1\n\n% other comment\n2\t3\n  4 5  \n";
        let mut edges: EdgeList<NodeId> = parse_edge_text(text, false).unwrap();
        edges.sort_by_key(|e| (e.u, e.v));
        assert_eq!(edges, vec![Edge::new(0, 1), Edge::new(2, 3), Edge::new(4, 5)]);
    }

    #[test]
    fn test_parse_weighted_text() {
        let edges: EdgeList<NodeWeight> = parse_edge_text("0 1 7\n", true).unwrap();
        assert_eq!(edges, vec![Edge::new(0, NodeWeight::new(1, 7))]);

        // Weighted graph from an unweighted file gets placeholder weights.
        let edges: EdgeList<NodeWeight> = parse_edge_text("0 1\n", false).unwrap();
        assert_eq!(edges, vec![Edge::new(0, NodeWeight::new(1, 1))]);

        // Unweighted graph from a weighted file drops the weight.
        let edges: EdgeList<NodeId> = parse_edge_text("0 1 7\n", true).unwrap();
        assert_eq!(edges, vec![Edge::new(0, 1)]);
    }

    #[test]
    fn test_parse_errors_report_line() {
        let err = parse_edge_text::<NodeId>("0 1\n1 x\n", false).unwrap_err();
        match err {
            GraphError::Parse { line, content } => {
                assert_eq!(line, 2);
                assert_eq!(content, "1 x");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(parse_edge_text::<NodeId>("0 1 2\n", false).is_err());
        assert!(parse_edge_text::<NodeWeight>("0 1\n", true).is_err());
        assert!(parse_edge_text::<NodeId>("-1 2\n", false).is_err());
    }

    #[test]
    fn test_parse_empty_text() {
        let edges: EdgeList<NodeId> = parse_edge_text("", false).unwrap();
        assert!(edges.is_empty());
    }
}
