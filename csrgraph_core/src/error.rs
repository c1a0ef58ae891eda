use thiserror::Error;

/// Exit status used when a fatal invalid operation (relabeling a directed
/// graph) terminates the process.
pub const RELABEL_DIRECTED_EXIT: i32 = -11;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("cannot relabel directed graph")]
    RelabelDirected,

    #[error("bucket is sealed: appends are not allowed once iteration has begun")]
    BucketSealed,

    #[error("malformed edge on line {line}: {content:?}")]
    Parse { line: usize, content: String },

    #[error("unrecognized graph file suffix: {0}")]
    UnknownSuffix(String),

    #[error("expected a {expected} graph but found a {found} one")]
    WeightMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("scale {scale} exceeds the maximum of {max}")]
    ScaleTooLarge { scale: u32, max: u32 },

    #[error("invalid serialized graph: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),
}

impl GraphError {
    /// Process exit status a driver should use when this error ends the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            GraphError::RelabelDirected => RELABEL_DIRECTED_EXIT,
            _ => 1,
        }
    }

    pub(crate) fn weight_mismatch(expected_weighted: bool) -> Self {
        GraphError::WeightMismatch {
            expected: weight_label(expected_weighted),
            found: weight_label(!expected_weighted),
        }
    }
}

fn weight_label(weighted: bool) -> &'static str {
    if weighted { "weighted" } else { "unweighted" }
}
