//! Raw binary persistence of built graphs, and text edge-list output.
//!
//! Layout (little endian):
//!
//! ```text
//! "CSRG" | version u32 | flags u8 (bit0 directed, bit1 weighted) | num_nodes u64
//! outgoing side
//! [directed only] has_incoming u8 | incoming side (when has_incoming == 1)
//!
//! side := offsets (num_nodes + 1) x u64 | neighbors x (id u32 [, weight u32])
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::info;

use crate::csr::{Adjacency, CsrGraph};
use crate::error::GraphError;
use crate::types::{Destination, Edge, NodeId};

const MAGIC: &[u8; 4] = b"CSRG";
const VERSION: u32 = 1;
const FLAG_DIRECTED: u8 = 0b01;
const FLAG_WEIGHTED: u8 = 0b10;

// Caps speculative allocation while reading untrusted sizes.
const MAX_PREALLOC: usize = 1 << 20;

pub fn write_graph<D: Destination, W: Write>(g: &CsrGraph<D>, writer: &mut W) -> Result<()> {
    // Header: Magic (4) + Version (4) + Flags (1) + Nodes (8)
    writer.write_all(MAGIC)?;
    writer.write_u32::<LittleEndian>(VERSION)?;
    let mut flags = 0;
    if g.is_directed() {
        flags |= FLAG_DIRECTED;
    }
    if D::WEIGHTED {
        flags |= FLAG_WEIGHTED;
    }
    writer.write_u8(flags)?;
    writer.write_u64::<LittleEndian>(g.num_nodes() as u64)?;

    write_side(g.outgoing(), writer)?;
    if g.is_directed() {
        match g.incoming() {
            Some(incoming) => {
                writer.write_u8(1)?;
                write_side(incoming, writer)?;
            }
            None => writer.write_u8(0)?,
        }
    }
    Ok(())
}

fn write_side<D: Destination, W: Write>(adj: &Adjacency<D>, writer: &mut W) -> Result<()> {
    for &offset in adj.offsets() {
        writer.write_u64::<LittleEndian>(offset as u64)?;
    }
    for d in adj.neighbors() {
        writer.write_u32::<LittleEndian>(d.id())?;
        if D::WEIGHTED {
            writer.write_u32::<LittleEndian>(d.weight())?;
        }
    }
    Ok(())
}

pub fn read_graph<D: Destination, R: Read>(reader: &mut R) -> Result<CsrGraph<D>, GraphError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(GraphError::InvalidFormat("bad magic".to_string()));
    }
    let version = reader.read_u32::<LittleEndian>()?;
    if version != VERSION {
        return Err(GraphError::InvalidFormat(format!(
            "unsupported version {}",
            version
        )));
    }
    let flags = reader.read_u8()?;
    if (flags & FLAG_WEIGHTED != 0) != D::WEIGHTED {
        return Err(GraphError::weight_mismatch(D::WEIGHTED));
    }
    let num_nodes = usize::try_from(reader.read_u64::<LittleEndian>()?)
        .ok()
        .filter(|n| n.checked_add(1).is_some())
        .ok_or_else(|| GraphError::InvalidFormat("node count out of range".to_string()))?;

    let outgoing = read_side(reader, num_nodes)?;
    if flags & FLAG_DIRECTED == 0 {
        return Ok(CsrGraph::undirected(outgoing));
    }
    let incoming = match reader.read_u8()? {
        0 => None,
        1 => Some(read_side(reader, num_nodes)?),
        other => {
            return Err(GraphError::InvalidFormat(format!(
                "bad incoming marker {}",
                other
            )));
        }
    };
    Ok(CsrGraph::directed(outgoing, incoming))
}

fn read_side<D: Destination, R: Read>(
    reader: &mut R,
    num_nodes: usize,
) -> Result<Adjacency<D>, GraphError> {
    let mut offsets = Vec::with_capacity((num_nodes + 1).min(MAX_PREALLOC));
    let mut previous = 0;
    for i in 0..=num_nodes {
        let offset = reader.read_u64::<LittleEndian>()? as usize;
        if (i == 0 && offset != 0) || offset < previous {
            return Err(GraphError::InvalidFormat(format!(
                "offsets not monotone from zero at node {}",
                i
            )));
        }
        previous = offset;
        offsets.push(offset);
    }

    let total = previous;
    let mut neighbors = Vec::with_capacity(total.min(MAX_PREALLOC));
    for _ in 0..total {
        let id: NodeId = reader.read_u32::<LittleEndian>()?;
        if id as usize >= num_nodes {
            return Err(GraphError::InvalidFormat(format!(
                "neighbor {} out of range for {} nodes",
                id, num_nodes
            )));
        }
        let mut d = D::from_id(id);
        if D::WEIGHTED {
            d.set_weight(reader.read_u32::<LittleEndian>()?);
        }
        neighbors.push(d);
    }
    Ok(Adjacency::from_parts(offsets, neighbors))
}

pub fn save_graph<D: Destination>(g: &CsrGraph<D>, path: &Path) -> Result<()> {
    let start = Instant::now();
    let out_file = File::create(path)
        .with_context(|| format!("Error opening output file {}", path.display()))?;
    let mut writer = BufWriter::new(out_file);
    write_graph(g, &mut writer)?;
    writer.flush()?;
    info!("Wrote {} in {:?}", path.display(), start.elapsed());
    Ok(())
}

pub fn load_graph<D: Destination>(path: &Path) -> Result<CsrGraph<D>> {
    let start = Instant::now();
    let file = File::open(path).with_context(|| format!("Error opening {}", path.display()))?;
    let graph = read_graph(&mut BufReader::new(file))
        .with_context(|| format!("Error loading serialized graph {}", path.display()))?;
    info!("Loaded {} in {:?}", path.display(), start.elapsed());
    Ok(graph)
}

/// Writes edges as text, one `u v` (or `u v w` when weighted) per line.
pub fn write_edges<D: Destination, W: Write>(edges: &[Edge<D>], writer: &mut W) -> Result<()> {
    for e in edges {
        writeln!(writer, "{} {}", e.u, e.v)?;
    }
    Ok(())
}

/// Writes every outgoing adjacency entry of `g` as a text edge.
pub fn write_graph_edges<D: Destination, W: Write>(g: &CsrGraph<D>, writer: &mut W) -> Result<()> {
    for u in 0..g.num_nodes() as NodeId {
        for d in g.out_neigh(u) {
            writeln!(writer, "{} {}", u, d)?;
        }
    }
    Ok(())
}
