//! Graph file readers.
//!
//! # Galois `.gr` binary
//!
//! Little-endian, 8-byte aligned:
//!
//! ```text
//! u64 version            1 (u32 destinations) or 2 (u64 destinations)
//! u64 edge_data_size     ignored; edge payloads are not used
//! u64 num_nodes
//! u64 num_edges
//! u64 out_end[num_nodes] cumulative out-edge end offsets
//! dst[num_edges]         u32 (v1, padded to 8 bytes) or u64 (v2)
//! edge data              ignored
//! ```
//!
//! # Text edge list
//!
//! One `src dst` pair per line; further columns (weights) are ignored.
//! Blank lines and lines starting with `#` or `%` are skipped. The node
//! count is one past the largest id seen.

use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::GraphError;
use crate::graph::csr::{CsrGraph, NodeId};

const GR_HEADER_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphFormat {
    /// `.gr` extension selects the binary reader, anything else the edge list.
    #[default]
    Auto,
    Gr,
    EdgeList,
}

impl GraphFormat {
    #[must_use]
    pub fn resolve(self, path: &Path) -> Self {
        match self {
            Self::Auto => {
                if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gr")) {
                    Self::Gr
                } else {
                    Self::EdgeList
                }
            }
            other => other,
        }
    }
}

/// Read a graph from `path`, optionally adding missing reverse edges.
///
/// # Errors
///
/// Returns [`GraphError::Io`] if the file cannot be read, or a format error
/// if its contents do not parse as the resolved format.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_graph(path: &Path, format: GraphFormat, symmetrize: bool) -> Result<CsrGraph, GraphError> {
    let io_err = |source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    };

    let resolved = format.resolve(path);
    let graph = match resolved {
        GraphFormat::Gr => parse_gr(&std::fs::read(path).map_err(io_err)?)?,
        GraphFormat::EdgeList | GraphFormat::Auto => {
            parse_edge_list(&std::fs::read_to_string(path).map_err(io_err)?)?
        }
    };

    debug!(
        format = ?resolved,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph parsed"
    );

    Ok(if symmetrize {
        graph.symmetrized()
    } else {
        graph
    })
}

/// Parse a Galois `.gr` image.
///
/// # Errors
///
/// Returns a format error for an unknown version, a truncated image,
/// non-monotone offsets, or destinations outside the node range.
pub fn parse_gr(bytes: &[u8]) -> Result<CsrGraph, GraphError> {
    let actual = bytes.len() as u64;
    let truncated = |expected: u64| GraphError::Truncated { expected, actual };

    if bytes.len() < GR_HEADER_BYTES {
        return Err(truncated(GR_HEADER_BYTES as u64));
    }

    let version = read_u64(bytes, 0);
    let num_nodes = read_u64(bytes, 8 * 2);
    let num_edges = read_u64(bytes, 8 * 3);

    let dst_width: u64 = match version {
        1 => 4,
        2 => 8,
        other => return Err(GraphError::UnsupportedVersion(other)),
    };

    let node_count = NodeId::try_from(num_nodes).map_err(|_| GraphError::TooManyNodes(num_nodes))?;

    let offsets_bytes = num_nodes.saturating_mul(8);
    let dst_bytes = num_edges.saturating_mul(dst_width);
    let expected = (GR_HEADER_BYTES as u64)
        .saturating_add(offsets_bytes)
        .saturating_add(dst_bytes);
    if actual < expected {
        return Err(truncated(expected));
    }

    // In range of `bytes.len()` from here on.
    let n = num_nodes as usize;
    let m = num_edges as usize;
    let dst_base = GR_HEADER_BYTES + n * 8;

    let mut edges = Vec::with_capacity(m);
    let mut begin = 0_u64;
    for v in 0..n {
        let end = read_u64(bytes, GR_HEADER_BYTES + v * 8);
        if end < begin || end > num_edges {
            return Err(GraphError::NonMonotoneOffsets { node: v as u64 });
        }
        for e in begin..end {
            let e = e as usize;
            let dst = if dst_width == 4 {
                u64::from(read_u32(bytes, dst_base + e * 4))
            } else {
                read_u64(bytes, dst_base + e * 8)
            };
            if dst >= num_nodes {
                return Err(GraphError::EndpointOutOfRange {
                    src: v as u64,
                    dst,
                    node_count: num_nodes,
                });
            }
            edges.push((v as NodeId, dst as NodeId));
        }
        begin = end;
    }

    if begin != num_edges {
        return Err(GraphError::NonMonotoneOffsets {
            node: num_nodes.saturating_sub(1),
        });
    }

    Ok(CsrGraph::build(node_count, &edges))
}

/// Parse a whitespace-separated text edge list.
///
/// # Errors
///
/// Returns [`GraphError::BadEdgeLine`] for a line without two unsigned ids,
/// or [`GraphError::TooManyNodes`] if an id does not fit a [`NodeId`].
pub fn parse_edge_list(text: &str) -> Result<CsrGraph, GraphError> {
    let mut edges = Vec::new();
    let mut max_id: Option<u64> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('%') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let mut next_id = |what: &str| -> Result<u64, GraphError> {
            let field = fields.next().ok_or_else(|| GraphError::BadEdgeLine {
                line: idx + 1,
                reason: format!("missing {what} id"),
            })?;
            field.parse::<u64>().map_err(|_| GraphError::BadEdgeLine {
                line: idx + 1,
                reason: format!("{what} id {field:?} is not an unsigned integer"),
            })
        };
        let src = next_id("source")?;
        let dst = next_id("destination")?;

        let hi = src.max(dst);
        if hi >= u64::from(NodeId::MAX) {
            return Err(GraphError::TooManyNodes(hi.saturating_add(1)));
        }
        max_id = Some(max_id.map_or(hi, |m| m.max(hi)));
        edges.push((src as NodeId, dst as NodeId));
    }

    let node_count = max_id.map_or(0, |m| m as NodeId + 1);
    Ok(CsrGraph::build(node_count, &edges))
}

/// Write `graph` as a version 1 `.gr` image with no edge data.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn write_gr(graph: &CsrGraph, mut out: impl Write) -> io::Result<()> {
    let n = graph.node_count() as u64;
    let m = graph.edge_count() as u64;
    for word in [1_u64, 0, n, m] {
        out.write_all(&word.to_le_bytes())?;
    }
    for v in graph.nodes() {
        let end = graph.outgoing_edges(v).end as u64;
        out.write_all(&end.to_le_bytes())?;
    }
    for (_, dst) in graph.edges() {
        out.write_all(&dst.to_le_bytes())?;
    }
    if m % 2 == 1 {
        out.write_all(&[0_u8; 4])?;
    }
    Ok(())
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut word = [0_u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(word)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0_u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(word)
}
