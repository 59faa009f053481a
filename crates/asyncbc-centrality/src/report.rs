//! Score output: terminal preview, certificate files, comparisons.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

/// Number of nodes shown by the default preview.
pub const PREVIEW_LEN: usize = 10;

/// Final betweenness score of every node, indexed by node id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CentralityScores {
    scores: Vec<f64>,
}

impl CentralityScores {
    #[must_use]
    pub const fn new(scores: Vec<f64>) -> Self {
        Self { scores }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }

    #[must_use]
    pub fn get(&self, node: u32) -> Option<f64> {
        self.scores.get(node as usize).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.scores
    }

    /// First `limit` scores as `<id>: <bc>` lines, six decimals.
    #[must_use]
    pub fn preview(&self, limit: usize) -> String {
        let mut out = String::new();
        for (id, bc) in self.scores.iter().take(limit).enumerate() {
            let _ = writeln!(out, "{id}: {bc:.6}");
        }
        out
    }

    /// Default certificate name for a run on `threads` workers.
    #[must_use]
    pub fn certificate_file_name(threads: usize) -> String {
        format!("certificate_{threads}.txt")
    }

    /// One `<id> <bc>` line per node, nine decimals.
    ///
    /// # Errors
    ///
    /// Propagates write failures from `out`.
    pub fn write_certificate_to(&self, mut out: impl Write) -> io::Result<()> {
        for (id, bc) in self.scores.iter().enumerate() {
            writeln!(out, "{id} {bc:.9}")?;
        }
        out.flush()
    }

    /// # Errors
    ///
    /// Returns any error creating or writing `path`.
    pub fn write_certificate(&self, path: &Path) -> io::Result<()> {
        self.write_certificate_to(BufWriter::new(File::create(path)?))
    }

    /// Largest `|a - b| / max(1, |a|, |b|)` over all nodes: relative for large
    /// scores, absolute near zero. Length mismatch compares as infinite.
    #[must_use]
    pub fn max_relative_difference(&self, other: &Self) -> f64 {
        if self.scores.len() != other.scores.len() {
            return f64::INFINITY;
        }
        self.scores
            .iter()
            .zip(&other.scores)
            .map(|(a, b)| (a - b).abs() / a.abs().max(b.abs()).max(1.0))
            .fold(0.0, f64::max)
    }
}
