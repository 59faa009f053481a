use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes surfaced by the CLI and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidThreadCount,
    GraphIoError,
    GraphFormatError,
    GraphTooLarge,
    SourceOutOfRange,
    ThreadPoolUnavailable,
    InconsistentState,
    VerificationMismatch,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidThreadCount => "E1002",
            Self::GraphIoError => "E2001",
            Self::GraphFormatError => "E2002",
            Self::GraphTooLarge => "E2003",
            Self::SourceOutOfRange => "E3001",
            Self::ThreadPoolUnavailable => "E4001",
            Self::InconsistentState => "E5001",
            Self::VerificationMismatch => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidThreadCount => "Invalid worker thread count",
            Self::GraphIoError => "Graph file could not be read",
            Self::GraphFormatError => "Malformed graph file",
            Self::GraphTooLarge => "Graph exceeds supported node id range",
            Self::SourceOutOfRange => "Source node out of range",
            Self::ThreadPoolUnavailable => "Worker pool could not be started",
            Self::InconsistentState => "Engine state inconsistent after backward pass",
            Self::VerificationMismatch => "Result differs from sequential reference",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in asyncbc.toml and retry."),
            Self::InvalidThreadCount => Some("Use --threads with a value of at least 1."),
            Self::GraphIoError => Some("Check the graph path and read permissions."),
            Self::GraphFormatError => {
                Some("Pass --format gr or --format edge-list if auto-detection picked wrong.")
            }
            Self::GraphTooLarge => Some("Node ids must fit in 32 bits."),
            Self::SourceOutOfRange => {
                Some("Choose --start-node and --num-sources within the graph's node count.")
            }
            Self::ThreadPoolUnavailable => Some("Lower --threads or check process limits."),
            Self::InconsistentState | Self::VerificationMismatch => {
                Some("This is an engine bug. Re-run with --threads 1 and report the input graph.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while reading or building a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("failed to read graph file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported .gr version {0}: expected 1 or 2")]
    UnsupportedVersion(u64),

    #[error(".gr file truncated: need {expected} bytes, file has {actual}")]
    Truncated { expected: u64, actual: u64 },

    #[error(".gr out-edge offsets are not monotone at node {node}")]
    NonMonotoneOffsets { node: u64 },

    #[error("edge list line {line}: {reason}")]
    BadEdgeLine { line: usize, reason: String },

    #[error("edge {src} -> {dst} references a node outside 0..{node_count}")]
    EndpointOutOfRange { src: u64, dst: u64, node_count: u64 },

    #[error("graph has {0} nodes; node ids must fit in u32")]
    TooManyNodes(u64),
}

impl GraphError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::GraphIoError,
            Self::TooManyNodes(_) => ErrorCode::GraphTooLarge,
            Self::UnsupportedVersion(_)
            | Self::Truncated { .. }
            | Self::NonMonotoneOffsets { .. }
            | Self::BadEdgeLine { .. }
            | Self::EndpointOutOfRange { .. } => ErrorCode::GraphFormatError,
        }
    }
}

/// Errors raised while loading engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("worker thread count must be at least 1")]
    ZeroThreads,

    #[error("invalid {var} value {value:?}: expected a positive integer")]
    BadEnv { var: &'static str, value: String },
}

impl ConfigError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } | Self::Parse { .. } => ErrorCode::ConfigParseError,
            Self::ZeroThreads | Self::BadEnv { .. } => ErrorCode::InvalidThreadCount,
        }
    }
}

/// Errors raised while starting the worker pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("worker pool needs at least one thread")]
    ZeroThreads,

    #[error("failed to build bulk thread pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

impl PoolError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ZeroThreads => ErrorCode::InvalidThreadCount,
            Self::Build(_) => ErrorCode::ThreadPoolUnavailable,
        }
    }
}
