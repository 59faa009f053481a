#![forbid(unsafe_code)]

mod output;

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use asyncbc_centrality::reference;
use asyncbc_centrality::report::PREVIEW_LEN;
use asyncbc_centrality::{
    BetweennessEngine, CentralityError, CentralityScores, EngineOptions, RunSummary, SourceRange,
};
use asyncbc_core::config::{EngineConfig, resolve_config};
use asyncbc_core::error::{ConfigError, ErrorCode, GraphError, PoolError};
use asyncbc_core::graph::{GraphFormat, GraphStats, NodeId, load_graph};
use asyncbc_core::timing;
use asyncbc_core::worklist::WorklistOrder;
use clap::{Parser, ValueEnum};
use output::{CliError, OutputMode, pretty_kv};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Relative tolerance for `--verify`.
const VERIFY_TOLERANCE: f64 = 1e-6;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "asyncbc: asynchronous multi-source betweenness centrality",
    long_about = None,
    after_help = "EXAMPLES:\n    # All sources, default thread count\n    asyncbc web.gr\n\n    # 64 sources from node 1000 on 8 threads, write certificate_8.txt\n    asyncbc web.gr --start-node 1000 --num-sources 64 -t 8 --generate-certificate\n\n    # Undirected text edge list, checked against sequential Brandes\n    asyncbc edges.txt --symmetrize --verify"
)]
struct Cli {
    /// Graph file: Galois `.gr` binary or a whitespace-separated edge list.
    #[arg(value_name = "GRAPH_FILE")]
    graph: PathBuf,

    /// First source node.
    #[arg(long, default_value_t = 0)]
    start_node: NodeId,

    /// Number of sources from --start-node; 0 runs through the last node.
    #[arg(long, default_value_t = 0)]
    num_sources: usize,

    /// Write one `<id> <bc>` line per node to a certificate file.
    #[arg(long)]
    generate_certificate: bool,

    /// Certificate path (default: certificate_<threads>.txt).
    #[arg(long, value_name = "PATH")]
    certificate_path: Option<PathBuf>,

    /// Worker threads (overrides config and ASYNCBC_THREADS).
    #[arg(short, long)]
    threads: Option<usize>,

    /// Worklist pop order.
    #[arg(long, value_enum)]
    order: Option<OrderArg>,

    /// Count how often each edge rule fired.
    #[arg(long)]
    count_actions: bool,

    /// Check successor counts after every backward pass.
    #[arg(long)]
    check: bool,

    /// Recompute with sequential Brandes and fail on any difference.
    #[arg(long)]
    verify: bool,

    /// Add the reverse of every edge before running.
    #[arg(long)]
    symmetrize: bool,

    /// Graph file format.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Config file (default: ./asyncbc.toml if present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Do not print the score preview.
    #[arg(long)]
    skip_verify: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long)]
    json: bool,

    /// Emit phase timing report.
    #[arg(long)]
    timing: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OrderArg {
    Fifo,
    Lifo,
}

impl From<OrderArg> for WorklistOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Fifo => Self::Fifo,
            OrderArg::Lifo => Self::Lifo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Auto,
    Gr,
    EdgeList,
}

impl From<FormatArg> for GraphFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => Self::Auto,
            FormatArg::Gr => Self::Gr,
            FormatArg::EdgeList => Self::EdgeList,
        }
    }
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        OutputMode::from_json_flag(self.json)
    }

    /// Layer command-line flags over the resolved config.
    fn apply_overrides(&self, config: &mut EngineConfig) {
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(order) = self.order {
            config.worklist_order = order.into();
        }
        if let Some(format) = self.format {
            config.graph.format = format.into();
        }
        config.count_actions |= self.count_actions;
        config.check_consistency |= self.check;
        config.graph.symmetrize |= self.symmetrize;
    }

    fn source_range(&self) -> SourceRange {
        SourceRange {
            start: self.start_node,
            count: self.num_sources,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error(
    "async result differs from sequential Brandes: max relative difference {max_difference:e} exceeds {tolerance:e}"
)]
struct VerificationFailed {
    max_difference: f64,
    tolerance: f64,
}

#[derive(Debug, Serialize)]
struct PreviewEntry {
    node: usize,
    bc: f64,
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    max_relative_difference: f64,
    tolerance: f64,
}

#[derive(Debug, Serialize)]
struct RunReport {
    graph_file: PathBuf,
    graph: GraphStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<PathBuf>,
    threads: usize,
    order: WorklistOrder,
    summary: RunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<Vec<PreviewEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verify: Option<VerifyReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    certificate: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timing: Option<timing::TimingReport>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ASYNCBC_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "asyncbc=debug,info"
        } else {
            "asyncbc=info,warn"
        })
    });

    let format = env::var("ASYNCBC_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // Logs go to stderr so stdout stays parseable.
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Map an error chain to its machine-readable code.
fn error_code(err: &anyhow::Error) -> ErrorCode {
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        e.code()
    } else if let Some(e) = err.downcast_ref::<GraphError>() {
        e.code()
    } else if let Some(e) = err.downcast_ref::<CentralityError>() {
        e.code()
    } else if let Some(e) = err.downcast_ref::<PoolError>() {
        e.code()
    } else if err.downcast_ref::<VerificationFailed>().is_some() {
        ErrorCode::VerificationMismatch
    } else {
        ErrorCode::InternalUnexpected
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let timing_enabled = cli.timing || timing::timing_enabled_from_env();
    timing::set_timing_enabled(timing_enabled);
    timing::clear_timings();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    if let Err(err) = run(&cli, output, timing_enabled) {
        let code = error_code(&err);
        output::render_error(output, &CliError::new(code, format!("{err:#}")))?;
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: &Cli, output: OutputMode, timing_enabled: bool) -> anyhow::Result<()> {
    let cwd = env::current_dir()?;
    let resolved = resolve_config(cli.config.as_deref(), &cwd)?;
    let mut config = resolved.config;
    cli.apply_overrides(&mut config);
    config.validate()?;

    info!(
        threads = config.threads,
        order = %config.worklist_order,
        "concurrency mode: asynchronous worklist"
    );

    let graph = timing::timed("load", || {
        load_graph(&cli.graph, config.graph.format, config.graph.symmetrize)
    })
    .with_context(|| format!("loading graph {}", cli.graph.display()))?;

    let stats = GraphStats::from_graph(&graph);
    info!(
        nodes = stats.node_count,
        edges = stats.edge_count,
        sinks = stats.sinks,
        fingerprint = %stats.fingerprint,
        "graph loaded"
    );

    let range = cli.source_range();
    let sources = range.resolve(graph.node_count())?;
    info!(start = sources.start, end = sources.end, "source range");

    let options = EngineOptions::from(&config);
    let mut engine = BetweennessEngine::new(&graph, options)?;
    let summary = engine.run(range)?;
    let scores = engine.scores();

    let verify = if cli.verify {
        let expected = timing::timed("verify", || reference::brandes(&graph, sources.clone()));
        let max_difference = scores.max_relative_difference(&expected);
        if max_difference > VERIFY_TOLERANCE {
            return Err(VerificationFailed {
                max_difference,
                tolerance: VERIFY_TOLERANCE,
            }
            .into());
        }
        info!(max_difference, "verified against sequential Brandes");
        Some(VerifyReport {
            max_relative_difference: max_difference,
            tolerance: VERIFY_TOLERANCE,
        })
    } else {
        None
    };

    let certificate = write_certificate(cli, &scores, config.threads, &cwd)?;

    let timing_report = timing_enabled.then(timing::collect_report);

    let report = RunReport {
        graph_file: cli.graph.clone(),
        graph: stats,
        config_file: resolved.source,
        threads: config.threads,
        order: config.worklist_order,
        summary,
        preview: (!cli.skip_verify).then(|| preview_entries(&scores)),
        verify,
        certificate,
        timing: timing_report.clone().filter(|_| output.is_json()),
    };

    output::render(output, &report, |report, w| {
        if let Some(preview) = &report.preview {
            for entry in preview {
                writeln!(w, "{}: {:.6}", entry.node, entry.bc)?;
            }
        }
        if let Some(counters) = &report.summary.counters {
            writeln!(w)?;
            write!(w, "{counters}")?;
        }
        if let Some(verify) = &report.verify {
            pretty_kv(
                w,
                "verified",
                format!("max relative difference {:e}", verify.max_relative_difference),
            )?;
        }
        if let Some(path) = &report.certificate {
            pretty_kv(w, "certificate", path.display().to_string())?;
        }
        Ok(())
    })?;

    if let Some(report) = timing_report.filter(|_| !output.is_json()) {
        if report.is_empty() {
            eprintln!("timing report: no samples recorded");
        } else {
            eprintln!("timing report:");
            eprintln!("{}", report.display_table());
        }
    }

    Ok(())
}

fn preview_entries(scores: &CentralityScores) -> Vec<PreviewEntry> {
    scores
        .as_slice()
        .iter()
        .take(PREVIEW_LEN)
        .enumerate()
        .map(|(node, &bc)| PreviewEntry { node, bc })
        .collect()
}

fn write_certificate(
    cli: &Cli,
    scores: &CentralityScores,
    threads: usize,
    cwd: &Path,
) -> anyhow::Result<Option<PathBuf>> {
    if !cli.generate_certificate {
        if let Some(path) = &cli.certificate_path {
            warn!(
                path = %path.display(),
                "--certificate-path ignored without --generate-certificate"
            );
        }
        return Ok(None);
    }

    let path = cli
        .certificate_path
        .clone()
        .unwrap_or_else(|| cwd.join(CentralityScores::certificate_file_name(threads)));
    timing::timed("certificate", || scores.write_certificate(&path))
        .with_context(|| format!("writing certificate {}", path.display()))?;
    info!(path = %path.display(), nodes = scores.len(), "certificate written");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_every_source() {
        let cli = Cli::parse_from(["asyncbc", "graph.gr"]);
        assert_eq!(cli.source_range(), SourceRange::all());
        assert!(!cli.generate_certificate);
        assert!(!cli.output_mode().is_json());
    }

    #[test]
    fn range_flags_parse() {
        let cli = Cli::parse_from([
            "asyncbc",
            "graph.gr",
            "--start-node=3",
            "--num-sources",
            "7",
        ]);
        assert_eq!(
            cli.source_range(),
            SourceRange {
                start: 3,
                count: 7
            }
        );
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "asyncbc",
            "edges.txt",
            "-t",
            "3",
            "--order",
            "lifo",
            "--format",
            "edge-list",
            "--symmetrize",
            "--check",
        ]);
        let mut config = EngineConfig {
            threads: 16,
            ..EngineConfig::default()
        };
        cli.apply_overrides(&mut config);
        assert_eq!(config.threads, 3);
        assert_eq!(config.worklist_order, WorklistOrder::Lifo);
        assert_eq!(config.graph.format, GraphFormat::EdgeList);
        assert!(config.graph.symmetrize);
        assert!(config.check_consistency);
        assert!(!config.count_actions);
    }

    #[test]
    fn unset_flags_keep_config_values() {
        let cli = Cli::parse_from(["asyncbc", "g.gr"]);
        let mut config = EngineConfig {
            threads: 5,
            count_actions: true,
            worklist_order: WorklistOrder::Lifo,
            ..EngineConfig::default()
        };
        cli.apply_overrides(&mut config);
        assert_eq!(config.threads, 5);
        assert!(config.count_actions);
        assert_eq!(config.worklist_order, WorklistOrder::Lifo);
    }

    #[test]
    fn error_codes_follow_the_chain() {
        let err = anyhow::Error::new(GraphError::UnsupportedVersion(3)).context("loading graph");
        assert_eq!(error_code(&err), ErrorCode::GraphFormatError);

        let err = anyhow::Error::new(CentralityError::SourceOutOfRange {
            start: 4,
            node_count: 2,
        });
        assert_eq!(error_code(&err), ErrorCode::SourceOutOfRange);

        let err = anyhow::anyhow!("something else");
        assert_eq!(error_code(&err), ErrorCode::InternalUnexpected);
    }
}
