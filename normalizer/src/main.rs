use clap::Parser;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use npgn::interchange::fingerprint;
use npgn::pass::descriptor;
use npgn::{NormalizeOptions, PassId, PassStats, PortGraph, StructuralValidator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Emit {
    /// Normalized graph as pretty JSON
    Json,
    /// Graphviz rendering of the normalized graph
    Dot,
    /// SHA-256 of the canonical JSON encoding
    Fingerprint,
    /// Per-pass change counts and timing
    Stats,
}

#[derive(Parser, Debug)]
#[command(
    name = "npgn",
    version,
    about = "Network port graph normalizer — rewrites fan-out/fan-in, pass-through edges and unused ports into canonical form"
)]
struct Cli {
    /// Input graph (JSON); `-` reads stdin
    input: PathBuf,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Emit::Json)]
    emit: Emit,

    /// JSON options document (createDuplicatesAndJoins, createIdNodes, addConsumeNodes)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Skip fan resolution
    #[arg(long)]
    no_duplicates_and_joins: bool,

    /// Skip identity bridges for pass-through edges
    #[arg(long)]
    no_id_nodes: bool,

    /// Skip sinks for unconsumed ports
    #[arg(long)]
    no_consume_nodes: bool,

    /// Log pass details to stderr
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "npgn=debug" } else { "npgn=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // ── Options ──
    let mut options = match &cli.options {
        Some(path) => {
            let text = read_or_exit(path);
            match serde_json::from_str::<NormalizeOptions>(&text) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("npgn: error: {}: {}", path.display(), e);
                    std::process::exit(2);
                }
            }
        }
        None => NormalizeOptions::default(),
    };
    options.create_duplicates_and_joins &= !cli.no_duplicates_and_joins;
    options.create_id_nodes &= !cli.no_id_nodes;
    options.add_consume_nodes &= !cli.no_consume_nodes;

    // ── Read input ──
    let text = read_or_exit(&cli.input);
    let graph = match PortGraph::from_json_str(&text) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("npgn: error: {}: {}", cli.input.display(), e);
            std::process::exit(2);
        }
    };
    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph loaded"
    );

    // ── Normalize ──
    let mut timings: Vec<(PassId, PassStats, Duration)> = Vec::new();
    let normalized = match npgn::normalize_with(
        &graph,
        &options,
        &StructuralValidator,
        |pass, stats, elapsed| timings.push((pass, *stats, elapsed)),
    ) {
        Ok(g) => g,
        Err(err) => {
            eprintln!("npgn: {}", err);
            std::process::exit(1);
        }
    };

    // ── Emit ──
    let rendered = match cli.emit {
        Emit::Json => normalized.to_json_pretty().map(|s| s + "\n"),
        Emit::Dot => Ok(npgn::dot::emit_dot(&normalized)),
        Emit::Fingerprint => fingerprint(&normalized).map(|s| s + "\n"),
        Emit::Stats => Ok(render_stats(&normalized, &timings)),
    };
    let rendered = match rendered {
        Ok(s) => s,
        Err(e) => {
            eprintln!("npgn: error: cannot encode output: {}", e);
            std::process::exit(2);
        }
    };

    let written = match &cli.output {
        Some(path) => std::fs::write(path, rendered.as_bytes()),
        None => std::io::stdout().write_all(rendered.as_bytes()),
    };
    if let Err(e) = written {
        eprintln!("npgn: error: cannot write output: {}", e);
        std::process::exit(2);
    }
}

fn read_or_exit(path: &Path) -> String {
    let result = if path.as_os_str() == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s).map(|_| s)
    } else {
        std::fs::read_to_string(path)
    };
    match result {
        Ok(s) => s,
        Err(e) => {
            eprintln!("npgn: error: {}: {}", path.display(), e);
            std::process::exit(2);
        }
    }
}

fn render_stats(graph: &PortGraph, timings: &[(PassId, PassStats, Duration)]) -> String {
    let mut out = String::new();
    for (pass, stats, elapsed) in timings {
        out.push_str(&format!(
            "{:<20} +{} nodes  -{} edges  +{} edges  {:.3} ms\n",
            descriptor(*pass).name,
            stats.nodes_added,
            stats.edges_removed,
            stats.edges_added,
            elapsed.as_secs_f64() * 1000.0
        ));
    }
    out.push_str(&format!(
        "result: {} nodes, {} edges\n",
        graph.node_count(),
        graph.edge_count()
    ));
    out
}
