// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use anyhow::{Context, Result};
use clap::Parser;
use octi::input_graph::format::InputFile;
use octi::{InputGraph, LineFilter, OctiRouter, RoutingConfig};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Octilinear schematic routing of a transit network", long_about = None)]
struct Args {
    /// Input graph JSON (stations and line edges).
    input: PathBuf,

    /// Where to write the routed layout JSON.
    #[arg(short, long, default_value = "octi_layout.json")]
    output: PathBuf,

    /// Routing configuration JSON. Flags below override its values.
    #[arg(long, env = "CLOVER_CONFIG")]
    config: Option<PathBuf>,

    /// Search radius in grid cells around each unsettled station.
    #[arg(long, env = "CLOVER_RADIUS")]
    radius: Option<f64>,

    /// Forbid diagonal crossings instead of penalising them.
    #[arg(long)]
    no_crossing: bool,

    /// Abort on the first edge that cannot be routed.
    #[arg(long, env = "CLOVER_STRICT")]
    strict: bool,

    /// Only route these lines (comma-separated).
    #[arg(long, value_delimiter = ',')]
    lines: Option<Vec<String>>,

    /// Never route these lines (comma-separated).
    #[arg(long, value_delimiter = ',')]
    exclude_lines: Option<Vec<String>>,

    /// Pretty-print the output JSON.
    #[arg(long)]
    pretty: bool,
}

fn load_config(args: &Args) -> Result<RoutingConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => RoutingConfig::default(),
    };

    if let Some(radius) = args.radius {
        config.search_radius = Some(radius);
    }
    if args.no_crossing {
        config.allow_crossing = false;
    }
    if args.strict {
        config.strict = true;
    }
    if let Some(lines) = &args.lines {
        config.line_filter.include = lines.clone();
    }
    if let Some(lines) = &args.exclude_lines {
        config.line_filter.exclude = lines.clone();
    }

    Ok(config)
}

fn load_graph(path: &Path, filter: &LineFilter) -> Result<InputGraph> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input graph {}", path.display()))?;
    let file: InputFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse input graph {}", path.display()))?;

    let mut graph = InputGraph::from_file_format(&file)
        .with_context(|| format!("Invalid input graph {}", path.display()))?;

    if !filter.is_empty() {
        let dropped = graph.retain_lines(filter.predicate());
        println!("Line filter dropped {} edges.", dropped);
    }

    Ok(graph)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = load_config(&args)?;

    println!("Loading input graph from {}...", args.input.display());
    let graph = load_graph(&args.input, &config.line_filter)?;
    println!(
        "Loaded {} stations and {} edges.",
        graph.station_count(),
        graph.edge_count()
    );

    let start = std::time::Instant::now();
    let run = OctiRouter::new(config).route(graph)?;
    let layout = run.layout();
    println!(
        "Routed {} edges on a {}x{} grid in {:?} ({} unrouted).",
        layout.paths.len(),
        layout.width,
        layout.height,
        start.elapsed(),
        layout.unrouted.len()
    );
    for edge in &layout.unrouted {
        println!("  unrouted: {} -> {} {:?}", edge.from, edge.to, edge.lines);
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&layout)?
    } else {
        serde_json::to_string(&layout)?
    };
    fs::write(&args.output, json)
        .with_context(|| format!("Failed to write layout to {}", args.output.display()))?;
    println!("Wrote layout to {}.", args.output.display());

    Ok(())
}
