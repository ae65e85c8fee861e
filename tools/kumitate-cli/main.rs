use clap::Parser;
use kumitate::prelude::*;
use std::fs;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Generates script source from a saved node graph
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the command library JSON file (an array of command schemas)
    library_path: String,
    /// Path to the graph snapshot JSON file
    graph_path: String,

    /// Write the generated source to this file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Number of spaces per indentation level
    #[arg(long, default_value_t = 4)]
    indent: usize,

    /// Fail with a non-zero exit code on flow or connection cycles
    #[arg(long)]
    strict: bool,

    /// Recompute cached results of evaluate nodes before generating
    #[arg(long)]
    refresh: bool,
}

/// Initialize logging. `RUST_LOG` overrides the default filter.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,kumitate=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let total_start = Instant::now();

    // --- 1. File Loading ---
    let library_json = fs::read_to_string(&cli.library_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read command library '{}': {}",
            &cli.library_path, e
        ))
    });
    let graph_json = fs::read_to_string(&cli.graph_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read graph snapshot '{}': {}",
            &cli.graph_path, e
        ))
    });

    // --- 2. Parsing ---
    let library = CommandLibrary::from_json(&library_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load command library: {}", e)));
    let mut graph = Graph::from_json(&graph_json, &library)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load graph: {}", e)));
    info!(
        commands = library.len(),
        nodes = graph.nodes.len(),
        connections = graph.connections.len(),
        "loaded graph"
    );

    // --- 3. Evaluation ---
    let limits = ScriptLimits::default();
    if cli.refresh {
        for failure in refresh_evaluations(&mut graph, &limits) {
            warn!(
                node = %failure.node_id,
                key = %failure.key,
                error = %failure.error,
                "embedded code evaluation failed"
            );
        }
    }

    // --- 4. Generation ---
    let generator = CodeGenerator::builder(&graph)
        .with_indent(&" ".repeat(cli.indent))
        .with_limits(limits)
        .build();
    let source = if cli.strict {
        generator
            .try_generate()
            .unwrap_or_else(|e| exit_with_error(&format!("Generation failed: {}", e)))
    } else {
        generator.generate()
    };

    // --- 5. Output ---
    match &cli.output {
        Some(path) => {
            fs::write(path, format!("{}\n", source)).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to write output '{}': {}", path, e))
            });
            info!(path = %path, elapsed = ?total_start.elapsed(), "wrote generated source");
        }
        None => {
            println!("{}", source);
            info!(elapsed = ?total_start.elapsed(), "generation finished");
        }
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
