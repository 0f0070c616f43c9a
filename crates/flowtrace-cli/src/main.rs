use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use flowtrace_lib::builder::build_trace_spans;
use flowtrace_lib::export::{export_trace, load_execution};
use flowtrace_lib::renderer::{format_duration, TraceTreeRenderer};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line tools for reconstructing and inspecting workflow traces.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a workflow execution file as an ASCII waterfall
    Render {
        /// Path to an execution file (.json, .yaml, .yml)
        path: PathBuf,
    },
    /// Build a trace from an execution file and write it out
    Export {
        /// Path to an execution file (.json, .yaml, .yml)
        path: PathBuf,
        /// Output path; format chosen by extension (.json, .yaml, .yml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Default export location, overridable via `FLOWTRACE_LOG_PATH`.
fn default_output_path() -> PathBuf {
    std::env::var("FLOWTRACE_LOG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("logs/traces"))
        .join("trace.json")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flowtrace_lib=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Render { path } => {
            let execution = load_execution(&path)
                .with_context(|| format!("Failed to load execution from {path:?}"))?;
            let tree = build_trace_spans(&execution);

            println!("{}", tree.render_as_ascii_tree());
            println!(
                "{} root spans, {} total (Duration: {})",
                tree.spans.len(),
                tree.span_count(),
                format_duration(tree.total_duration_ms)
            );
        }
        Command::Export { path, output } => {
            let execution = load_execution(&path)
                .with_context(|| format!("Failed to load execution from {path:?}"))?;
            let tree = build_trace_spans(&execution);

            let output = output.unwrap_or_else(default_output_path);
            if let Some(parent) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create output directory: {parent:?}"))?;
            }
            export_trace(&tree, &output)
                .with_context(|| format!("Failed to export trace to {output:?}"))?;

            info!(
                spans = tree.span_count(),
                output = %output.display(),
                "Trace exported"
            );
            println!("Wrote {} spans to {}", tree.span_count(), output.display());
        }
    }

    Ok(())
}
