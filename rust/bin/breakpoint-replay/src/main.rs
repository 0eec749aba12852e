//! Replay a recorded resize trace against a breakpoint manifest.
//!
//! Usage:
//!   breakpoint-replay --manifest breakpoints.json --trace resizes.txt
//!
//! Trace lines are `WIDTHxHEIGHT` or `WIDTH HEIGHT`; blank lines and `#`
//! comments are skipped. Each transition is printed as one JSON line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;

use openerp_breakpoint::{Breakpoints, Manifest, MemoryClassList, MemoryViewport, TickReport};

#[derive(Parser, Debug)]
#[command(name = "breakpoint-replay", about = "Replay viewport resizes against breakpoint watch sets")]
struct Args {
    /// JSON manifest with `config` and `watches`.
    #[arg(long)]
    manifest: PathBuf,

    /// Resize trace, one size per line.
    #[arg(long)]
    trace: PathBuf,

    /// Viewport size before the first trace line.
    #[arg(long, default_value = "1024x768")]
    initial: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let raw = std::fs::read(&args.manifest)
        .with_context(|| format!("reading manifest {}", args.manifest.display()))?;
    let manifest = Manifest::from_slice(&raw).context("parsing manifest")?;

    let trace = std::fs::read_to_string(&args.trace)
        .with_context(|| format!("reading trace {}", args.trace.display()))?;
    let sizes = parse_trace(&trace)?;

    let (width, height) = parse_size(&args.initial).context("parsing --initial")?;
    let viewport = Arc::new(MemoryViewport::new(width, height));
    let classes = Arc::new(MemoryClassList::new());
    let bp = Breakpoints::new(viewport.clone())
        .with_class_list(classes.clone())
        .with_config(manifest.config.clone());

    let sets = bp.load(manifest)?;
    info!("Registered {} watch sets", sets.len());

    print_report(&bp.run_pending()?)?;
    for (width, height) in &sizes {
        viewport.resize(*width, *height);
        bp.notify_resize();
        print_report(&bp.run_pending()?)?;
    }
    info!("Replayed {} resizes", sizes.len());

    for selector in classes.selectors() {
        println!(
            "{}",
            serde_json::json!({ "selector": selector, "classes": classes.classes(&selector) })
        );
    }
    Ok(())
}

fn print_report(report: &TickReport) -> anyhow::Result<()> {
    for t in &report.transitions {
        println!("{}", serde_json::to_string(t)?);
    }
    for e in &report.failures {
        tracing::warn!("{e}");
    }
    Ok(())
}

/// Parse every non-blank, non-comment line of a trace.
fn parse_trace(input: &str) -> anyhow::Result<Vec<(f64, f64)>> {
    input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| parse_size(line).with_context(|| format!("trace line {n}")))
        .collect()
}

/// `1024x768`, `1024X768` or `1024 768`.
fn parse_size(s: &str) -> anyhow::Result<(f64, f64)> {
    let parts: Vec<&str> = s
        .split(|c: char| c == 'x' || c == 'X' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    let [w, h] = parts.as_slice() else {
        bail!("expected WIDTHxHEIGHT, got '{s}'");
    };
    let width: f64 = w.parse().with_context(|| format!("bad width '{w}'"))?;
    let height: f64 = h.parse().with_context(|| format!("bad height '{h}'"))?;
    Ok((width, height))
}
