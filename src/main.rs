//! bindery - book composition CLI

use std::fs;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use bindery::render::ChromiumEngine;
use bindery::{BookSource, ComposeOptions, compose};

#[derive(Parser)]
#[command(name = "bindery")]
#[command(version, about = "Compose a book source into a paginated PDF", long_about = None)]
#[command(after_help = "EXAMPLES:
    bindery book.json book.pdf          Compose with default limits
    bindery book.json book.pdf -t 60    Allow 60s per render call")]
struct Cli {
    /// Book source JSON (content tree, templates, stylesheet)
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output PDF path
    #[arg(value_name = "OUTPUT")]
    output: String,

    /// Per-render-call timeout in seconds
    #[arg(short = 't', long, default_value_t = 30)]
    timeout: u64,

    /// Total wall-clock budget in seconds
    #[arg(short = 'b', long, default_value_t = 180)]
    budget: u64,

    /// Suppress the summary line
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let raw = fs::read_to_string(&cli.input).map_err(|e| e.to_string())?;
    let source: BookSource = serde_json::from_str(&raw).map_err(|e| e.to_string())?;

    let engine = ChromiumEngine::launch().map_err(|e| e.to_string())?;
    let options = ComposeOptions {
        render_timeout: Duration::from_secs(cli.timeout),
        total_budget: Duration::from_secs(cli.budget),
    };
    let book = compose(&engine, &source, &options).map_err(|e| e.to_string())?;

    fs::write(&cli.output, &book.bytes).map_err(|e| e.to_string())?;

    if !cli.quiet {
        println!(
            "{}: {} pages (cover {}, front {}, toc {})",
            cli.output, book.counts.total, book.counts.cover, book.counts.front, book.counts.toc
        );
        if !book.toc_converged {
            println!("warning: toc page numbers are best-effort (no fixed point reached)");
        }
        if !book.unresolved_anchors.is_empty() {
            println!(
                "warning: unresolved chapter anchors: {}",
                book.unresolved_anchors.join(", ")
            );
        }
    }
    Ok(())
}
