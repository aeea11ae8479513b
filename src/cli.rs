use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cohort::config::load_config;
use crate::cohort::grid::GridMode;
use crate::commands::{self, CommandReport};
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "cohort-lens",
    version,
    about = "Cohort retention, chart series, and purchase velocity from cohort exports"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clean and sort an export into the canonical CSV.
    Ingest {
        #[arg(long, short)]
        input: PathBuf,
        /// Write the canonical CSV here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List the page paths in an export.
    Paths {
        #[arg(long, short)]
        input: PathBuf,
    },
    /// Cohort retention grid for one path.
    Grid {
        #[arg(long, short)]
        input: PathBuf,
        /// Defaults to the site-wide path when the export has one.
        #[arg(long, short)]
        path: Option<String>,
        #[arg(long, value_enum, default_value_t = GridMode::Cumulative)]
        mode: GridMode,
    },
    /// Cumulative and incremental chart series for one path, as JSON.
    Chart {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long, short)]
        path: Option<String>,
    },
    /// Calendar-month velocity and path ranking.
    Velocity {
        #[arg(long, short)]
        input: PathBuf,
        /// Only list the top N paths by visitors.
        #[arg(long)]
        top: Option<usize>,
    },
    /// Re-analyse an export whenever its content changes.
    Watch {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Run a single cycle and exit.
        #[arg(long)]
        once: bool,
    },
    /// Show the effective configuration.
    Config,
}

fn render_text(report: &CommandReport) -> String {
    let status = if report.ok { "ok" } else { "failed" };
    let mut lines = vec![format!("{}: {status}", report.command)];
    lines.extend(report.details.iter().map(|d| format!("- {d}")));
    if !report.issues.is_empty() {
        lines.push("issues:".to_string());
        lines.extend(report.issues.iter().map(|i| format!("- {i}")));
    }
    lines.join("\n")
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    let rendered = if json {
        serde_json::to_string_pretty(report)?
    } else {
        render_text(report)
    };

    match &report.artifact {
        // stdout carries the artifact; the report moves to stderr.
        Some(artifact) => {
            println!("{artifact}");
            eprintln!("{rendered}");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config()?;
    logging::init(&cfg.log)?;

    let report = match cli.command {
        Command::Ingest { input, output } => {
            commands::ingest::run(&commands::ingest::IngestOptions { input, output }, &cfg)?
        }
        Command::Paths { input } => {
            commands::paths::run(&commands::paths::PathsOptions { input }, &cfg)?
        }
        Command::Grid { input, path, mode } => commands::grid::run(
            &commands::grid::GridOptions { input, path, mode },
            &cfg,
        )?,
        Command::Chart { input, path } => {
            commands::chart::run(&commands::chart::ChartOptions { input, path }, &cfg)?
        }
        Command::Velocity { input, top } => commands::velocity::run(
            &commands::velocity::VelocityCommandOptions { input, top },
            &cfg,
        )?,
        Command::Watch { input, out, once } => commands::watch::run(
            &commands::watch::WatchOptions {
                input,
                out_dir: out,
                once,
            },
            &cfg,
        )?,
        Command::Config => commands::config::run(&cfg)?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        std::process::exit(2);
    }
    Ok(())
}
