//! TickLab CLI: run, sweep, synth, report, and init-config commands.
//!
//! Commands:
//! - `run`: backtest every asset in a tape file and save artifacts
//! - `sweep`: run a parameter grid over one tape file and rank candidates
//! - `synth`: write a deterministic synthetic tape file
//! - `report`: print the Markdown report of a saved run
//! - `init-config`: write the default configuration as TOML

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ticklab_core::components::ConditionMode;
use ticklab_runner::{
    export_sweep_csv, generate_report, generate_sweep_report, generate_tapes, load_artifacts,
    load_tapes, run_from_files, run_sweep, save_artifacts, suggest_range, tapes_to_value,
    BacktestConfig, BatchResult, ParamGrid, SyntheticConfig,
};

#[derive(Parser)]
#[command(name = "ticklab", about = "TickLab CLI: tick-by-tick backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest every asset in a tape file.
    Run {
        /// Tape file (JSON object keyed by asset id).
        #[arg(long)]
        data: PathBuf,

        /// TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the full Markdown report after the summary.
        #[arg(long, default_value_t = false)]
        report: bool,
    },
    /// Run a parameter grid and rank candidates by total profit.
    Sweep {
        /// Tape file (JSON object keyed by asset id).
        #[arg(long)]
        data: PathBuf,

        /// Grid TOML file with `[[axes]]` and optional `[thresholds]`.
        #[arg(long)]
        grid: PathBuf,

        /// Base TOML config. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Output directory for sweep.csv and sweep.md.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Write a synthetic tape file.
    Synth {
        #[arg(long, default_value_t = 10)]
        assets: usize,

        #[arg(long, default_value_t = 2_000)]
        ticks: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output path.
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the report of a saved run directory.
    Report {
        /// Directory written by `run` (contains result.json).
        dir: PathBuf,
    },
    /// Write the default configuration as TOML.
    InitConfig {
        /// Output path. Prints to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            config,
            output_dir,
            report,
        } => run_cmd(&data, config.as_deref(), &output_dir, report),
        Commands::Sweep {
            data,
            grid,
            config,
            top,
            output_dir,
        } => sweep_cmd(&data, &grid, config.as_deref(), top, &output_dir),
        Commands::Synth {
            assets,
            ticks,
            seed,
            out,
        } => synth_cmd(assets, ticks, seed, &out),
        Commands::Report { dir } => {
            let result = load_artifacts(&dir)?;
            print!("{}", generate_report(&result));
            Ok(())
        }
        Commands::InitConfig { out } => init_config_cmd(out.as_deref()),
    }
}

fn run_cmd(data: &Path, config: Option<&Path>, output_dir: &Path, report: bool) -> Result<()> {
    let result = run_from_files(data, config)
        .with_context(|| format!("backtest of {} failed", data.display()))?;

    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    if report {
        println!();
        print!("{}", generate_report(&result));
    }
    Ok(())
}

fn sweep_cmd(
    data: &Path,
    grid_path: &Path,
    config: Option<&Path>,
    top: usize,
    output_dir: &Path,
) -> Result<()> {
    let base = match config {
        Some(path) => BacktestConfig::from_file(path)?,
        None => BacktestConfig::default(),
    };
    let grid = ParamGrid::from_file(grid_path)?;
    let loaded = load_tapes(data)?;
    info!(candidates = grid.size(), "grid loaded");

    let results = run_sweep(&loaded.tapes, &base, &grid)?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    std::fs::write(output_dir.join("sweep.csv"), export_sweep_csv(&results)?)?;
    let report = generate_sweep_report(&results, top);
    std::fs::write(output_dir.join("sweep.md"), &report)?;

    print!("{report}");
    println!();
    println!("Sweep saved to: {}", output_dir.display());
    Ok(())
}

fn synth_cmd(assets: usize, ticks: usize, seed: u64, out: &Path) -> Result<()> {
    let config = SyntheticConfig {
        ticks_per_asset: ticks,
        seed,
        ..SyntheticConfig::default()
    };
    let tapes = generate_tapes(assets, &config);
    let json = serde_json::to_string(&tapes_to_value(&tapes))?;
    std::fs::write(out, json).with_context(|| format!("failed to write {}", out.display()))?;
    println!("Wrote {assets} synthetic tapes ({ticks} ticks each) to {}", out.display());
    Ok(())
}

fn init_config_cmd(out: Option<&Path>) -> Result<()> {
    let toml = BacktestConfig::default().to_toml()?;
    match out {
        Some(path) => {
            std::fs::write(path, toml)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Default config written to: {}", path.display());
        }
        None => print!("{toml}"),
    }
    Ok(())
}

fn print_summary(result: &BatchResult) {
    let s = &result.summary;
    println!();
    println!("=== Backtest Result ===");
    println!(
        "Config:         {}",
        result.config_hash.get(..12).unwrap_or(&result.config_hash)
    );
    println!(
        "Assets:         {} run, {} skipped",
        result.assets.len(),
        result.skipped.len()
    );
    println!("Trades:         {}", s.total_trades);
    println!("Profitable:     {}", s.profitable_trades);
    println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
    println!(
        "Total Profit:   {:.4} SOL ({} outliers excluded)",
        s.total_profit_sol, s.excluded_outliers
    );
    println!("Avg Rate:       {:.2}%", s.avg_profit_rate * 100.0);

    if !s.exit_reasons.is_empty() {
        println!();
        println!("--- Exit Reasons ---");
        for (reason, count) in s.exit_reasons_by_count() {
            println!("{:<24} {:>6}", reason.as_str(), count);
        }
    }

    if let Some(analytics) = &result.analytics {
        let order: Vec<&str> = result
            .config
            .entry
            .conditions
            .iter()
            .filter(|c| c.mode == ConditionMode::Debug)
            .map(|c| c.name())
            .collect();
        if let Some(suggestion) = suggest_range(analytics, &order) {
            println!();
            match suggestion.max {
                Some(max) => println!(
                    "Suggested range: {} in [{}, {}]",
                    suggestion.condition, suggestion.min, max
                ),
                None => println!(
                    "Suggested range: {} >= {}",
                    suggestion.condition, suggestion.min
                ),
            }
        }
    }
    println!();
}
