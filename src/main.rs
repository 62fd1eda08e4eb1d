// Import from library crate
use statline::enrich::FileStatsProvider;
use statline::pipeline::{RosterPipeline, RunReport, StandingsPipeline};
use statline::source::JsonFileSource;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "statline")]
#[command(about = "League data ETL: normalize provider payloads into Parquet datasets")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a standings payload dump and rebuild the standings dataset
    Standings {
        /// JSON file holding the raw standings payload array
        payload: PathBuf,

        /// Path to the dataset directory (default: ./Data)
        #[arg(short, long, default_value = "Data")]
        data_dir: PathBuf,
    },
    /// Flatten roster payload dumps and append to the roster dataset
    Rosters {
        /// JSON file holding team roster envelopes
        payload: PathBuf,

        /// Path to the dataset directory (default: ./Data)
        #[arg(short, long, default_value = "Data")]
        data_dir: PathBuf,

        /// Optional JSON file of pre-fetched player summaries for enrichment
        #[arg(long)]
        players: Option<PathBuf>,
    },
    /// Run standings then rosters from a payload directory
    All {
        /// Directory holding standings.json, rosters.json and players.json
        #[arg(short, long, default_value = "payloads")]
        payload_dir: PathBuf,

        /// Path to the dataset directory (default: ./Data)
        #[arg(short, long, default_value = "Data")]
        data_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    match args.command {
        Commands::Standings { payload, data_dir } => {
            let report = run_standings(&payload, &data_dir)?;
            print_report(&report);
        }
        Commands::Rosters { payload, data_dir, players } => {
            let report = run_rosters(&payload, &data_dir, players.as_ref())?;
            print_report(&report);
        }
        Commands::All { payload_dir, data_dir } => {
            let standings_payload = payload_dir.join("standings.json");
            if standings_payload.exists() {
                print_report(&run_standings(&standings_payload, &data_dir)?);
            } else {
                info!("no standings payload at {}; skipping", standings_payload.display());
            }

            let roster_payload = payload_dir.join("rosters.json");
            let players_payload = payload_dir.join("players.json");
            let players = players_payload.exists().then_some(&players_payload);
            print_report(&run_rosters(&roster_payload, &data_dir, players)?);
        }
    }

    Ok(())
}

fn run_standings(payload: &PathBuf, data_dir: &PathBuf) -> Result<RunReport> {
    let pipeline = StandingsPipeline::new(data_dir);
    let mut source = JsonFileSource::new("standings".to_string(), payload.clone());
    pipeline.run(&mut source)
}

fn run_rosters(payload: &PathBuf, data_dir: &PathBuf, players: Option<&PathBuf>) -> Result<RunReport> {
    let pipeline = RosterPipeline::new(data_dir);
    let mut source = JsonFileSource::new("rosters".to_string(), payload.clone());

    let provider = match players {
        Some(path) => Some(FileStatsProvider::load(path.clone())?),
        None => None,
    };

    pipeline.run(
        &mut source,
        provider.as_ref().map(|p| p as &dyn statline::enrich::StatsProvider),
    )
}

fn print_report(report: &RunReport) {
    println!("\n=== {:?} run {} ===", report.dataset, report.run_id);
    println!(
        "rows written: {} (total {})",
        report.rows_written, report.rows_total
    );
    println!("columns: {}", report.columns.join(", "));
    if !report.fills.is_empty() {
        println!("cross-reference fills: {}", report.fills.len());
    }
    for diagnostic in &report.diagnostics {
        println!("note: {}", diagnostic);
    }
}
