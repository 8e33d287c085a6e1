use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lo_catalog::ItemQuery;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

mod runner;
mod scenario;
mod summary;

#[derive(Parser)]
#[command(
    name = "lo_bench",
    about = "Scenario runner for loadout search benchmarking"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file across multiple seeds.
    Run {
        /// Path to the scenario JSON file.
        #[arg(long)]
        scenario: String,
        /// Output directory (default: runs/).
        #[arg(long, default_value = "runs")]
        output_dir: String,
    },
}

fn run(scenario_path: &str, output_dir: &str) -> Result<()> {
    let scenario = scenario::load_scenario(Path::new(scenario_path))?;
    let seeds = scenario.seeds.expand();
    let query = ItemQuery::parse(&scenario.query)?;

    println!(
        "Loading scenario '{}': {} seeds × {} items per bucket",
        scenario.name,
        seeds.len(),
        scenario.per_bucket
    );

    let catalog = lo_catalog::load_content(&scenario.content_dir)?;

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_dir = PathBuf::from(output_dir).join(format!("{}_{}", scenario.name, timestamp));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating output directory: {}", run_dir.display()))?;
    std::fs::copy(scenario_path, run_dir.join("scenario.json")).context("copying scenario file")?;

    println!("Output: {}", run_dir.display());
    println!("Running {} seeds in parallel...", seeds.len());

    let results: Vec<Result<runner::SeedResult>> = seeds
        .par_iter()
        .map(|&seed| {
            runner::run_seed(
                &catalog,
                seed,
                scenario.per_bucket,
                &scenario.request,
                &query,
                &run_dir.join(format!("seed_{seed}")),
            )
        })
        .collect();

    let mut seed_results = Vec::new();
    for result in results {
        match result {
            Ok(seed_result) => seed_results.push(seed_result),
            Err(err) => eprintln!("Seed failed: {err:#}"),
        }
    }
    if seed_results.is_empty() {
        anyhow::bail!("all seeds failed");
    }

    let stats = summary::compute_summary(&seed_results);
    summary::print_summary(&scenario.name, scenario.per_bucket, &stats);

    let summary_path = run_dir.join("summary.json");
    summary::write_json_atomic(
        &summary_path,
        &serde_json::json!({
            "scenario_name": scenario.name,
            "content_version": catalog.content_version,
            "per_bucket": scenario.per_bucket,
            "summary": stats,
            "seeds": seed_results,
        }),
    )?;
    println!("Summary written to {}", summary_path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            scenario,
            output_dir,
        } => run(&scenario, &output_dir)?,
    }
    Ok(())
}
