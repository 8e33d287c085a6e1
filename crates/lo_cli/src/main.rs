use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use lo_catalog::{load_content, load_inventory, load_request, parse_stat, ItemQuery};
use lo_control::{Action, OptimizerState};
use lo_core::{
    process, Catalog, Item, ItemId, NoResultsReason, OwnedItem, ResultSet, SearchMonitor,
    SearchOutcome, SearchProgress, SearchRequest, SearchResult, Stat,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "lo_cli", about = "Loadout optimizer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search an inventory for the best loadouts.
    Optimize(OptimizeArgs),
    /// Load and validate a content directory, then print a summary.
    Validate {
        #[arg(long, default_value = "./content")]
        content_dir: String,
    },
    /// Write a synthetic inventory rolled from the content catalog.
    Synth {
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value_t = 8)]
        per_bucket: usize,
        /// Random seed. Defaults to a random one.
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Args)]
struct OptimizeArgs {
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// Inventory export: a JSON array of owned items.
    #[arg(long)]
    inventory: PathBuf,
    /// Search request JSON. Defaults to an unconstrained request.
    #[arg(long)]
    request: Option<PathBuf>,
    /// Item query, e.g. "-is:exotic stat:total>=62".
    #[arg(long, default_value = "")]
    query: String,
    /// Minimum tier for a stat; repeatable.
    #[arg(long = "min", value_name = "STAT=TIER")]
    mins: Vec<String>,
    /// Stat excluded from ranking; repeatable.
    #[arg(long = "ignore", value_name = "STAT")]
    ignored: Vec<String>,
    /// Item that must appear in every set; repeatable.
    #[arg(long = "pin", value_name = "ITEM_ID")]
    pins: Vec<u64>,
    /// Item that must never appear; repeatable.
    #[arg(long = "exclude", value_name = "ITEM_ID")]
    excludes: Vec<u64>,
    /// Close stat gaps with auto-assigned stat mods.
    #[arg(long)]
    auto_mods: bool,
    /// Number of sets to print.
    #[arg(long, default_value_t = 10)]
    top: usize,
    /// Print the full outcome as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

// ---------------------------------------------------------------------------
// Optimize
// ---------------------------------------------------------------------------

/// Logs throttled progress reports from the search.
struct ProgressLog;

impl SearchMonitor for ProgressLog {
    fn report(&self, progress: &SearchProgress) {
        tracing::debug!(
            processed = progress.processed,
            combos = progress.combos,
            remaining_ms = progress
                .estimated_remaining()
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            "search progress"
        );
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    content_version: &'a str,
    query: &'a str,
    request: &'a SearchRequest,
    outcome: &'a SearchOutcome,
}

/// Applies command-line overrides on top of the request file.
fn build_state(
    args: &OptimizeArgs,
    catalog: &Catalog,
    inventory: &[OwnedItem],
) -> Result<OptimizerState> {
    let request = match &args.request {
        Some(path) => load_request(path)?,
        None => SearchRequest::default(),
    };
    let mut state = OptimizerState::with_request(request, &args.query);

    for entry in &args.mins {
        let (stat, tier) = entry
            .split_once('=')
            .with_context(|| format!("--min expects STAT=TIER, got '{entry}'"))?;
        let tier: u8 = tier
            .parse()
            .with_context(|| format!("--min tier must be a number, got '{tier}'"))?;
        state.apply(&Action::SetStatMin {
            stat: parse_stat(stat)?,
            tier,
        });
    }
    for stat in &args.ignored {
        state.apply(&Action::SetStatIgnored {
            stat: parse_stat(stat)?,
            ignored: true,
        });
    }
    for &id in &args.pins {
        let item = ItemId(id);
        let Some(bucket) = inventory
            .iter()
            .find(|owned| owned.id == item)
            .and_then(|owned| catalog.item(owned.hash))
            .map(|def| def.bucket)
        else {
            bail!("--pin {id}: no such item in the inventory");
        };
        state.apply(&Action::PinItem { bucket, item });
    }
    for &id in &args.excludes {
        state.apply(&Action::ExcludeItem { item: ItemId(id) });
    }
    if args.auto_mods {
        state.apply(&Action::SetAutoStatMods { enabled: true });
    }
    Ok(state)
}

fn optimize(args: &OptimizeArgs) -> Result<()> {
    let catalog = load_content(&args.content_dir)?;
    let inventory = load_inventory(&args.inventory)?;
    let state = build_state(args, &catalog, &inventory)?;
    let query = ItemQuery::parse(state.query())?;
    let request = state.request();

    let outcome = process(
        &catalog,
        &inventory,
        &request,
        &|item: &Item| query.matches(item),
        &ProgressLog,
    )
    .context("invalid search input")?;

    if args.json {
        let report = JsonReport {
            content_version: &catalog.content_version,
            query: query.source(),
            request: &request,
            outcome: &outcome,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing outcome")?
        );
        return Ok(());
    }

    match outcome {
        SearchOutcome::Completed(result) => {
            print_result(&catalog, &inventory, &request, &result, args.top);
        }
        SearchOutcome::Cancelled { elapsed_ms, .. } => {
            println!("Search cancelled after {elapsed_ms} ms.");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_result(
    catalog: &Catalog,
    inventory: &[OwnedItem],
    request: &SearchRequest,
    result: &SearchResult,
    top: usize,
) {
    let info = &result.info;
    println!(
        "Searched {} combinations in {} ms: {} evaluated, {} pruned, {} sets ({} best effort).",
        info.combos,
        result.elapsed_ms,
        info.evaluated,
        info.pruned,
        info.emitted,
        info.best_effort,
    );
    for miss in &result.misses {
        println!("  warning: catalog lookup miss {miss:?}");
    }
    for hash in &result.filter_report.unplaceable_mods {
        let name = catalog.mod_def(*hash).map_or("?", |def| def.name.as_str());
        println!("  warning: locked mod '{name}' ({hash}) fits no owned item");
    }
    for bucket in &result.filter_report.buckets {
        if bucket.search_fallback {
            println!("  note: query matched no {}; ignored for that bucket", bucket.bucket);
        }
    }

    if let Some(reason) = &result.no_results {
        println!("No loadouts found: {}", describe(reason));
        return;
    }

    let names: HashMap<ItemId, &str> = inventory
        .iter()
        .filter_map(|owned| {
            catalog
                .item(owned.hash)
                .map(|def| (owned.id, def.name.as_str()))
        })
        .collect();

    let header: Vec<String> = Stat::ALL.iter().map(|s| format!("{:>4}", s.short())).collect();
    println!("{}", "-".repeat(100));
    println!("  #  tier {}  items", header.join(""));
    println!("{}", "-".repeat(100));
    for (rank, set) in result.sets.iter().take(top).enumerate() {
        print_set(rank + 1, set, &names, request, catalog);
    }
}

fn print_set(
    rank: usize,
    set: &ResultSet,
    names: &HashMap<ItemId, &str>,
    request: &SearchRequest,
    catalog: &Catalog,
) {
    let tiers: String = Stat::ALL
        .iter()
        .map(|&stat| {
            let marker = if request.constraint(stat).ignored { "-" } else { "" };
            let value = format!("{marker}{}", set.stats.get(stat));
            format!("{value:>4}")
        })
        .collect();
    let items: Vec<&str> = set
        .items
        .iter()
        .map(|id| names.get(id).copied().unwrap_or("?"))
        .collect();
    let flag = if set.is_best_effort() { "*" } else { " " };
    println!(
        "{rank:>3}{flag} {:>4} {tiers}  {}",
        set.enabled_tier_total,
        items.join(" / ")
    );
    if !set.auto_mods.is_empty() {
        let mods: Vec<&str> = set
            .auto_mods
            .iter()
            .map(|hash| catalog.mod_def(*hash).map_or("?", |def| def.name.as_str()))
            .collect();
        println!("        + {}", mods.join(", "));
    }
    if let Some(shortfall) = set.shortfall {
        println!("        short by {:?}", shortfall.0);
    }
}

fn describe(reason: &NoResultsReason) -> String {
    match reason {
        NoResultsReason::EmptyBucket { bucket, reason } => match reason {
            Some(cause) => format!("every {bucket} was removed ({cause:?})"),
            None => format!("the inventory has no {bucket}"),
        },
        NoResultsReason::ModExclusivityConflict { conflict } => format!(
            "locked mods {} and {} cannot be active together",
            conflict.first, conflict.second
        ),
        NoResultsReason::ExoticRule => "no combination satisfies the exotic rule".to_string(),
        NoResultsReason::ModAssignment => "the locked mods do not fit any combination".to_string(),
        NoResultsReason::StatMinimum { stat } => {
            format!("the {} minimum is out of reach", stat.label())
        }
    }
}

// ---------------------------------------------------------------------------
// Validate / synth
// ---------------------------------------------------------------------------

fn validate(content_dir: &str) -> Result<()> {
    let catalog = load_content(content_dir)?;
    println!(
        "content_version={} items={} mods={} stat_mods={}",
        catalog.content_version,
        catalog.items.len(),
        catalog.mods.len(),
        catalog.auto_mods().count(),
    );
    Ok(())
}

fn synth(content_dir: &str, per_bucket: usize, seed: Option<u64>, out: &Path) -> Result<()> {
    let catalog = load_content(content_dir)?;
    let seed = seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let inventory = lo_core::synth::random_inventory(&catalog, per_bucket, &mut rng);
    let json = serde_json::to_string_pretty(&inventory).context("serializing inventory")?;
    std::fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
    println!(
        "Wrote {} items (seed {seed}) to {}",
        inventory.len(),
        out.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Optimize(args) => optimize(&args)?,
        Commands::Validate { content_dir } => validate(&content_dir)?,
        Commands::Synth {
            content_dir,
            per_bucket,
            seed,
            out,
        } => synth(&content_dir, per_bucket, seed, &out)?,
    }
    Ok(())
}
