use crate::runner::SeedResult;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

type Extractor = (&'static str, fn(&SeedResult) -> f64);

const EXTRACTORS: [Extractor; 8] = [
    ("combos", |r| r.combos as f64),
    ("evaluated", |r| r.evaluated as f64),
    ("pruned_pct", |r| {
        if r.combos == 0 {
            0.0
        } else {
            r.pruned as f64 / r.combos as f64 * 100.0
        }
    }),
    ("emitted", |r| r.emitted as f64),
    ("best_effort", |r| r.best_effort as f64),
    ("best_tier_total", |r| {
        r.best_tier_total.map_or(0.0, f64::from)
    }),
    ("wall_time_ms", |r| r.wall_time_ms as f64),
    ("combos_per_second", |r| r.combos_per_second),
];

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub seed_count: usize,
    /// Seeds whose search produced no loadout.
    pub empty_count: usize,
    pub metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

pub fn compute_summary(results: &[SeedResult]) -> SummaryStats {
    let empty_count = results.iter().filter(|r| !r.found_sets()).count();
    let metrics = EXTRACTORS
        .iter()
        .map(|(name, extract)| {
            let values: Vec<f64> = results.iter().map(extract).collect();
            compute_metric_summary(name, &values)
        })
        .collect();
    SummaryStats {
        seed_count: results.len(),
        empty_count,
        metrics,
    }
}

fn compute_metric_summary(name: &str, values: &[f64]) -> MetricSummary {
    if values.is_empty() {
        return MetricSummary {
            name: name.to_string(),
            mean: 0.0,
            min: 0.0,
            max: 0.0,
            stddev: 0.0,
        };
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    MetricSummary {
        name: name.to_string(),
        mean,
        min,
        max,
        stddev: variance.sqrt(),
    }
}

pub fn print_summary(scenario_name: &str, per_bucket: usize, stats: &SummaryStats) {
    println!();
    println!(
        "=== {scenario_name}: {} seeds, {per_bucket} items per bucket ===",
        stats.seed_count
    );
    println!(
        "Seeds with no loadout: {}/{}",
        stats.empty_count, stats.seed_count
    );
    println!();
    println!(
        "{:<20} {:>14} {:>14} {:>14} {:>14}",
        "metric", "mean", "min", "max", "stddev"
    );
    println!("{}", "-".repeat(80));
    for metric in &stats.metrics {
        println!(
            "{:<20} {:>14.2} {:>14.2} {:>14.2} {:>14.2}",
            metric.name, metric.mean, metric.min, metric.max, metric.stddev
        );
    }
}

/// Writes `value` as pretty JSON through a temporary file and a rename, so
/// readers never see a partial file.
pub fn write_json_atomic(path: &Path, value: &impl Serialize) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value).context("serializing summary")?;
    let mut file =
        std::fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("writing {}", tmp.display()))?;
    file.sync_all()?;
    std::fs::rename(&tmp, path).with_context(|| format!("renaming to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_result(seed: u64, combos: u64, pruned: u64, sets: usize) -> SeedResult {
        SeedResult {
            seed,
            inventory_items: 10,
            combos,
            evaluated: combos - pruned,
            pruned,
            emitted: sets as u64,
            best_effort: 0,
            sets,
            best_tier_total: (sets > 0).then_some(30),
            wall_time_ms: 10,
            combos_per_second: combos as f64 * 100.0,
        }
    }

    fn metric<'a>(stats: &'a SummaryStats, name: &str) -> &'a MetricSummary {
        stats.metrics.iter().find(|m| m.name == name).unwrap()
    }

    #[test]
    fn test_summary_single_seed() {
        let stats = compute_summary(&[seed_result(1, 100, 25, 4)]);
        assert_eq!(stats.seed_count, 1);
        assert_eq!(stats.empty_count, 0);
        let pruned = metric(&stats, "pruned_pct");
        assert!((pruned.mean - 25.0).abs() < 1e-9);
        assert!(pruned.stddev.abs() < 1e-9);
    }

    #[test]
    fn test_summary_multiple_seeds() {
        let stats = compute_summary(&[
            seed_result(1, 100, 0, 3),
            seed_result(2, 300, 0, 0),
        ]);
        assert_eq!(stats.seed_count, 2);
        assert_eq!(stats.empty_count, 1);
        let combos = metric(&stats, "combos");
        assert!((combos.mean - 200.0).abs() < 1e-9);
        assert!((combos.min - 100.0).abs() < 1e-9);
        assert!((combos.max - 300.0).abs() < 1e-9);
        assert!((combos.stddev - 100.0).abs() < 1e-9);
        let best = metric(&stats, "best_tier_total");
        assert!((best.mean - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_write_json_atomic_leaves_no_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        let stats = compute_summary(&[seed_result(1, 10, 5, 1)]);
        write_json_atomic(&path, &stats).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["seed_count"], 1);
        assert!(!dir.path().join("summary.json.tmp").exists());
    }
}
