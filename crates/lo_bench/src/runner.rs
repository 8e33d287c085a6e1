use anyhow::{Context, Result};
use lo_catalog::ItemQuery;
use lo_core::{process, synth::random_inventory, Catalog, Item, SearchRequest, Unmonitored};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// Measurements from one seed's search.
#[derive(Debug, Clone, Serialize)]
pub struct SeedResult {
    pub seed: u64,
    pub inventory_items: usize,
    pub combos: u64,
    pub evaluated: u64,
    pub pruned: u64,
    pub emitted: u64,
    pub best_effort: u64,
    pub sets: usize,
    /// Enabled tier total of the best set, if any set survived.
    pub best_tier_total: Option<u16>,
    pub wall_time_ms: u64,
    pub combos_per_second: f64,
}

impl SeedResult {
    pub fn found_sets(&self) -> bool {
        self.sets > 0
    }
}

/// Rolls a seeded inventory, runs one search over it and writes
/// `inventory.json` and `seed_result.json` into `seed_dir`.
pub fn run_seed(
    catalog: &Catalog,
    seed: u64,
    per_bucket: usize,
    request: &SearchRequest,
    query: &ItemQuery,
    seed_dir: &Path,
) -> Result<SeedResult> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let inventory = random_inventory(catalog, per_bucket, &mut rng);

    std::fs::create_dir_all(seed_dir)
        .with_context(|| format!("creating seed directory: {}", seed_dir.display()))?;
    let inventory_json =
        serde_json::to_string_pretty(&inventory).context("serializing inventory")?;
    std::fs::write(seed_dir.join("inventory.json"), inventory_json)
        .context("writing inventory.json")?;

    let start = Instant::now();
    let outcome = process(
        catalog,
        &inventory,
        request,
        &|item: &Item| query.matches(item),
        &Unmonitored,
    )
    .with_context(|| format!("seed {seed}: invalid search input"))?;
    let wall_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    let result = outcome
        .completed()
        .with_context(|| format!("seed {seed}: search did not complete"))?;

    let combos_per_second = if wall_time_ms > 0 {
        result.info.combos as f64 / (wall_time_ms as f64 / 1000.0)
    } else {
        0.0
    };
    let seed_result = SeedResult {
        seed,
        inventory_items: inventory.len(),
        combos: result.info.combos,
        evaluated: result.info.evaluated,
        pruned: result.info.pruned,
        emitted: result.info.emitted,
        best_effort: result.info.best_effort,
        sets: result.sets.len(),
        best_tier_total: result.sets.first().map(|set| set.enabled_tier_total),
        wall_time_ms,
        combos_per_second,
    };

    let json = serde_json::to_string_pretty(&seed_result).context("serializing seed result")?;
    std::fs::write(seed_dir.join("seed_result.json"), json)
        .context("writing seed_result.json")?;
    Ok(seed_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        lo_catalog::load_content("../../content").unwrap()
    }

    #[test]
    fn test_run_seed_produces_output() {
        let catalog = catalog();
        let temp_dir = TempDir::new().unwrap();
        let seed_dir = temp_dir.path().join("seed_42");

        let result = run_seed(
            &catalog,
            42,
            3,
            &SearchRequest::default(),
            &ItemQuery::default(),
            &seed_dir,
        )
        .unwrap();

        assert_eq!(result.seed, 42);
        assert_eq!(result.inventory_items, 15);
        assert_eq!(result.combos, 243);
        assert_eq!(result.evaluated + result.pruned, result.combos);
        assert!(result.found_sets());
        assert!(seed_dir.join("inventory.json").exists());

        let written = std::fs::read_to_string(seed_dir.join("seed_result.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["seed"], 42);
        assert_eq!(parsed["combos"], 243);
    }

    #[test]
    fn test_run_seed_determinism() {
        let catalog = catalog();
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        let request = SearchRequest::default();
        let query = ItemQuery::parse("-is:artifice").unwrap();

        let a = run_seed(&catalog, 7, 4, &request, &query, dir1.path()).unwrap();
        let b = run_seed(&catalog, 7, 4, &request, &query, dir2.path()).unwrap();

        assert_eq!(a.combos, b.combos);
        assert_eq!(a.emitted, b.emitted);
        assert_eq!(a.best_tier_total, b.best_tier_total);
        assert_eq!(
            std::fs::read_to_string(dir1.path().join("inventory.json")).unwrap(),
            std::fs::read_to_string(dir2.path().join("inventory.json")).unwrap(),
        );
    }

    #[test]
    fn test_run_seed_rejects_invalid_request() {
        let catalog = catalog();
        let temp_dir = TempDir::new().unwrap();
        let mut request = SearchRequest::default();
        request.stat_order.truncate(3);

        let err = run_seed(
            &catalog,
            1,
            2,
            &request,
            &ItemQuery::default(),
            temp_dir.path(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("invalid search input"));
    }
}
