use anyhow::{bail, Context, Result};
use lo_catalog::ItemQuery;
use lo_core::SearchRequest;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A benchmark scenario: one search request run against a synthetic
/// inventory per seed.
#[derive(Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seeds: SeedSpec,
    /// Synthetic items rolled per armor bucket.
    #[serde(default = "default_per_bucket")]
    pub per_bucket: usize,
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    #[serde(default)]
    pub request: SearchRequest,
    #[serde(default)]
    pub query: String,
}

fn default_per_bucket() -> usize {
    8
}

fn default_content_dir() -> String {
    "./content".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    List(Vec<u64>),
    Range { range: [u64; 2] },
}

impl SeedSpec {
    pub fn expand(&self) -> Vec<u64> {
        match self {
            SeedSpec::List(seeds) => seeds.clone(),
            SeedSpec::Range { range } => (range[0]..=range[1]).collect(),
        }
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&json)
        .with_context(|| format!("parsing scenario file: {}", path.display()))?;
    if scenario.name.is_empty() {
        bail!("scenario 'name' must not be empty");
    }
    if scenario.per_bucket == 0 {
        bail!("scenario 'per_bucket' must be > 0");
    }
    if scenario.seeds.expand().is_empty() {
        bail!("scenario 'seeds' must produce at least one seed");
    }
    ItemQuery::parse(&scenario.query).context("scenario 'query'")?;
    Ok(scenario)
}
