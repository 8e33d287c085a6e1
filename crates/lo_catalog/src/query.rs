//! Free-text item query used as the search filter predicate.
//!
//! A query is a whitespace-separated list of terms, all of which must match.
//! A leading `-` negates a term. Supported terms:
//!
//! - `is:exotic`, `is:legendary`, `is:masterworked`, `is:artifice`
//! - `id:<item id>`
//! - `bucket:<helmet|gauntlets|chest|legs|class>`
//! - `stat:<stat|total><op><value>` with `op` one of `>=`, `<=`, `>`, `<`, `=`,
//!   compared against base stats
//! - anything else is a case-insensitive substring of the item name

use anyhow::{bail, Context, Result};
use lo_core::{Bucket, Item, ItemId, Stat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    AtLeast,
    AtMost,
    Above,
    Below,
    Equal,
}

impl Comparison {
    fn holds(self, value: i32, bound: i32) -> bool {
        match self {
            Comparison::AtLeast => value >= bound,
            Comparison::AtMost => value <= bound,
            Comparison::Above => value > bound,
            Comparison::Below => value < bound,
            Comparison::Equal => value == bound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Exotic,
    Legendary,
    Masterworked,
    Artifice,
    Id(ItemId),
    Bucket(Bucket),
    /// `None` compares the stat total.
    Stat(Option<Stat>, Comparison, i32),
    Name(String),
}

impl Predicate {
    fn matches(&self, item: &Item) -> bool {
        match self {
            Predicate::Exotic => item.exotic,
            Predicate::Legendary => !item.exotic,
            Predicate::Masterworked => item.masterworked,
            Predicate::Artifice => item.is_artifice(),
            Predicate::Id(id) => item.id == *id,
            Predicate::Bucket(bucket) => item.bucket == *bucket,
            Predicate::Stat(stat, cmp, bound) => {
                let value = match stat {
                    Some(stat) => item.base_stats.get(*stat),
                    None => item.base_stats.total(),
                };
                cmp.holds(value, *bound)
            }
            Predicate::Name(needle) => item.name.to_lowercase().contains(needle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    negated: bool,
    predicate: Predicate,
}

/// Parsed item query. The empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    source: String,
    terms: Vec<Term>,
}

impl ItemQuery {
    pub fn parse(source: &str) -> Result<ItemQuery> {
        let terms = source
            .split_whitespace()
            .map(|raw| parse_term(raw).with_context(|| format!("in query term '{raw}'")))
            .collect::<Result<Vec<_>>>()?;
        Ok(ItemQuery {
            source: source.trim().to_string(),
            terms,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.terms
            .iter()
            .all(|term| term.predicate.matches(item) != term.negated)
    }
}

fn parse_term(raw: &str) -> Result<Term> {
    let (negated, body) = match raw.strip_prefix('-') {
        Some(rest) if !rest.is_empty() => (true, rest),
        _ => (false, raw),
    };
    let lower = body.to_lowercase();
    let predicate = match lower.split_once(':') {
        Some(("is", flag)) => match flag {
            "exotic" => Predicate::Exotic,
            "legendary" => Predicate::Legendary,
            "masterworked" | "masterwork" => Predicate::Masterworked,
            "artifice" => Predicate::Artifice,
            other => bail!("unknown flag 'is:{other}'"),
        },
        Some(("id", id)) => {
            Predicate::Id(ItemId(id.parse().context("item id must be a number")?))
        }
        Some(("bucket", name)) => Predicate::Bucket(parse_bucket(name)?),
        Some(("stat", expr)) => parse_stat_term(expr)?,
        _ => Predicate::Name(lower),
    };
    Ok(Term { negated, predicate })
}

fn parse_bucket(name: &str) -> Result<Bucket> {
    Ok(match name {
        "helmet" | "head" => Bucket::Helmet,
        "gauntlets" | "arms" => Bucket::Gauntlets,
        "chest" => Bucket::Chest,
        "legs" => Bucket::Legs,
        "class" | "classitem" => Bucket::ClassItem,
        other => bail!("unknown bucket '{other}'"),
    })
}

fn parse_stat_term(expr: &str) -> Result<Predicate> {
    let Some(split) = expr.find(['>', '<', '=']) else {
        bail!("stat term needs a comparison, e.g. stat:mobility>=20");
    };
    let (name, rest) = expr.split_at(split);
    let (cmp, value) = if let Some(v) = rest.strip_prefix(">=") {
        (Comparison::AtLeast, v)
    } else if let Some(v) = rest.strip_prefix("<=") {
        (Comparison::AtMost, v)
    } else if let Some(v) = rest.strip_prefix('>') {
        (Comparison::Above, v)
    } else if let Some(v) = rest.strip_prefix('<') {
        (Comparison::Below, v)
    } else {
        (Comparison::Equal, rest.trim_start_matches('='))
    };
    let stat = if name == "total" {
        None
    } else {
        Some(parse_stat(name)?)
    };
    let bound = value.parse().context("stat bound must be a number")?;
    Ok(Predicate::Stat(stat, cmp, bound))
}

/// Parses a stat by its full name or three-letter short name, case-insensitively.
pub fn parse_stat(name: &str) -> Result<Stat> {
    let name = name.to_lowercase();
    Stat::ALL
        .into_iter()
        .find(|s| s.label() == name || s.short() == name)
        .with_context(|| format!("unknown stat '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lo_core::catalog::resolve_item;
    use lo_core::test_fixtures::{self as fx, base_catalog, owned};
    use lo_core::{ItemHash, StatVector};

    fn item(id: u64, hash: ItemHash, stats: StatVector, masterworked: bool) -> Item {
        let mut entry = owned(id, hash, stats);
        entry.masterworked = masterworked;
        resolve_item(&base_catalog(), &entry).expect("fixture item")
    }

    fn inventory() -> Vec<Item> {
        vec![
            item(1, fx::HELMET, StatVector([20, 2, 10, 2, 20, 10]), false),
            item(2, fx::HELMET_EXOTIC, StatVector([2, 30, 2, 2, 2, 30]), true),
            item(3, fx::LEGS_ARTIFICE, StatVector([10, 10, 10, 10, 10, 10]), true),
            item(4, fx::CHEST_RAID, StatVector([2, 2, 30, 30, 2, 2]), false),
        ]
    }

    fn ids(query: &str) -> Vec<u64> {
        let query = ItemQuery::parse(query).expect("valid query");
        inventory()
            .iter()
            .filter(|item| query.matches(item))
            .map(|item| item.id.0)
            .collect()
    }

    #[test]
    fn empty_query_matches_everything() {
        assert_eq!(ids(""), vec![1, 2, 3, 4]);
        assert!(ItemQuery::parse("   ").expect("valid").is_empty());
    }

    #[test]
    fn flags_and_negation() {
        assert_eq!(ids("is:exotic"), vec![2]);
        assert_eq!(ids("-is:exotic"), vec![1, 3, 4]);
        assert_eq!(ids("is:masterworked is:legendary"), vec![3]);
        assert_eq!(ids("is:artifice"), vec![3]);
    }

    #[test]
    fn id_bucket_and_name_terms() {
        assert_eq!(ids("id:4"), vec![4]);
        assert_eq!(ids("bucket:helmet"), vec![1, 2]);
        assert_eq!(ids("RAID"), vec![4]);
        assert_eq!(ids("helmet -exotic"), vec![1]);
    }

    #[test]
    fn stat_comparisons() {
        assert_eq!(ids("stat:mobility>=20"), vec![1]);
        assert_eq!(ids("stat:res>10"), vec![2]);
        assert_eq!(ids("stat:total=60"), vec![3]);
        assert_eq!(ids("stat:recovery<10"), vec![2]);
        assert_eq!(ids("stat:discipline<=2"), vec![1, 2]);
    }

    #[test]
    fn malformed_terms_are_errors() {
        for bad in [
            "is:shiny",
            "id:abc",
            "bucket:boots",
            "stat:luck>5",
            "stat:mobility",
            "stat:mob>=x",
        ] {
            let err = ItemQuery::parse(bad).unwrap_err();
            assert!(format!("{err:#}").contains(bad), "{bad}: {err:#}");
        }
    }

    #[test]
    fn lone_dash_is_a_name_term() {
        let query = ItemQuery::parse("-").expect("valid");
        assert_eq!(query.source(), "-");
        assert!(!query.is_empty());
    }
}
