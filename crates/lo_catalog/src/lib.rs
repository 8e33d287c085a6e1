use anyhow::{Context, Result};
use lo_core::{
    Bucket, Catalog, Constants, ItemDef, ModCategory, ModDef, OwnedItem, SearchRequest,
    SocketCategory, MAX_ITEM_SOCKETS,
};
use serde::Deserialize;
use std::path::Path;

mod query;

pub use query::{parse_stat, ItemQuery};

#[derive(Deserialize)]
struct ItemsFile {
    content_version: String,
    items: Vec<ItemDef>,
}

#[derive(Deserialize)]
struct ModsFile {
    mods: Vec<ModDef>,
}

/// Validates cross-references in loaded content. Panics with a descriptive
/// message on the first authoring error found.
pub fn validate_content(catalog: &Catalog) {
    validate_constants(&catalog.constants);

    for bucket in Bucket::ALL {
        assert!(
            catalog.items.values().any(|def| def.bucket == bucket),
            "no item definition for bucket {bucket}"
        );
    }
    for def in catalog.items.values() {
        assert!(!def.name.is_empty(), "item {} has an empty name", def.hash);
        assert!(
            def.sockets.len() <= MAX_ITEM_SOCKETS,
            "item '{}' has {} sockets, more than {MAX_ITEM_SOCKETS}",
            def.name,
            def.sockets.len()
        );
    }

    for def in catalog.mods.values() {
        assert!(!def.name.is_empty(), "mod {} has an empty name", def.hash);
        assert!(
            def.energy_cost <= catalog.constants.max_item_energy,
            "mod '{}' costs {} energy, more than max_item_energy {}",
            def.name,
            def.energy_cost,
            catalog.constants.max_item_energy
        );
        match def.category {
            ModCategory::BucketSpecific(bucket) => assert!(
                catalog.items.values().any(|item| item.bucket == bucket
                    && item.sockets.contains(&SocketCategory::BucketSpecific)),
                "mod '{}' targets {bucket} but no {bucket} item has a bucket-specific socket",
                def.name
            ),
            ModCategory::Activity(tag) => assert!(
                catalog
                    .items
                    .values()
                    .any(|item| item.sockets.contains(&SocketCategory::Activity(tag))),
                "mod '{}' needs activity socket {tag} which no item carries",
                def.name
            ),
            _ => {}
        }
        if def.auto_assignable {
            validate_stat_mod(def);
        }
    }
}

fn validate_constants(constants: &Constants) {
    assert!(
        constants.max_item_energy > 0,
        "max_item_energy must be positive"
    );
    assert!(
        constants.masterwork_stat_bonus >= 0,
        "masterwork_stat_bonus must not be negative"
    );
    assert!(constants.result_limit > 0, "result_limit must be positive");
    assert!(
        constants.max_auto_mod_attempts > 0,
        "max_auto_mod_attempts must be positive"
    );
}

fn validate_stat_mod(def: &ModDef) {
    assert!(
        matches!(def.category, ModCategory::General | ModCategory::Artifice),
        "auto-assignable mod '{}' must be a general or artifice mod",
        def.name
    );
    let boosted = def.stats.0.iter().filter(|&&v| v > 0).count();
    let reduced = def.stats.0.iter().filter(|&&v| v < 0).count();
    assert!(
        boosted == 1 && reduced == 0,
        "auto-assignable mod '{}' must raise exactly one stat",
        def.name
    );
}

pub fn load_content(content_dir: &str) -> Result<Catalog> {
    let dir = Path::new(content_dir);

    let items_file: ItemsFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("items.json")).context("reading items.json")?,
    )
    .context("parsing items.json")?;
    let mods_file: ModsFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("mods.json")).context("reading mods.json")?,
    )
    .context("parsing mods.json")?;
    let constants: Constants = serde_json::from_str(
        &std::fs::read_to_string(dir.join("constants.json")).context("reading constants.json")?,
    )
    .context("parsing constants.json")?;

    let item_count = items_file.items.len();
    let mod_count = mods_file.mods.len();
    let catalog = Catalog::new(
        items_file.content_version,
        items_file.items,
        mods_file.mods,
        constants,
    );
    anyhow::ensure!(
        catalog.items.len() == item_count,
        "items.json defines the same item hash more than once"
    );
    anyhow::ensure!(
        catalog.mods.len() == mod_count,
        "mods.json defines the same mod hash more than once"
    );

    validate_content(&catalog);
    Ok(catalog)
}

/// Reads an inventory export: a JSON array of owned items.
pub fn load_inventory(path: &Path) -> Result<Vec<OwnedItem>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading inventory {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing inventory {}", path.display()))
}

pub fn load_request(path: &Path) -> Result<SearchRequest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading request {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing request {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lo_core::test_fixtures::{self as fx, base_catalog};
    use lo_core::{ItemHash, ModHash, Stat, StatVector};

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).expect("write fixture file");
    }

    fn write_content(dir: &Path, catalog: &Catalog) {
        let items: Vec<&ItemDef> = catalog.items.values().collect();
        let mods: Vec<&ModDef> = catalog.mods.values().collect();
        write(
            dir,
            "items.json",
            &serde_json::json!({ "content_version": catalog.content_version, "items": items })
                .to_string(),
        );
        write(
            dir,
            "mods.json",
            &serde_json::json!({ "mods": mods }).to_string(),
        );
        write(
            dir,
            "constants.json",
            &serde_json::to_string(&catalog.constants).expect("serialize constants"),
        );
    }

    #[test]
    fn test_valid_content_passes_validation() {
        validate_content(&base_catalog()); // should not panic
    }

    #[test]
    #[should_panic(expected = "no item definition for bucket class item")]
    fn test_missing_bucket_panics() {
        let mut catalog = base_catalog();
        catalog.items.remove(&fx::CLASS_ITEM);
        validate_content(&catalog);
    }

    #[test]
    #[should_panic(expected = "sockets, more than 16")]
    fn test_item_with_too_many_sockets_panics() {
        let mut catalog = base_catalog();
        let helmet = catalog.items.get_mut(&fx::HELMET).expect("fixture item");
        helmet.sockets = vec![SocketCategory::General; MAX_ITEM_SOCKETS + 1];
        validate_content(&catalog);
    }

    #[test]
    #[should_panic(expected = "no item carries")]
    fn test_activity_mod_without_socket_panics() {
        let mut catalog = base_catalog();
        catalog.items.remove(&fx::CHEST_RAID);
        validate_content(&catalog);
    }

    #[test]
    #[should_panic(expected = "no legs item has a bucket-specific socket")]
    fn test_bucket_mod_without_socket_panics() {
        let mut catalog = base_catalog();
        for def in catalog.items.values_mut() {
            if def.bucket == Bucket::Legs {
                def.sockets.retain(|s| *s != SocketCategory::BucketSpecific);
            }
        }
        let mut legs_mod = catalog.mods[&fx::HELMET_AMMO_FINDER].clone();
        legs_mod.hash = ModHash(9_000);
        legs_mod.category = ModCategory::BucketSpecific(Bucket::Legs);
        catalog.mods.insert(legs_mod.hash, legs_mod);
        validate_content(&catalog);
    }

    #[test]
    #[should_panic(expected = "must raise exactly one stat")]
    fn test_auto_mod_with_two_stats_panics() {
        let mut catalog = base_catalog();
        let def = catalog
            .mods
            .get_mut(&fx::major_mod(Stat::Mobility))
            .expect("fixture mod");
        def.stats = StatVector::from_pairs(&[(Stat::Mobility, 10), (Stat::Recovery, 5)]);
        validate_content(&catalog);
    }

    #[test]
    #[should_panic(expected = "more than max_item_energy")]
    fn test_overpriced_mod_panics() {
        let mut catalog = base_catalog();
        catalog
            .mods
            .get_mut(&fx::CHARGE_A)
            .expect("fixture mod")
            .energy_cost = 11;
        validate_content(&catalog);
    }

    #[test]
    fn test_load_content_round_trips_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = base_catalog();
        write_content(dir.path(), &catalog);

        let loaded = load_content(dir.path().to_str().expect("utf-8 path")).expect("load");
        assert_eq!(loaded.content_version, "test");
        assert_eq!(loaded.items.len(), catalog.items.len());
        assert_eq!(loaded.mods.len(), catalog.mods.len());
        assert_eq!(loaded.auto_mods().count(), 18);
        assert_eq!(
            loaded.item(fx::CHEST_RAID).map(|d| d.sockets.clone()),
            catalog.item(fx::CHEST_RAID).map(|d| d.sockets.clone())
        );
    }

    #[test]
    fn test_load_content_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_content(dir.path(), &base_catalog());
        std::fs::remove_file(dir.path().join("mods.json")).expect("remove");

        let err = load_content(dir.path().to_str().expect("utf-8 path")).unwrap_err();
        assert!(format!("{err:#}").contains("reading mods.json"), "{err:#}");
    }

    #[test]
    fn test_load_content_rejects_duplicate_hashes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = base_catalog();
        write_content(dir.path(), &catalog);
        let helmet = &catalog.items[&fx::HELMET];
        write(
            dir.path(),
            "items.json",
            &serde_json::json!({ "content_version": "dup", "items": [helmet, helmet] })
                .to_string(),
        );

        let err = load_content(dir.path().to_str().expect("utf-8 path")).unwrap_err();
        assert!(err.to_string().contains("more than once"), "{err:#}");
    }

    #[test]
    fn test_load_inventory_defaults_optional_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("inventory.json");
        write(
            dir.path(),
            "inventory.json",
            r#"[{ "id": 7, "hash": 1001, "stats": [10, 2, 2, 20, 2, 2], "energy_capacity": 8 }]"#,
        );

        let inventory = load_inventory(&path).expect("load");
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].hash, ItemHash(1001));
        assert!(!inventory[0].masterworked);
        assert!(inventory[0].plugged.is_empty());
        assert_eq!(inventory[0].stats.get(Stat::Discipline), 20);
    }

    #[test]
    fn test_load_request_parses_constraints() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("request.json");
        write(
            dir.path(),
            "request.json",
            r#"{
                "constraints": { "recovery": { "min": 7 }, "strength": { "ignored": true } },
                "pinned": { "Helmet": 3 },
                "exotic_lock": "AnyExotic"
            }"#,
        );

        let request = load_request(&path).expect("load");
        assert_eq!(request.constraint(Stat::Recovery).min, 7);
        assert_eq!(request.constraint(Stat::Recovery).max, 10);
        assert!(request.constraint(Stat::Strength).ignored);
        assert_eq!(request.stat_order, Stat::ALL.to_vec());
        assert_eq!(request.pinned[&Bucket::Helmet], lo_core::ItemId(3));
    }

    #[test]
    fn test_load_request_reports_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("request.json");
        write(dir.path(), "request.json", "{ not json");

        let err = load_request(&path).unwrap_err();
        assert!(err.to_string().contains("parsing request"), "{err:#}");
    }
}
