//! Catalog search for line item autocomplete, plus the bundled catalog.

use std::cmp::Ordering;

use serde::de::Error as _;
use serde::Deserialize;

use crate::model::{CatalogItem, CatalogType};

pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_RESULTS: usize = 20;

const BUILTIN_CATALOG_YAML: &str = include_str!("../data/builtin_catalog.yaml");
const CATALOG_FILE_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: u32,
    #[serde(default)]
    items: Vec<CatalogItem>,
}

/// Entries shipped with the tool, all flagged `is_built_in`.
pub fn builtin_catalog() -> Result<Vec<CatalogItem>, serde_yaml::Error> {
    parse_catalog_file(BUILTIN_CATALOG_YAML)
}

fn parse_catalog_file(yaml: &str) -> Result<Vec<CatalogItem>, serde_yaml::Error> {
    let file: CatalogFile = serde_yaml::from_str(yaml)?;
    if file.version != CATALOG_FILE_VERSION {
        return Err(serde_yaml::Error::custom(format!(
            "unsupported catalog version {}",
            file.version
        )));
    }
    Ok(file
        .items
        .into_iter()
        .map(|mut item| {
            item.is_built_in = true;
            item
        })
        .collect())
}

pub fn catalog_by_type(items: &[CatalogItem], catalog_type: CatalogType) -> Vec<CatalogItem> {
    items
        .iter()
        .filter(|item| item.catalog_type == catalog_type)
        .cloned()
        .collect()
}

fn searchable_text(item: &CatalogItem) -> String {
    let mut parts = Vec::with_capacity(item.tags.len() + 2);
    parts.push(item.name.as_str());
    parts.push(item.description.as_str());
    parts.extend(item.tags.iter().map(String::as_str));
    parts.join(" ").to_lowercase()
}

/// Every whitespace token of the query must occur somewhere in
/// name + description + tags. Names starting with the whole query rank
/// first, then alphabetical by name.
pub fn filter_catalog<'a>(
    items: &'a [CatalogItem],
    query: &str,
    catalog_type: Option<CatalogType>,
) -> Vec<&'a CatalogItem> {
    let normalized = query.trim().to_lowercase();
    if normalized.chars().count() < MIN_QUERY_LEN {
        return Vec::new();
    }
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    let mut matched: Vec<(&CatalogItem, String, bool)> = items
        .iter()
        .filter(|item| catalog_type.map_or(true, |t| item.catalog_type == t))
        .filter(|item| {
            let text = searchable_text(item);
            tokens.iter().all(|token| text.contains(token))
        })
        .map(|item| {
            let name = item.name.to_lowercase();
            let prefix = name.starts_with(&normalized);
            (item, name, prefix)
        })
        .collect();

    matched.sort_by(|a, b| match (a.2, b.2) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.1.cmp(&b.1),
    });

    matched
        .into_iter()
        .take(MAX_RESULTS)
        .map(|(item, _, _)| item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineItemCategory;
    use rust_decimal::Decimal;

    fn entry(name: &str, catalog_type: CatalogType, tags: &[&str]) -> CatalogItem {
        CatalogItem {
            id: name.to_lowercase().replace(' ', "-"),
            catalog_type,
            category: LineItemCategory::Planting,
            name: name.to_string(),
            description: String::new(),
            default_unit: "ea".into(),
            default_unit_price: Decimal::ZERO,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            is_built_in: false,
        }
    }

    #[test]
    fn tokens_match_in_any_order() {
        let items = vec![entry("Japanese Maple", CatalogType::Plant, &[])];
        assert_eq!(filter_catalog(&items, "jap map", None).len(), 1);
        assert_eq!(filter_catalog(&items, "map jap", None).len(), 1);
        assert!(filter_catalog(&items, "jap oak", None).is_empty());
    }

    #[test]
    fn short_queries_return_nothing() {
        let items = vec![entry("Agave", CatalogType::Plant, &[])];
        assert!(filter_catalog(&items, "a", None).is_empty());
        assert!(filter_catalog(&items, "  a ", None).is_empty());
        assert_eq!(filter_catalog(&items, "ag", None).len(), 1);
    }

    #[test]
    fn tags_and_type_filter_apply() {
        let items = vec![
            entry("Decomposed Granite", CatalogType::Material, &["gravel", "path"]),
            entry("Gravel Delivery", CatalogType::Service, &[]),
        ];
        let all = filter_catalog(&items, "gravel", None);
        assert_eq!(all.len(), 2);
        let materials = filter_catalog(&items, "gravel", Some(CatalogType::Material));
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].name, "Decomposed Granite");
    }

    #[test]
    fn prefix_matches_rank_first_then_alphabetical() {
        let items = vec![
            entry("Salvia leucantha", CatalogType::Plant, &["sage"]),
            entry("Autumn Sage", CatalogType::Plant, &[]),
            entry("Sage, Cleveland", CatalogType::Plant, &[]),
            entry("bee sage", CatalogType::Plant, &[]),
        ];
        let names: Vec<_> = filter_catalog(&items, "sage", None)
            .into_iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Sage, Cleveland", "Autumn Sage", "bee sage", "Salvia leucantha"]
        );
    }

    #[test]
    fn results_are_capped() {
        let items: Vec<_> = (0..30)
            .map(|i| entry(&format!("Rose {i:02}"), CatalogType::Plant, &[]))
            .collect();
        assert_eq!(filter_catalog(&items, "rose", None).len(), MAX_RESULTS);
    }

    #[test]
    fn builtin_catalog_parses_and_covers_every_type() {
        let items = builtin_catalog().expect("bundled catalog parses");
        assert!(items.iter().all(|i| i.is_built_in));
        for t in CatalogType::ALL {
            assert!(!catalog_by_type(&items, t).is_empty(), "no {t:?} entries");
        }
        let hits = filter_catalog(&items, "jap map", Some(CatalogType::Plant));
        assert!(!hits.is_empty());
    }

    #[test]
    fn unknown_catalog_version_is_rejected() {
        let err = parse_catalog_file("version: 2\nitems: []\n").expect_err("version 2");
        assert!(err.to_string().contains("unsupported catalog version 2"));
        assert!(parse_catalog_file("version: 1\nitems: []\n")
            .expect("version 1")
            .is_empty());
    }
}
