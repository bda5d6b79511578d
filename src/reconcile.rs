use crate::classify::{matching_rule, Category, Signals};
use crate::types::{MapLayers, ReconciledRegion, RegionGeometry, StatusRecord};
use geo::MultiPolygon;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Exact-match lookup from status-table spellings to geometry names.
pub struct NameReconciler<'a> {
    aliases: &'a HashMap<String, String>,
}

impl<'a> NameReconciler<'a> {
    pub fn new(aliases: &'a HashMap<String, String>) -> Self {
        Self { aliases }
    }

    pub fn resolve(&self, source_name: &str) -> Option<&'a str> {
        self.aliases
            .get(source_name)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// Joins status rows to geometry. Rows whose name does not resolve, or resolves to a
/// name absent from the geometry, are set aside rather than failing the run.
pub fn reconcile(
    aliases: &HashMap<String, String>,
    records: Vec<StatusRecord>,
    geometries: Vec<RegionGeometry>,
) -> MapLayers {
    let reconciler = NameReconciler::new(aliases);

    // Features sharing a name are merged into one multipolygon.
    let mut order: Vec<String> = Vec::new();
    let mut shapes: HashMap<String, MultiPolygon<f64>> = HashMap::new();
    for region in geometries {
        match shapes.get_mut(&region.region_name) {
            Some(existing) => existing.0.extend(region.geometry.0),
            None => {
                order.push(region.region_name.clone());
                shapes.insert(region.region_name, region.geometry);
            }
        }
    }

    let mut layers = MapLayers::default();
    let mut matched: Vec<bool> = vec![false; order.len()];
    let index: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    for record in records {
        let Some(canonical) = reconciler.resolve(&record.region_name) else {
            warn!("No alias for '{}', leaving it off the map", record.region_name);
            layers.excluded.push(record);
            continue;
        };
        let Some(&idx) = index.get(canonical) else {
            warn!(
                "'{}' maps to '{}', which is not in the geometry file",
                record.region_name, canonical
            );
            layers.excluded.push(record);
            continue;
        };

        matched[idx] = true;
        let signals = Signals::from_fields(
            &record.assembly_status,
            &record.council_status,
            &record.council_website_note,
        );
        let rule = matching_rule(&signals);
        let category = rule.map_or(Category::Other, |r| r.category);
        debug!(
            "{} -> {} ({})",
            record.region_name,
            category,
            rule.map_or("fallback", |r| r.name)
        );
        layers.regions.push(ReconciledRegion {
            canonical_name: canonical.to_string(),
            geometry: shapes[canonical].clone(),
            category,
            color: category.color(),
            record,
        });
    }

    for (name, was_matched) in order.into_iter().zip(matched) {
        if !was_matched {
            if let Some(geometry) = shapes.remove(&name) {
                layers.unmatched.push(RegionGeometry { region_name: name, geometry });
            }
        }
    }

    info!(
        "Matched {} regions, {} geometries without status, {} status rows excluded",
        layers.regions.len(),
        layers.unmatched.len(),
        layers.excluded.len()
    );

    layers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin_aliases;
    use geo::{polygon, Polygon};

    fn square(x: f64, y: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
        ]
    }

    fn geometry(name: &str, x: f64) -> RegionGeometry {
        RegionGeometry {
            region_name: name.to_string(),
            geometry: MultiPolygon::new(vec![square(x, 0.0)]),
        }
    }

    fn record(name: &str, assembly: &str) -> StatusRecord {
        StatusRecord {
            region_name: name.to_string(),
            assembly_status: assembly.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn resolve_is_exact_match() {
        let aliases = builtin_aliases();
        let reconciler = NameReconciler::new(&aliases);
        assert_eq!(reconciler.resolve("Union Territory of Ladakh"), Some("Ladakh"));
        assert_eq!(reconciler.resolve("ladakh"), None);
        assert_eq!(reconciler.resolve("Kerala "), None);
    }

    #[test]
    fn empty_alias_target_excludes_region() {
        let mut aliases = HashMap::new();
        aliases.insert("Ghost".to_string(), String::new());
        assert_eq!(NameReconciler::new(&aliases).resolve("Ghost"), None);
    }

    #[test]
    fn matched_rows_are_classified_and_unmatched_rows_excluded() {
        let aliases = builtin_aliases();
        let records = vec![
            record("Kerala", "Completed"),
            record("Union Territory of Ladakh", ""),
            record("Atlantis", "Started"),
            record("Goa", "Started"),
        ];
        let geometries = vec![
            geometry("Kerala", 0.0),
            geometry("Ladakh", 2.0),
            geometry("Lakshadweep", 4.0),
        ];

        let layers = reconcile(&aliases, records, geometries);

        let names: Vec<_> = layers.regions.iter().map(|r| r.canonical_name.as_str()).collect();
        assert_eq!(names, ["Kerala", "Ladakh"]);
        assert_eq!(layers.regions[0].category, Category::AssemblyCompleted);
        assert_eq!(layers.regions[0].color, Category::AssemblyCompleted.color());
        assert_eq!(layers.regions[1].category, Category::NoData);
        assert_eq!(layers.regions[1].record.region_name, "Union Territory of Ladakh");

        let unmatched: Vec<_> = layers.unmatched.iter().map(|g| g.region_name.as_str()).collect();
        assert_eq!(unmatched, ["Lakshadweep"]);

        // Atlantis has no alias; Goa's alias points at missing geometry.
        let excluded: Vec<_> = layers.excluded.iter().map(|r| r.region_name.as_str()).collect();
        assert_eq!(excluded, ["Atlantis", "Goa"]);
    }

    #[test]
    fn legacy_and_current_names_both_join() {
        let aliases = builtin_aliases();
        let records = vec![
            record("Jammu and Kashmir", "Completed"),
            record("Union Territory of Jammu and Kashmir", "Started"),
        ];
        let layers = reconcile(&aliases, records, vec![geometry("Jammu and Kashmir", 0.0)]);
        assert_eq!(layers.regions.len(), 2);
        assert!(layers.unmatched.is_empty());
    }

    #[test]
    fn same_named_features_are_merged() {
        let aliases = builtin_aliases();
        let geometries = vec![
            geometry("Puducherry", 0.0),
            geometry("Kerala", 5.0),
            geometry("Puducherry", 10.0),
        ];
        let layers = reconcile(&aliases, vec![record("Puducherry", "")], geometries);
        assert_eq!(layers.regions.len(), 1);
        assert_eq!(layers.regions[0].geometry.0.len(), 2);
        assert_eq!(layers.unmatched.len(), 1);
        assert_eq!(layers.unmatched[0].region_name, "Kerala");
    }
}
