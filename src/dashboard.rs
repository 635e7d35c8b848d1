use serde::Serialize;

use crate::models::{Category, CrisisRecord, Severity};

/// Headline figures for the left-hand dashboard, computed over the
/// filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    /// High and critical crises.
    pub active: usize,
    pub affected_population: u64,
    /// Highest severity first.
    pub by_severity: Vec<(Severity, usize)>,
    /// Categories in first-seen order.
    pub by_category: Vec<(Category, usize)>,
}

impl DashboardStats {
    pub fn compute<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a CrisisRecord>,
    {
        let mut stats = DashboardStats {
            total: 0,
            active: 0,
            affected_population: 0,
            by_severity: Severity::ALL.iter().rev().map(|&s| (s, 0)).collect(),
            by_category: Vec::new(),
        };

        for record in records {
            stats.total += 1;
            if record.severity.is_some_and(Severity::is_active) {
                stats.active += 1;
            }
            stats.affected_population = stats
                .affected_population
                .saturating_add(record.affected_population);

            if let Some(entry) = stats
                .by_severity
                .iter_mut()
                .find(|(severity, _)| Some(*severity) == record.severity)
            {
                entry.1 += 1;
            }
            let Some(category) = record.category else {
                continue;
            };
            match stats.by_category.iter_mut().find(|(seen, _)| *seen == category) {
                Some(entry) => entry.1 += 1,
                None => stats.by_category.push((category, 1)),
            }
        }

        stats
    }

    /// People affected in whole millions, e.g. `"28M"`.
    pub fn affected_label(&self) -> String {
        format!("{}M", (self.affected_population as f64 / 1_000_000.0).round())
    }
}

/// Detail-panel population figure with one decimal, e.g. `"2.3M"`.
pub fn format_population_millions(population: u64) -> String {
    format!("{:.1}M", population as f64 / 1_000_000.0)
}

/// Marker placement on the equirectangular world map, in percent of
/// the map's width and height.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub left: f64,
    pub top: f64,
    pub severity: Option<Severity>,
    pub selected: bool,
    pub z_index: u8,
}

pub fn project(longitude: f64, latitude: f64) -> (f64, f64) {
    let left = ((longitude + 180.0) / 360.0 * 100.0).clamp(5.0, 95.0);
    let top = ((90.0 - latitude) / 180.0 * 100.0).clamp(10.0, 90.0);
    (left, top)
}

pub fn map_markers<'a, I>(records: I, selected_id: Option<&str>) -> Vec<MapMarker>
where
    I: IntoIterator<Item = &'a CrisisRecord>,
{
    records
        .into_iter()
        .map(|record| {
            let (longitude, latitude) = record.location.coordinates;
            let (left, top) = project(longitude, latitude);
            let selected = selected_id == Some(record.id.as_str());
            MapMarker {
                id: record.id.clone(),
                left,
                top,
                severity: record.severity,
                selected,
                z_index: if selected { 30 } else { 20 },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CrisisStore;

    #[test]
    fn stats_over_builtin_store() {
        let store = CrisisStore::builtin();
        let stats = DashboardStats::compute(store.records());

        assert_eq!(stats.total, 6);
        assert_eq!(stats.active, 3);
        assert_eq!(stats.affected_population, 28_050_000);
        assert_eq!(stats.affected_label(), "28M");
        assert_eq!(
            stats.by_severity,
            vec![
                (Severity::Critical, 1),
                (Severity::High, 2),
                (Severity::Medium, 3),
                (Severity::Low, 0),
            ]
        );
        assert_eq!(stats.by_category[0], (Category::FoodSecurity, 1));
    }

    #[test]
    fn stats_of_nothing_are_zero() {
        let empty: Vec<CrisisRecord> = Vec::new();
        let stats = DashboardStats::compute(&empty);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.affected_label(), "0M");
        assert!(stats.by_category.is_empty());
    }

    #[test]
    fn unset_severity_and_category_are_left_out_of_the_breakdowns() {
        let mut records = CrisisStore::builtin().records().to_vec();
        records[0].severity = None;
        records[0].category = None;

        let stats = DashboardStats::compute(&records);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.by_severity[0], (Severity::Critical, 0));
        assert_eq!(stats.by_category.len(), 5);
        assert!(stats
            .by_category
            .iter()
            .all(|(category, _)| *category != Category::FoodSecurity));
    }

    #[test]
    fn stats_serialize_for_json_output() {
        let stats = DashboardStats::compute(CrisisStore::builtin().records());
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["total"], 6);
        assert_eq!(value["by_severity"][0], serde_json::json!(["critical", 1]));
        assert_eq!(value["by_category"][0], serde_json::json!(["food-security", 1]));
    }

    #[test]
    fn population_uses_one_decimal() {
        assert_eq!(format_population_millions(2_300_000), "2.3M");
        assert_eq!(format_population_millions(15_000_000), "15.0M");
    }

    #[test]
    fn projection_clamps_to_map_edges() {
        assert_eq!(project(0.0, 0.0), (50.0, 50.0));
        assert_eq!(project(-180.0, 90.0), (5.0, 10.0));
        assert_eq!(project(180.0, -90.0), (95.0, 90.0));
    }

    #[test]
    fn selected_marker_is_raised() {
        let store = CrisisStore::builtin();
        let markers = map_markers(store.records(), Some("c002"));
        assert_eq!(markers.len(), 6);

        let raised: Vec<&str> = markers
            .iter()
            .filter(|m| m.z_index == 30)
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(raised, vec!["c002"]);
        assert!(markers.iter().all(|m| (5.0..=95.0).contains(&m.left)));
    }
}
