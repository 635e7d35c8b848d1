use std::borrow::Borrow;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{Category, CrisisRecord, FilterCriteria, Severity, Trend};

/// Stable filter: keeps every record that satisfies all active
/// dimensions of `criteria`, in input order.
pub fn apply_filters<'a, I>(records: I, criteria: &FilterCriteria) -> Vec<&'a CrisisRecord>
where
    I: IntoIterator<Item = &'a CrisisRecord>,
{
    let search = criteria.search.to_lowercase();
    records
        .into_iter()
        .filter(|record| matches_lowered(record, criteria, &search))
        .collect()
}

pub fn matches(record: &CrisisRecord, criteria: &FilterCriteria) -> bool {
    matches_lowered(record, criteria, &criteria.search.to_lowercase())
}

fn matches_lowered(record: &CrisisRecord, criteria: &FilterCriteria, search: &str) -> bool {
    accepts(&criteria.severities, record.severity.as_ref())
        && accepts(&criteria.categories, record.category.as_ref())
        && accepts(&criteria.trends, record.trend.as_ref())
        && accepts(&criteria.regions, record.region())
        && (search.is_empty() || text_matches(record, search))
}

// A record missing the field fails any non-empty restriction on it.
fn accepts<T, Q>(set: &BTreeSet<T>, value: Option<&Q>) -> bool
where
    T: Borrow<Q> + Ord,
    Q: Ord + ?Sized,
{
    set.is_empty() || value.is_some_and(|value| set.contains(value))
}

fn text_matches(record: &CrisisRecord, search: &str) -> bool {
    [
        Some(record.title.as_str()),
        Some(record.description.as_str()),
        record.country(),
        record.region(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(search))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetEntry<T> {
    pub value: T,
    pub count: usize,
    pub checked: bool,
}

/// Checkbox listing for the filter panel. Counts are over the full
/// collection; `showing` is the size of the filtered view.
#[derive(Debug, Clone, Serialize)]
pub struct Facets {
    pub severities: Vec<FacetEntry<Severity>>,
    pub categories: Vec<FacetEntry<Category>>,
    pub regions: Vec<FacetEntry<String>>,
    pub trends: Vec<FacetEntry<Trend>>,
    pub showing: usize,
    pub total: usize,
}

pub fn facets(records: &[CrisisRecord], criteria: &FilterCriteria) -> Facets {
    let severities = Severity::ALL
        .iter()
        .map(|&severity| FacetEntry {
            value: severity,
            count: records.iter().filter(|r| r.severity == Some(severity)).count(),
            checked: criteria.severities.contains(&severity),
        })
        .collect();

    let trends = Trend::ALL
        .iter()
        .map(|&trend| FacetEntry {
            value: trend,
            count: records.iter().filter(|r| r.trend == Some(trend)).count(),
            checked: criteria.trends.contains(&trend),
        })
        .collect();

    let mut categories: Vec<FacetEntry<Category>> = Vec::new();
    let mut regions: Vec<FacetEntry<String>> = Vec::new();

    for record in records {
        if let Some(category) = record.category {
            match categories.iter_mut().find(|e| e.value == category) {
                Some(entry) => entry.count += 1,
                None => categories.push(FacetEntry {
                    value: category,
                    count: 1,
                    checked: criteria.categories.contains(&category),
                }),
            }
        }

        if let Some(region) = record.region() {
            match regions.iter_mut().find(|e| e.value == region) {
                Some(entry) => entry.count += 1,
                None => regions.push(FacetEntry {
                    value: region.to_string(),
                    count: 1,
                    checked: criteria.regions.contains(region),
                }),
            }
        }
    }

    Facets {
        severities,
        categories,
        regions,
        trends,
        showing: apply_filters(records, criteria).len(),
        total: records.len(),
    }
}
