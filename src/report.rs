use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::Serialize;
use uuid::Uuid;

use crate::dashboard::{format_population_millions, DashboardStats};
use crate::models::{Category, CrisisRecord, FilterCriteria, Severity, Trend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Markdown,
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

pub fn export_filename(format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "ethron-crisis-report-{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: Category,
    pub count: usize,
    pub avg_confidence: f64,
}

/// Everything a report is rendered from: the filtered view and the
/// selected crisis, with its related crises already resolved.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub criteria: &'a FilterCriteria,
    pub crises: &'a [&'a CrisisRecord],
    pub selected: Option<&'a CrisisRecord>,
    pub related: Vec<&'a CrisisRecord>,
    pub generated_at: DateTime<Utc>,
}

pub fn summarize_by_category(crises: &[&CrisisRecord]) -> Vec<CategorySummary> {
    let mut map: HashMap<Category, (usize, u32)> = HashMap::new();

    for crisis in crises {
        let Some(category) = crisis.category else {
            continue;
        };
        let entry = map.entry(category).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += u32::from(crisis.confidence);
    }

    let mut summaries: Vec<CategorySummary> = map
        .into_iter()
        .map(|(category, (count, total_confidence))| CategorySummary {
            category,
            count,
            avg_confidence: if count == 0 {
                0.0
            } else {
                f64::from(total_confidence) / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then(a.category.cmp(&b.category)));
    summaries
}

pub fn build_report(input: &ReportInput<'_>) -> String {
    let summaries = summarize_by_category(input.crises);
    let stats = DashboardStats::compute(input.crises.iter().copied());

    let mut output = String::new();

    let _ = writeln!(output, "# Crisis Intelligence Report");
    let _ = writeln!(
        output,
        "Generated {} ({})",
        input.generated_at.format("%Y-%m-%d %H:%M UTC"),
        input.criteria.summary()
    );
    let _ = writeln!(
        output,
        "{} crises tracked, {} active, {} people affected",
        stats.total,
        stats.active,
        stats.affected_label()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No crises match the current filters.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} crises (avg confidence {:.1}%)",
                summary.category, summary.count, summary.avg_confidence
            );
        }
    }

    let mut by_severity = input.crises.to_vec();
    by_severity.sort_by(|a, b| b.severity.cmp(&a.severity));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Severity");

    if by_severity.is_empty() {
        let _ = writeln!(output, "No crises match the current filters.");
    } else {
        for crisis in by_severity.iter().take(5) {
            let _ = writeln!(
                output,
                "- [{}] {} ({}), {} affected, trend {}",
                crisis.severity_label(),
                crisis.title,
                crisis.place_label(),
                format_population_millions(crisis.affected_population),
                crisis.trend_label()
            );
        }
    }

    if let Some(selected) = input.selected {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Selected Crisis: {}", selected.title);
        let _ = writeln!(
            output,
            "{} | {} | confidence {}% | {}",
            selected.place_label(),
            selected.severity_label(),
            selected.confidence,
            selected.timeframe
        );
        let _ = writeln!(output);
        let _ = writeln!(output, "{}", selected.description);
        let _ = writeln!(output);
        let _ = writeln!(output, "Predicted impact: {}", selected.predicted_impact);
        if !selected.sources.is_empty() {
            let _ = writeln!(output, "Sources: {}", selected.sources.join(", "));
        }
        if !input.related.is_empty() {
            let _ = writeln!(output, "Related:");
            for related in &input.related {
                let _ = writeln!(output, "- {} ({})", related.title, related.id);
            }
        }
    }

    output
}

#[derive(Serialize)]
struct JsonExport<'a> {
    report_id: Uuid,
    generated_at: DateTime<Utc>,
    criteria: &'a FilterCriteria,
    selected: Option<&'a str>,
    crises: &'a [&'a CrisisRecord],
}

// Same columns the CSV loader reads.
#[derive(Serialize)]
struct CsvExportRow<'a> {
    id: &'a str,
    title: &'a str,
    category: Option<Category>,
    severity: Option<Severity>,
    country: Option<&'a str>,
    region: Option<&'a str>,
    longitude: f64,
    latitude: f64,
    confidence: u8,
    description: &'a str,
    predicted_impact: &'a str,
    timeframe: &'a str,
    affected_population: u64,
    sources: String,
    last_updated: DateTime<Utc>,
    trend: Option<Trend>,
    related_crises: String,
}

pub fn render(format: ExportFormat, input: &ReportInput<'_>) -> anyhow::Result<String> {
    match format {
        ExportFormat::Markdown => Ok(build_report(input)),
        ExportFormat::Json => {
            let export = JsonExport {
                report_id: Uuid::new_v4(),
                generated_at: input.generated_at,
                criteria: input.criteria,
                selected: input.selected.map(|crisis| crisis.id.as_str()),
                crises: input.crises,
            };
            Ok(serde_json::to_string_pretty(&export)?)
        }
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for crisis in input.crises {
                writer.serialize(CsvExportRow {
                    id: &crisis.id,
                    title: &crisis.title,
                    category: crisis.category,
                    severity: crisis.severity,
                    country: crisis.country(),
                    region: crisis.region(),
                    longitude: crisis.location.coordinates.0,
                    latitude: crisis.location.coordinates.1,
                    confidence: crisis.confidence,
                    description: &crisis.description,
                    predicted_impact: &crisis.predicted_impact,
                    timeframe: &crisis.timeframe,
                    affected_population: crisis.affected_population,
                    sources: join_list(&crisis.id, "sources", &crisis.sources)?,
                    last_updated: crisis.last_updated,
                    trend: crisis.trend,
                    related_crises: join_list(
                        &crisis.id,
                        "related_crises",
                        &crisis.related_crises,
                    )?,
                })?;
            }
            let bytes = writer.into_inner().map_err(|err| err.into_error())?;
            Ok(String::from_utf8(bytes)?)
        }
    }
}

// The loader splits list cells on `;`, so an item containing one would
// not survive the round trip.
const LIST_SEPARATOR: &str = ";";

fn join_list(id: &str, column: &str, items: &[String]) -> anyhow::Result<String> {
    if let Some(item) = items.iter().find(|item| item.contains(LIST_SEPARATOR)) {
        anyhow::bail!(
            "crisis {id}: {column} entry {item:?} contains the CSV list separator `{LIST_SEPARATOR}`"
        );
    }
    Ok(items.join(LIST_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::filter::apply_filters;
    use crate::store::CrisisStore;

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 16, 9, 0, 0).unwrap()
    }

    #[test]
    fn filename_carries_date_and_extension() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
        assert_eq!(
            export_filename(ExportFormat::Csv, date),
            "ethron-crisis-report-2025-01-16.csv"
        );
        assert_eq!(
            export_filename(ExportFormat::Markdown, date),
            "ethron-crisis-report-2025-01-16.md"
        );
    }

    #[test]
    fn category_mix_sorts_by_count() {
        let store = CrisisStore::builtin();
        let crises = apply_filters(store.records(), &FilterCriteria::default());
        let mut with_duplicate = crises.clone();
        with_duplicate.push(store.get("c002").unwrap());

        let summaries = summarize_by_category(&with_duplicate);
        assert_eq!(summaries[0].category, Category::Climate);
        assert_eq!(summaries[0].count, 2);
        assert!((summaries[0].avg_confidence - 89.0).abs() < 0.001);
        assert_eq!(summaries.len(), 6);
    }

    #[test]
    fn report_includes_selected_crisis_and_related() {
        let store = CrisisStore::builtin();
        let criteria = FilterCriteria::default();
        let crises = apply_filters(store.records(), &criteria);
        let selected = store.get("c001").unwrap();

        let input = ReportInput {
            criteria: &criteria,
            crises: &crises,
            selected: Some(selected),
            related: store.related(selected),
            generated_at: generated_at(),
        };
        let report = build_report(&input);

        assert!(report.starts_with(
            "# Crisis Intelligence Report\nGenerated 2025-01-16 09:00 UTC (no filters)"
        ));
        assert!(report.contains("6 crises tracked, 3 active, 28M people affected"));
        assert!(report.contains("## Selected Crisis: Food Security Crisis in East Africa"));
        assert!(report.contains("- Extreme Weather Pattern Shift (c002)"));
        assert!(!report.contains("c008"));
    }

    #[test]
    fn report_for_empty_view_says_so() {
        let store = CrisisStore::builtin();
        let mut criteria = FilterCriteria::default();
        criteria.toggle_severity(Severity::Low);
        let crises = apply_filters(store.records(), &criteria);

        let input = ReportInput {
            criteria: &criteria,
            crises: &crises,
            selected: None,
            related: Vec::new(),
            generated_at: generated_at(),
        };
        let report = build_report(&input);
        assert!(report.contains("No crises match the current filters."));
        assert!(!report.contains("## Selected Crisis"));
    }

    #[test]
    fn json_export_names_selection() {
        let store = CrisisStore::builtin();
        let criteria = FilterCriteria::default();
        let crises = apply_filters(store.records(), &criteria);

        let input = ReportInput {
            criteria: &criteria,
            crises: &crises,
            selected: store.get("c005"),
            related: Vec::new(),
            generated_at: generated_at(),
        };
        let json = render(ExportFormat::Json, &input).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["selected"], "c005");
        assert_eq!(value["crises"].as_array().unwrap().len(), 6);
        assert_eq!(value["crises"][0]["category"], "food-security");
    }

    #[test]
    fn csv_export_loads_back_into_a_store() {
        let store = CrisisStore::builtin();
        let criteria = FilterCriteria::default();
        let crises = apply_filters(store.records(), &criteria);
        let input = ReportInput {
            criteria: &criteria,
            crises: &crises,
            selected: None,
            related: Vec::new(),
            generated_at: generated_at(),
        };

        let csv = render(ExportFormat::Csv, &input).unwrap();
        let reloaded = CrisisStore::load_csv(csv.as_bytes()).unwrap();
        assert_eq!(reloaded.records(), store.records());
    }

    #[test]
    fn csv_export_keeps_unset_fields_unset() {
        let mut records = CrisisStore::builtin().records().to_vec();
        records[1].trend = None;
        records[1].severity = None;
        let criteria = FilterCriteria::default();
        let crises: Vec<&CrisisRecord> = records.iter().collect();
        let input = ReportInput {
            criteria: &criteria,
            crises: &crises,
            selected: Some(&records[1]),
            related: Vec::new(),
            generated_at: generated_at(),
        };

        let csv = render(ExportFormat::Csv, &input).unwrap();
        let reloaded = CrisisStore::load_csv(csv.as_bytes()).unwrap();
        assert_eq!(reloaded.records(), &records[..]);

        let report = build_report(&input);
        assert!(report.contains("India, South Asia | unknown | confidence 89%"));
        assert!(report.contains("6 crises tracked, 2 active"));
    }

    #[test]
    fn csv_export_rejects_list_items_containing_the_separator() {
        let mut records = CrisisStore::builtin().records().to_vec();
        records[2].sources.push("WHO; regional office".to_string());
        let criteria = FilterCriteria::default();
        let crises: Vec<&CrisisRecord> = records.iter().collect();
        let input = ReportInput {
            criteria: &criteria,
            crises: &crises,
            selected: None,
            related: Vec::new(),
            generated_at: generated_at(),
        };

        let err = render(ExportFormat::Csv, &input).unwrap_err();
        assert!(err.to_string().contains("c003"), "{err}");
        assert!(render(ExportFormat::Json, &input).is_ok());
    }
}
