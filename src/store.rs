use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Category, CrisisRecord, Location, Severity, Trend};

/// Immutable collection of crisis records, loaded once at startup.
#[derive(Debug, Clone)]
pub struct CrisisStore {
    records: Vec<CrisisRecord>,
    index: HashMap<String, usize>,
}

impl CrisisStore {
    /// Validates identifiers and confidence scores, keeping input order.
    pub fn from_records(records: Vec<CrisisRecord>) -> Result<Self, StoreError> {
        let mut index = HashMap::with_capacity(records.len());

        for (position, record) in records.iter().enumerate() {
            if record.id.trim().is_empty() {
                return Err(StoreError::EmptyId(record.title.clone()));
            }
            if record.confidence > 100 {
                return Err(StoreError::ConfidenceOutOfRange {
                    id: record.id.clone(),
                    value: record.confidence,
                });
            }
            if index.insert(record.id.clone(), position).is_some() {
                return Err(StoreError::DuplicateId(record.id.clone()));
            }
        }

        debug!(count = records.len(), "crisis store built");
        Ok(Self { records, index })
    }

    /// The seed collection shipped with the console.
    pub fn builtin() -> Self {
        let records = seed_records();
        let index = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.id.clone(), position))
            .collect();
        Self { records, index }
    }

    pub fn load_path(path: &Path) -> Result<Self, StoreError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let reader = || -> Result<BufReader<File>, StoreError> {
            Ok(BufReader::new(File::open(path)?))
        };

        let store = match extension.as_deref() {
            Some("json") => Self::load_json(reader()?)?,
            Some("csv") => Self::load_csv(reader()?)?,
            _ => return Err(StoreError::UnsupportedFormat(path.to_path_buf())),
        };

        info!(path = %path.display(), count = store.len(), "loaded crisis data");
        Ok(store)
    }

    /// Reads a JSON array of crisis records.
    pub fn load_json<R: Read>(reader: R) -> Result<Self, StoreError> {
        let records: Vec<CrisisRecord> = serde_json::from_reader(reader)?;
        Self::from_records(records)
    }

    /// Reads flat CSV rows; list columns are `;`-separated and a blank id
    /// gets a generated `import-` identifier. A source or related id can
    /// therefore never contain `;` itself, and the CSV export refuses to
    /// write one. Blank severity, category and trend cells load as unset.
    pub fn load_csv<R: Read>(reader: R) -> Result<Self, StoreError> {
        #[derive(serde::Deserialize)]
        struct CsvRow {
            id: Option<String>,
            title: String,
            category: Option<Category>,
            severity: Option<Severity>,
            country: Option<String>,
            region: Option<String>,
            longitude: f64,
            latitude: f64,
            confidence: u8,
            description: Option<String>,
            predicted_impact: Option<String>,
            timeframe: Option<String>,
            affected_population: u64,
            sources: Option<String>,
            last_updated: DateTime<Utc>,
            trend: Option<Trend>,
            related_crises: Option<String>,
        }

        let mut reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in reader.deserialize::<CsvRow>() {
            let row = result?;
            let id = row
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

            records.push(CrisisRecord {
                id,
                title: row.title,
                category: row.category,
                severity: row.severity,
                location: Location {
                    country: row.country,
                    region: row.region,
                    coordinates: (row.longitude, row.latitude),
                },
                confidence: row.confidence,
                description: row.description.unwrap_or_default(),
                predicted_impact: row.predicted_impact.unwrap_or_default(),
                timeframe: row.timeframe.unwrap_or_default(),
                affected_population: row.affected_population,
                sources: split_list(row.sources.as_deref()),
                last_updated: row.last_updated,
                trend: row.trend,
                related_crises: split_list(row.related_crises.as_deref()),
            });
        }

        Self::from_records(records)
    }

    pub fn records(&self) -> &[CrisisRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CrisisRecord> {
        self.index.get(id).map(|&position| &self.records[position])
    }

    /// Related crises that exist in the store, in listed order. Dangling
    /// ids are skipped.
    pub fn related<'a>(&'a self, record: &CrisisRecord) -> Vec<&'a CrisisRecord> {
        record
            .related_crises
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn seed_time(hour: u32, minute: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2025, 1, 15)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn seed_records() -> Vec<CrisisRecord> {
    vec![
        CrisisRecord {
            id: "c001".to_string(),
            title: "Food Security Crisis in East Africa".to_string(),
            category: Some(Category::FoodSecurity),
            severity: Some(Severity::Critical),
            location: Location {
                country: Some("Kenya".to_string()),
                region: Some("East Africa".to_string()),
                coordinates: (37.9062, -0.0236),
            },
            confidence: 94,
            description: "Severe drought conditions combined with locust swarms affecting crop yields across multiple districts.".to_string(),
            predicted_impact: "Up to 2.1M people may face acute food insecurity within 3 months".to_string(),
            timeframe: "2-3 months".to_string(),
            affected_population: 850_000,
            sources: strings(&["FAO", "World Food Programme", "Local Agricultural Reports"]),
            last_updated: seed_time(10, 30),
            trend: Some(Trend::Worsening),
            related_crises: strings(&["c002", "c008"]),
        },
        CrisisRecord {
            id: "c002".to_string(),
            title: "Extreme Weather Pattern Shift".to_string(),
            category: Some(Category::Climate),
            severity: Some(Severity::High),
            location: Location {
                country: Some("India".to_string()),
                region: Some("South Asia".to_string()),
                coordinates: (77.1025, 28.7041),
            },
            confidence: 89,
            description: "Unusual monsoon patterns detected, potentially affecting agricultural seasons.".to_string(),
            predicted_impact: "Agricultural disruption affecting 15M farmers".to_string(),
            timeframe: "1-6 months".to_string(),
            affected_population: 15_000_000,
            sources: strings(&["NASA Weather Data", "Indian Meteorological Department"]),
            last_updated: seed_time(8, 15),
            trend: Some(Trend::Stable),
            related_crises: strings(&["c001"]),
        },
        CrisisRecord {
            id: "c003".to_string(),
            title: "Healthcare System Strain".to_string(),
            category: Some(Category::Health),
            severity: Some(Severity::Medium),
            location: Location {
                country: Some("Brazil".to_string()),
                region: Some("South America".to_string()),
                coordinates: (-47.8825, -15.7942),
            },
            confidence: 76,
            description: "Rising respiratory illness cases overwhelming regional healthcare capacity.".to_string(),
            predicted_impact: "Healthcare system may reach capacity within 4-6 weeks".to_string(),
            timeframe: "4-6 weeks".to_string(),
            affected_population: 2_300_000,
            sources: strings(&["WHO", "Brazilian Health Ministry", "Hospital Networks"]),
            last_updated: seed_time(6, 45),
            trend: Some(Trend::Improving),
            related_crises: Vec::new(),
        },
        CrisisRecord {
            id: "c004".to_string(),
            title: "Economic Instability Indicators".to_string(),
            category: Some(Category::Economic),
            severity: Some(Severity::Medium),
            location: Location {
                country: Some("Argentina".to_string()),
                region: Some("South America".to_string()),
                coordinates: (-58.3816, -34.6037),
            },
            confidence: 82,
            description: "Currency volatility and inflation patterns suggesting economic stress.".to_string(),
            predicted_impact: "Potential social unrest due to economic pressures".to_string(),
            timeframe: "2-4 months".to_string(),
            affected_population: 5_500_000,
            sources: strings(&["IMF", "Central Bank Data", "Economic Indicators"]),
            last_updated: seed_time(12, 20),
            trend: Some(Trend::Worsening),
            related_crises: strings(&["c005"]),
        },
        CrisisRecord {
            id: "c005".to_string(),
            title: "Social Unrest Risk Assessment".to_string(),
            category: Some(Category::SocialUnrest),
            severity: Some(Severity::High),
            location: Location {
                country: Some("France".to_string()),
                region: Some("Western Europe".to_string()),
                coordinates: (2.3522, 48.8566),
            },
            confidence: 71,
            description: "Social media sentiment analysis indicates rising tension over economic policies.".to_string(),
            predicted_impact: "Potential large-scale protests and civil disruption".to_string(),
            timeframe: "2-3 weeks".to_string(),
            affected_population: 1_200_000,
            sources: strings(&["Social Media Analytics", "News Sentiment", "Police Reports"]),
            last_updated: seed_time(14, 10),
            trend: Some(Trend::Stable),
            related_crises: strings(&["c004"]),
        },
        CrisisRecord {
            id: "c006".to_string(),
            title: "Education System Disruption".to_string(),
            category: Some(Category::Education),
            severity: Some(Severity::Medium),
            location: Location {
                country: Some("Nigeria".to_string()),
                region: Some("West Africa".to_string()),
                coordinates: (7.3986, 9.0579),
            },
            confidence: 68,
            description: "Teacher strikes and infrastructure issues affecting educational access.".to_string(),
            predicted_impact: "Learning loss for 3.2M students across affected regions".to_string(),
            timeframe: "3-6 months".to_string(),
            affected_population: 3_200_000,
            sources: strings(&["Education Ministry", "Teacher Unions", "UNICEF Reports"]),
            last_updated: seed_time(9, 30),
            trend: Some(Trend::Improving),
            related_crises: Vec::new(),
        },
    ]
}
