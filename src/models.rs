use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// High and critical crises count as active on the dashboard.
    pub fn is_active(self) -> bool {
        self >= Severity::High
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    FoodSecurity,
    Climate,
    Health,
    Economic,
    SocialUnrest,
    Education,
    Energy,
    Migration,
    Security,
    Infrastructure,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::FoodSecurity => "food-security",
            Category::Climate => "climate",
            Category::Health => "health",
            Category::Economic => "economic",
            Category::SocialUnrest => "social-unrest",
            Category::Education => "education",
            Category::Energy => "energy",
            Category::Migration => "migration",
            Category::Security => "security",
            Category::Infrastructure => "infrastructure",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
}

impl Trend {
    pub const ALL: [Trend; 3] = [Trend::Improving, Trend::Stable, Trend::Worsening];

    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Worsening => "worsening",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Severity, Category, Trend);

const UNKNOWN: &str = "unknown";

/// Where a crisis is tracked. Country and region may be missing from
/// externally supplied data; a missing field never matches a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// `(longitude, latitude)`
    pub coordinates: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisRecord {
    pub id: String,
    pub title: String,
    #[serde(default, alias = "type")]
    pub category: Option<Category>,
    #[serde(default)]
    pub severity: Option<Severity>,
    pub location: Location,
    #[serde(alias = "aiConfidence")]
    pub confidence: u8,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "predictedImpact")]
    pub predicted_impact: String,
    #[serde(default)]
    pub timeframe: String,
    #[serde(alias = "affectedPopulation")]
    pub affected_population: u64,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(alias = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub trend: Option<Trend>,
    #[serde(default, alias = "relatedCrises")]
    pub related_crises: Vec<String>,
}

impl CrisisRecord {
    pub fn country(&self) -> Option<&str> {
        self.location.country.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.location.region.as_deref()
    }

    pub fn severity_label(&self) -> &'static str {
        self.severity.map_or(UNKNOWN, Severity::as_str)
    }

    pub fn category_label(&self) -> &'static str {
        self.category.map_or(UNKNOWN, Category::as_str)
    }

    pub fn trend_label(&self) -> &'static str {
        self.trend.map_or(UNKNOWN, Trend::as_str)
    }

    /// "Kenya, East Africa" with whatever parts are known.
    pub fn place_label(&self) -> String {
        match (self.country(), self.region()) {
            (Some(country), Some(region)) => format!("{country}, {region}"),
            (Some(only), None) | (None, Some(only)) => only.to_string(),
            (None, None) => "unknown location".to_string(),
        }
    }
}

/// User-selected filter configuration. An empty set places no
/// restriction on its dimension; an empty search term matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub severities: BTreeSet<Severity>,
    #[serde(default)]
    pub categories: BTreeSet<Category>,
    #[serde(default)]
    pub regions: BTreeSet<String>,
    #[serde(default)]
    pub trends: BTreeSet<Trend>,
}

impl FilterCriteria {
    pub fn is_unrestricted(&self) -> bool {
        self.search.is_empty()
            && self.severities.is_empty()
            && self.categories.is_empty()
            && self.regions.is_empty()
            && self.trends.is_empty()
    }

    pub fn toggle_severity(&mut self, severity: Severity) {
        toggle(&mut self.severities, severity);
    }

    pub fn toggle_category(&mut self, category: Category) {
        toggle(&mut self.categories, category);
    }

    pub fn toggle_region(&mut self, region: &str) {
        if !self.regions.remove(region) {
            self.regions.insert(region.to_string());
        }
    }

    pub fn toggle_trend(&mut self, trend: Trend) {
        toggle(&mut self.trends, trend);
    }

    pub fn reset(&mut self) {
        *self = FilterCriteria::default();
    }

    /// One-line description used in report headers and shell status.
    pub fn summary(&self) -> String {
        if self.is_unrestricted() {
            return "no filters".to_string();
        }

        let mut parts = Vec::new();
        if !self.search.is_empty() {
            parts.push(format!("search \"{}\"", self.search));
        }
        if !self.severities.is_empty() {
            parts.push(format!("severity {}", join(self.severities.iter())));
        }
        if !self.categories.is_empty() {
            parts.push(format!("category {}", join(self.categories.iter())));
        }
        if !self.regions.is_empty() {
            parts.push(format!("region {}", join(self.regions.iter())));
        }
        if !self.trends.is_empty() {
            parts.push(format!("trend {}", join(self.trends.iter())));
        }
        parts.join("; ")
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) {
    if set.contains(&value) {
        set.remove(&value);
    } else {
        set.insert(value);
    }
}

fn join<T: fmt::Display>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}
