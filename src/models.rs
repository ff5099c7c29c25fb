use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Traditional,
    AiAssisted,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Traditional => write!(f, "traditional"),
            SearchMode::AiAssisted => write!(f, "ai"),
        }
    }
}

/// Page sizes the job index accepts from this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageLimit {
    Ten,
    #[default]
    Twenty,
    Fifty,
}

impl PageLimit {
    pub fn as_u32(self) -> u32 {
        match self {
            PageLimit::Ten => 10,
            PageLimit::Twenty => 20,
            PageLimit::Fifty => 50,
        }
    }
}

impl TryFrom<u32> for PageLimit {
    type Error = FilterError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(PageLimit::Ten),
            20 => Ok(PageLimit::Twenty),
            50 => Ok(PageLimit::Fifty),
            other => Err(FilterError::UnsupportedLimit(other)),
        }
    }
}

impl fmt::Display for PageLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filters {
    pub company: String,
    pub location: String,
    pub limit: PageLimit,
}

/// A single user edit to the filter panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    Company(String),
    Location(String),
    Limit(PageLimit),
}

impl Filters {
    pub fn apply(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::Company(company) => self.company = company,
            FilterUpdate::Location(location) => self.location = location,
            FilterUpdate::Limit(limit) => self.limit = limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-listing enrichment attached by the AI search endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobInsight {
    #[serde(default, deserialize_with = "lenient_text")]
    pub relevance_score: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub key_highlights: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub why_good_match: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub potential_concerns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    #[serde(rename = "job_id")]
    pub id: JobId,
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub posted_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub application_method: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub remote_friendly: Option<bool>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "lenient_record",
        skip_serializing_if = "Option::is_none"
    )]
    pub ai_insights: Option<JobInsight>,
    // Whatever else the index sends travels back untouched as chat context.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobListing {
    #[cfg(test)]
    pub fn new(id: i64, title: &str, company: &str, location: &str) -> Self {
        Self {
            id: JobId(id),
            title: title.to_string(),
            company: company.to_string(),
            location: location.to_string(),
            posted_date: None,
            description: None,
            rating: None,
            salary: None,
            source: None,
            application_method: None,
            job_type: None,
            experience_level: None,
            remote_friendly: None,
            skills: None,
            ai_insights: None,
            extra: Map::new(),
        }
    }

    /// Rating clamped to the 0-5 scale the index uses.
    pub fn stars(&self) -> Option<f64> {
        self.rating.map(|r| r.clamp(0.0, 5.0))
    }

    /// Accepts either an RFC 3339 timestamp or a bare `YYYY-MM-DD`.
    pub fn posted_on(&self) -> Option<NaiveDate> {
        let raw = self.posted_date.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.date_naive());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AiAnalysis {
    #[serde(default, deserialize_with = "lenient_summary")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub insights: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub salary_trends: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub skill_demand: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What the language model extracted from a free-text query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedQuery {
    #[serde(default, deserialize_with = "lenient_list")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub salary_expectation: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub work_arrangement: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub experience_level: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub search_query: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// --- Model-generated fields ---
//
// Insights, analysis and parsed queries are whatever JSON a language model
// produced. Nulls, numbers, objects and lists all get flattened to display
// text instead of failing the response they arrived in.

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter_map(|(key, v)| value_text(v).map(|text| format!("{}: {}", key, text)))
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(value_text(&Value::deserialize(deserializer)?))
}

fn lenient_summary<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

/// A list of strings; a bare scalar counts as a one-item list.
fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().filter_map(value_text).collect(),
        other => value_text(&other).into_iter().collect(),
    })
}

/// A record that is dropped, not fatal, when its shape is unusable.
pub(crate) fn lenient_record<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!(error = %e, "ignoring malformed AI record");
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResult {
    pub jobs: Vec<JobListing>,
    pub ai_analysis: Option<AiAnalysis>,
    pub parsed_query: Option<ParsedQuery>,
    pub summary: Option<String>,
}

impl SearchResult {
    pub fn from_jobs(jobs: Vec<JobListing>) -> Self {
        Self {
            jobs,
            ..Self::default()
        }
    }

    pub fn clear_ai_artifacts(&mut self) {
        self.ai_analysis = None;
        self.parsed_query = None;
        self.summary = None;
    }

    pub fn has_ai_artifacts(&self) -> bool {
        self.ai_analysis.is_some() || self.parsed_query.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: &str) -> Self {
        Self {
            role: ChatRole::User,
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Pending,
    Acknowledged,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub turn: ChatTurn,
    pub status: TurnStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Stats {
    pub total_documents: u64,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Dark,
    #[default]
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
