//! Dataset query tools.
//!
//! All five tools read the immutable [`Dataset`]. Unknown years or subgroups
//! come back as errors carrying guidance (valid years, valid subgroups) so
//! the model can correct itself on the next turn.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::{round_rate, Dataset, Dimension};

use super::Tool;

pub(super) fn require_str<'a>(args: &'a Value, field: &str) -> anyhow::Result<&'a str> {
    args[field]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' argument", field))
}

fn parse_dimension(args: &Value) -> anyhow::Result<Dimension> {
    let raw = require_str(args, "dimension")?;
    Dimension::parse(raw)
        .ok_or_else(|| anyhow::anyhow!("Unknown dimension '{}'. Valid dimensions: grade, sex, race", raw))
}

fn unknown_year(dataset: &Dataset, year: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Year {} not available. Available years: {}",
        year,
        dataset.years_summary()
    )
}

/// Metadata about what can be queried. The model is told to call this first.
pub struct AvailableData {
    dataset: Arc<Dataset>,
    location: String,
    topic: String,
}

impl AvailableData {
    pub fn new(dataset: Arc<Dataset>, location: &str, topic: &str) -> Self {
        Self {
            dataset,
            location: location.to_string(),
            topic: topic.to_string(),
        }
    }
}

#[async_trait]
impl Tool for AvailableData {
    fn name(&self) -> &str {
        "get_available_data"
    }

    fn description(&self) -> &str {
        "Get metadata about what data is available: years, dimensions, and topics. Call this first to understand what you can analyze."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<Value> {
        Ok(json!({
            "location": self.location,
            "topic": self.topic,
            "available_years": self.dataset.available_years(),
            "available_dimensions": Dimension::ALL.map(Dimension::as_str),
            "notes": "Data comes from the Youth Risk Behavior Survey (YRBS). Survey conducted every 2 years."
        }))
    }
}

/// Overall rate for one year, with sample size and confidence interval.
pub struct OverallRate {
    dataset: Arc<Dataset>,
}

impl OverallRate {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl Tool for OverallRate {
    fn name(&self) -> &str {
        "get_overall_rate"
    }

    fn description(&self) -> &str {
        "Get the overall rate for a specific year. Returns rate, sample size, and confidence interval."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "year": {
                    "type": "string",
                    "description": "Year to query (e.g., '2017')"
                }
            },
            "required": ["year"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let year = require_str(&args, "year")?;
        let rate = self
            .dataset
            .overall_rate(year)
            .ok_or_else(|| unknown_year(&self.dataset, year))?;

        Ok(json!({
            "year": year,
            "value": rate.value,
            "sample_size": rate.sample_size,
            "ci_low": rate.ci_low,
            "ci_high": rate.ci_high,
        }))
    }
}

/// Per-subgroup rates for one dimension and year.
pub struct Breakdown {
    dataset: Arc<Dataset>,
}

impl Breakdown {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl Tool for Breakdown {
    fn name(&self) -> &str {
        "get_breakdown"
    }

    fn description(&self) -> &str {
        "Get rates broken down by a demographic dimension for a specific year."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "year": {
                    "type": "string",
                    "description": "Year to query"
                },
                "dimension": {
                    "type": "string",
                    "enum": ["grade", "sex", "race"],
                    "description": "Dimension to break down by: 'grade', 'sex', or 'race'"
                }
            },
            "required": ["year", "dimension"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let year = require_str(&args, "year")?;
        let dimension = parse_dimension(&args)?;

        let breakdown = self
            .dataset
            .breakdown(dimension, year)
            .ok_or_else(|| unknown_year(&self.dataset, year))?;

        Ok(json!({
            "year": year,
            "dimension": dimension.as_str(),
            "data": breakdown,
        }))
    }
}

/// The overall rate series across every surveyed year.
pub struct HistoricalTrend {
    dataset: Arc<Dataset>,
}

impl HistoricalTrend {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl Tool for HistoricalTrend {
    fn name(&self) -> &str {
        "get_historical_trend"
    }

    fn description(&self) -> &str {
        "Get the overall rate trend across all available years. Use this to identify long-term patterns."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<Value> {
        let years = self.dataset.available_years();
        let trend: Vec<Value> = years
            .iter()
            .filter_map(|year| {
                self.dataset.overall_rate(year).map(|rate| {
                    json!({
                        "year": year,
                        "value": rate.value,
                        "sample_size": rate.sample_size,
                        "ci_low": rate.ci_low,
                        "ci_high": rate.ci_high,
                    })
                })
            })
            .collect();

        let total_change = match (years.first(), years.last()) {
            (Some(first), Some(last)) => {
                let first = self.dataset.overall_rate(first);
                let last = self.dataset.overall_rate(last);
                match (first, last) {
                    (Some(f), Some(l)) => Some(round_rate(l.value - f.value)),
                    _ => None,
                }
            }
            _ => None,
        };

        Ok(json!({
            "trend": trend,
            "years_covered": years,
            "total_change": total_change,
        }))
    }
}

/// Historical series for a single subgroup.
pub struct SubgroupTrend {
    dataset: Arc<Dataset>,
}

impl SubgroupTrend {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl Tool for SubgroupTrend {
    fn name(&self) -> &str {
        "get_subgroup_trend"
    }

    fn description(&self) -> &str {
        "Get the historical trend for a specific subgroup (e.g., '8th' or 'Female'). Use when you spot a concerning value and want to see if it's part of a pattern."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dimension": {
                    "type": "string",
                    "enum": ["grade", "sex", "race"]
                },
                "subgroup": {
                    "type": "string",
                    "description": "The specific subgroup (e.g., '8th', 'Female', 'Hispanic or Latino')"
                }
            },
            "required": ["dimension", "subgroup"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let dimension = parse_dimension(&args)?;
        let subgroup = require_str(&args, "subgroup")?;

        let series = self.dataset.subgroup_series(dimension, subgroup);
        if series.iter().all(|(_, point)| point.is_none()) {
            anyhow::bail!(
                "Subgroup '{}' not found in dimension '{}'. Valid subgroups: {}",
                subgroup,
                dimension.as_str(),
                self.dataset.subgroups(dimension).join(", ")
            );
        }

        let trend: Vec<Value> = series
            .iter()
            .map(|(year, point)| match point {
                Some(p) => json!({
                    "year": year,
                    "value": p.value,
                    "sample_size": p.sample_size,
                }),
                None => json!({
                    "year": year,
                    "error": "Subgroup not surveyed this year",
                }),
            })
            .collect();

        let observed: Vec<f64> = series
            .iter()
            .filter_map(|(_, point)| point.map(|p| p.value))
            .collect();
        // Only meaningful when the subgroup appears in every year.
        let total_change = if observed.len() == series.len() {
            Some(round_rate(observed[observed.len() - 1] - observed[0]))
        } else {
            None
        };

        Ok(json!({
            "subgroup": subgroup,
            "dimension": dimension.as_str(),
            "trend": trend,
            "total_change": total_change,
        }))
    }
}
