//! Structured report specification and document rendering.
//!
//! The model assembles a [`ReportSpec`] through the terminal tool call; the
//! renderer persists it as a document. The spec is a plain data type with
//! explicit required/optional fields so malformed structures are rejected at
//! the tool boundary instead of surfacing mid-render.

mod render;

pub use render::{DocumentRenderer, MarkdownRenderer, RenderError};

use serde::Deserialize;

/// The full report structure the model submits to `generate_report`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSpec {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub executive_summary: Option<String>,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub methodology_notes: Option<String>,
}

/// One report section. The model decides headings and ordering.
#[derive(Debug, Clone, Deserialize)]
pub struct Section {
    pub heading: String,
    pub content: String,
    #[serde(default)]
    pub include_table: bool,
    #[serde(default)]
    pub table_data: Option<TableData>,
    #[serde(default)]
    pub alert_level: AlertLevel,
}

/// Tabular data attached to a section. Cells may be strings or numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableData {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Visual severity tag for a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[default]
    None,
    Watch,
    Warning,
    Critical,
}
