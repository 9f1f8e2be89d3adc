//! Markdown document rendering.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{AlertLevel, ReportSpec, TableData};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persists a report specification as a document at a configured path.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, spec: &ReportSpec) -> Result<PathBuf, RenderError>;
}

/// Renders the report as a Markdown document.
pub struct MarkdownRenderer {
    output_path: PathBuf,
}

impl MarkdownRenderer {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl DocumentRenderer for MarkdownRenderer {
    fn render(&self, spec: &ReportSpec) -> Result<PathBuf, RenderError> {
        let document = render_markdown(spec);
        std::fs::write(&self.output_path, document).map_err(|source| RenderError::Io {
            path: self.output_path.clone(),
            source,
        })?;
        Ok(self.output_path.clone())
    }
}

fn render_markdown(spec: &ReportSpec) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", spec.title));

    if let Some(subtitle) = &spec.subtitle {
        out.push_str(&format!("*{}*\n\n", subtitle));
    }

    if let Some(summary) = &spec.executive_summary {
        out.push_str("## Executive Summary\n\n");
        out.push_str(summary);
        out.push_str("\n\n");
    }

    for section in &spec.sections {
        out.push_str(&format!("## {}\n\n", section.heading));

        match section.alert_level {
            AlertLevel::Warning => out.push_str("> **WARNING**\n\n"),
            AlertLevel::Critical => out.push_str("> **CRITICAL**\n\n"),
            AlertLevel::Watch | AlertLevel::None => {}
        }

        out.push_str(&section.content);
        out.push_str("\n\n");

        if section.include_table {
            if let Some(table) = &section.table_data {
                out.push_str(&render_table(table));
                out.push('\n');
            }
        }
    }

    if !spec.recommendations.is_empty() {
        out.push_str("## Recommendations\n\n");
        for (i, rec) in spec.recommendations.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, rec));
        }
        out.push('\n');
    }

    if let Some(notes) = &spec.methodology_notes {
        out.push_str("## Methodology & Data Notes\n\n");
        out.push_str(notes);
        out.push_str("\n\n");
    }

    out.push_str(&format!(
        "---\n*Generated {}*\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
    ));

    out
}

fn render_table(table: &TableData) -> String {
    let mut out = String::new();

    if !table.headers.is_empty() {
        out.push_str(&format!("| {} |\n", table.headers.join(" | ")));
        out.push_str(&format!(
            "|{}\n",
            " --- |".repeat(table.headers.len())
        ));
    }

    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    out
}

/// Table cells arrive as arbitrary JSON scalars; quote-free rendering for
/// strings, `to_string` for the rest.
fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
