//! The terminal report-generation tool.
//!
//! `generate_report` is the distinguished handler whose success ends the run:
//! the dispatcher flags the run state when it completes, and the termination
//! policy stops the loop at the end of that turn. A rendering failure is the
//! one handler error that aborts the run instead of feeding back to the
//! model.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::report::{DocumentRenderer, ReportSpec};

use super::Tool;

/// Name the dispatcher watches for terminal success.
pub const GENERATE_REPORT: &str = "generate_report";

pub struct GenerateReport {
    renderer: Arc<dyn DocumentRenderer>,
}

impl GenerateReport {
    pub fn new(renderer: Arc<dyn DocumentRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Tool for GenerateReport {
    fn name(&self) -> &str {
        GENERATE_REPORT
    }

    fn description(&self) -> &str {
        "Generate the final report document. Call this only after you have completed your analysis. You control the report structure."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Report title"
                },
                "subtitle": {
                    "type": "string",
                    "description": "Report subtitle with date range and location"
                },
                "executive_summary": {
                    "type": "string",
                    "description": "2-3 sentence executive summary"
                },
                "sections": {
                    "type": "array",
                    "description": "Report sections. You decide what sections to include based on your analysis.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "heading": {"type": "string"},
                            "content": {
                                "type": "string",
                                "description": "Paragraph content for this section"
                            },
                            "include_table": {
                                "type": "boolean",
                                "description": "Whether to include a data table"
                            },
                            "table_data": {
                                "type": "object",
                                "description": "If include_table is true, provide table data with 'headers' array and 'rows' array of arrays"
                            },
                            "alert_level": {
                                "type": "string",
                                "enum": ["none", "watch", "warning", "critical"],
                                "description": "Visual styling for this section"
                            }
                        },
                        "required": ["heading", "content"]
                    }
                },
                "recommendations": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "List of actionable recommendations"
                },
                "methodology_notes": {
                    "type": "string",
                    "description": "Notes on data sources and limitations"
                }
            },
            "required": ["title", "sections"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        // Nested section fields are only shallowly schema-checked; a bad
        // structure is still a recoverable error the model can fix.
        let spec: ReportSpec = serde_json::from_value(args)
            .map_err(|e| anyhow::anyhow!("Invalid report specification: {}", e))?;

        let path = self.renderer.render(&spec)?;

        Ok(json!({
            "success": true,
            "file": path.display().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MarkdownRenderer;

    fn report_args() -> Value {
        json!({
            "title": "Findings",
            "sections": [
                {"heading": "Trend", "content": "Rates rose.", "alert_level": "watch"}
            ],
            "recommendations": ["Monitor next cycle."]
        })
    }

    #[tokio::test]
    async fn renders_report_and_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        let tool = GenerateReport::new(Arc::new(MarkdownRenderer::new(&path)));

        let result = tool.execute(report_args()).await.unwrap();
        assert_eq!(result["success"], json!(true));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn rejects_structurally_invalid_spec() {
        let dir = tempfile::tempdir().unwrap();
        let tool = GenerateReport::new(Arc::new(MarkdownRenderer::new(
            dir.path().join("out.md"),
        )));

        // sections entries missing required 'content'
        let err = tool
            .execute(json!({
                "title": "Findings",
                "sections": [{"heading": "Trend"}]
            }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid report specification"));
    }

    #[tokio::test]
    async fn render_failure_is_a_render_error() {
        let tool = GenerateReport::new(Arc::new(MarkdownRenderer::new(
            "/nonexistent-dir/out.md",
        )));
        let err = tool.execute(report_args()).await.unwrap_err();
        assert!(err.downcast_ref::<crate::report::RenderError>().is_some());
    }
}
