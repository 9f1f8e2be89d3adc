//! Survey Report Agent - CLI entry point.
//!
//! Runs one agent conversation and prints the outcome.

use survey_report_agent::agent::{Agent, RunStatus};
use survey_report_agent::config::Config;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "survey_report_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        model = %config.model,
        location = %config.location,
        output = %config.output_path.display(),
        "loaded configuration"
    );

    let agent = Agent::new(config)?;
    let report = agent.run().await?;

    info!(
        status = %report.status,
        iterations = report.iterations,
        elapsed_secs = report.elapsed.as_secs_f64(),
        "run complete"
    );

    match report.status {
        RunStatus::ArtifactProduced => {
            println!("Report generated: {}", report.output_path.display());
        }
        RunStatus::EndedWithoutArtifact => {
            error!("agent finished without generating the report");
            std::process::exit(1);
        }
        RunStatus::BudgetExhausted => {
            error!(
                iterations = report.iterations,
                "reached maximum iterations without generating the report"
            );
            std::process::exit(1);
        }
    }

    Ok(())
}
