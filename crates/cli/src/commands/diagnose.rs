//! `sentinel diagnose`: run the decision policy on one container.

use sentinel_config::AppConfig;
use sentinel_gateway::AppServices;
use sentinel_ops::LogQuery;
use sentinel_policy::PolicyOutcome;
use std::path::PathBuf;
use tracing::debug;

pub async fn run(
    config: AppConfig,
    container: String,
    tail: Option<usize>,
    logs_file: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    super::require_api_key(&config)?;
    let services = AppServices::build(&config)?;

    let logs = match logs_file {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?,
        None => {
            let query = LogQuery::new(&container).with_tail(tail.unwrap_or(config.ops.default_tail));
            services.runtime.fetch_logs(&query).await?.text
        }
    };
    if logs.trim().is_empty() {
        println!("Logs for '{container}' are empty; nothing to diagnose.");
        return Ok(());
    }

    debug!(container = %container, bytes = logs.len(), "Assessing container logs");
    let outcome = services.policy.assess(&container, &logs).await?;
    let decision = outcome.decision();
    println!("{}", serde_json::to_string_pretty(decision)?);
    if let PolicyOutcome::FailSafe { violation, .. } = &outcome {
        eprintln!("  Note: {violation}; fell back to '{}'.", decision.suggested_action);
    }

    Ok(())
}
