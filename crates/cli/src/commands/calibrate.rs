//! `sentinel calibrate`: bootstrap few-shot demonstrations.

use sentinel_config::AppConfig;
use sentinel_gateway::AppServices;
use sentinel_policy::{Calibrator, default_trainset, load_dataset};
use std::path::PathBuf;
use tracing::info;

pub async fn run(
    config: AppConfig,
    dataset: Option<PathBuf>,
    max_demos: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    super::require_api_key(&config)?;

    let trainset = match &dataset {
        Some(path) => load_dataset(path)?,
        None => default_trainset(),
    };
    let max_demos = max_demos.unwrap_or(config.policy.max_bootstrapped_demos);
    let services = AppServices::build(&config)?;

    println!("Calibrating decision policy");
    println!(
        "   Dataset:   {} ({} examples)",
        dataset
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".into()),
        trainset.len()
    );
    println!("   Model:     {}", services.policy.settings().model);
    println!("   Max demos: {max_demos}");
    println!();

    let report = Calibrator::new(&services.policy, max_demos).run(&trainset).await?;
    info!(
        passed = report.passed,
        kept = report.kept,
        replaced = report.replaced,
        "Calibration finished"
    );

    println!("   Attempted: {}", report.attempted);
    println!("   Passed:    {}", report.passed);
    println!("   Errors:    {}", report.errors);
    println!("   Kept:      {}", report.kept);
    if report.replaced {
        let version = report.version.unwrap_or_default();
        match &report.persisted_to {
            Some(path) => println!("\n  Example set v{version} saved to {}", path.display()),
            None => println!("\n  Example set v{version} is in memory only"),
        }
    } else {
        println!("\n  No example passed; the existing example set was left unchanged.");
    }

    Ok(())
}
