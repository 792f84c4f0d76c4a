//! `sentinel containers`: list running workloads.

use sentinel_config::AppConfig;

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = sentinel_ops::runtime_from_config(&config.ops);
    let workloads = runtime.list_workloads().await?;

    if workloads.is_empty() {
        println!("No active containers found.");
        return Ok(());
    }

    println!("{:<28} {:<12} STATUS", "NAME", "ID");
    for w in &workloads {
        println!("{:<28} {:<12} {}", w.name, w.short_id, w.status);
    }
    Ok(())
}
