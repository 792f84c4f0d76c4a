//! `sentinel gateway`: start the HTTP façade.

use sentinel_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if !config.has_api_key() {
        eprintln!("  Warning: no API key configured; /analyze will fail until one is set.");
    }

    println!("Sentinel Gateway");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Runtime:   {}", config.ops.runtime);
    println!("   Endpoints: POST /analyze, GET /health, GET /sessions, GET /policy, POST /policy/reload");

    sentinel_gateway::start(config).await?;

    Ok(())
}
