pub mod agent;
pub mod calibrate;
pub mod containers;
pub mod diagnose;
pub mod gateway;
pub mod init;
pub mod status;

use sentinel_config::AppConfig;

/// Load the config file and apply the global `--static` switch.
pub fn load_config(static_runtime: bool) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if static_runtime {
        config.ops.runtime = "static".into();
    }
    Ok(config)
}

/// Fail early, with setup instructions, when no model key is configured.
pub fn require_api_key(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.has_api_key() {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    export GEMINI_API_KEY='...'       (default provider)");
    eprintln!("    export OPENROUTER_API_KEY='...'   (with SENTINEL_PROVIDER=openrouter)");
    eprintln!("    export SENTINEL_API_KEY='...'     (generic)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}
