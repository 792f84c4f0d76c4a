//! `sentinel init`: write a default config file.

use sentinel_config::AppConfig;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Sentinel — First-Time Setup");
    println!("===========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("  Config file exists: {} (use --force to overwrite)", config_path.display());
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Wrote {}", config_path.display());
    }

    println!("\nNext steps:");
    println!("  1. export GEMINI_API_KEY='...'");
    println!("  2. sentinel calibrate");
    println!("  3. sentinel agent");
    Ok(())
}
