//! `sentinel status`: show configuration and policy state.

use sentinel_config::AppConfig;
use sentinel_policy::ExampleStore;

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let policy = ExampleStore::open(config.examples_path()).summary();

    println!("Sentinel Status");
    println!("===============");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Provider:      {}", config.default_provider);
    println!("  Model:         {}", config.default_model);
    println!("  API key:       {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Agent:         {}", config.agent.name);
    println!("  Max iters:     {}", config.agent.max_tool_iterations);
    println!("  Runtime:       {}", config.ops.runtime);
    println!("  Restarts:      {}", if config.ops.allow_restart { "allowed" } else { "disabled" });
    println!("  Gateway:       {}:{}", config.gateway.host, config.gateway.port);
    println!("  Policy model:  {}", config.policy_model());
    println!("  Policy mode:   {} ({} demonstrations)", policy.mode, policy.demonstrations);
    if policy.demonstrations > 0 {
        println!("  Example set:   v{} from {} ({})", policy.version, policy.created_at, policy.model);
    }
    println!("  Examples file: {}", config.examples_path().display());

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file; run `sentinel init` to create one");
    }

    Ok(())
}
