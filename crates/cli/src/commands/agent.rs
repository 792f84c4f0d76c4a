//! `sentinel agent`: interactive REPL or single-message mode.

use sentinel_agent::{AgentError, TurnReport, abort_pair};
use sentinel_config::AppConfig;
use sentinel_gateway::{AppServices, spawn_event_logger};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(config: AppConfig, message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    super::require_api_key(&config)?;

    let services = AppServices::build(&config)?;
    let _events = spawn_event_logger(&services.event_bus);
    let user_id = config.agent.repl_user_id.clone();
    let session_id = config.agent.repl_session_id.clone();

    if let Some(msg) = message {
        let report = turn(&services, &user_id, &session_id, &msg).await?;
        println!("{}", report.response());
        return Ok(());
    }

    let policy = services.store.summary();
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Sentinel Agent — Interactive Mode      ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Agent:     {}", config.agent.name);
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Runtime:   {}", services.runtime.name());
    println!("  Tools:     {}", services.orchestrator.tools().names().join(", "));
    println!(
        "  Policy:    {} ({} demonstrations)",
        policy.mode, policy.demonstrations
    );
    println!("  Session:   {user_id} / {session_id}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or 'quit' to leave; Ctrl+C cancels a running turn.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        match turn(&services, &user_id, &session_id, input).await {
            Ok(report) => {
                eprint!("\r     \r");
                println!();
                for line in report.response().lines() {
                    println!("  Sentinel > {line}");
                }
                println!();
            }
            Err(e) if e.is_aborted() => {
                eprint!("\r     \r");
                println!("  [Cancelled]");
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// Run one turn; Ctrl-C aborts it.
async fn turn(
    services: &AppServices,
    user_id: &str,
    session_id: &str,
    message: &str,
) -> Result<TurnReport, AgentError> {
    let (handle, signal) = abort_pair();
    let turn = services
        .orchestrator
        .handle(&services.sessions, user_id, session_id, message, &signal);
    tokio::pin!(turn);

    tokio::select! {
        result = &mut turn => result,
        _ = tokio::signal::ctrl_c() => {
            handle.abort();
            turn.await
        }
    }
}
