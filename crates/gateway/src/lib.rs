//! HTTP façade for Sentinel.
//!
//! Every process-wide service (provider, example store, decision policy,
//! container runtime, orchestrator, sessions) is built once by
//! [`AppServices::build`] and shared with the handlers through axum state.

pub mod api;

use sentinel_agent::{Orchestrator, SessionStore};
use sentinel_config::AppConfig;
use sentinel_core::Provider;
use sentinel_core::event::{DomainEvent, EventBus};
use sentinel_ops::ContainerRuntime;
use sentinel_policy::{DecisionPolicy, ExampleStore, PolicySettings};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use api::build_router;

/// Shared services for one Sentinel process.
pub struct AppServices {
    pub config: AppConfig,
    pub event_bus: Arc<EventBus>,
    pub store: Arc<ExampleStore>,
    pub policy: Arc<DecisionPolicy>,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<SessionStore>,
}

impl AppServices {
    /// Build everything from configuration: the default provider, the
    /// example store at `policy.examples_path` and the configured runtime.
    pub fn build(config: &AppConfig) -> Result<Self, sentinel_core::Error> {
        if !config.has_api_key() {
            warn!(
                provider = %config.default_provider,
                "No API key configured; model calls will fail until one is set"
            );
        }

        let router = sentinel_providers::build_from_config(config);
        let provider = router.default().ok_or_else(|| sentinel_core::Error::Config {
            message: format!("Provider '{}' is not configured", config.default_provider),
        })?;
        let store = Arc::new(ExampleStore::open(config.examples_path()));
        let runtime = sentinel_ops::runtime_from_config(&config.ops);

        Ok(Self::assemble(config.clone(), provider, runtime, store))
    }

    /// Wire the services around an existing provider, runtime and store.
    pub fn assemble(
        config: AppConfig,
        provider: Arc<dyn Provider>,
        runtime: Arc<dyn ContainerRuntime>,
        store: Arc<ExampleStore>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let policy = Arc::new(
            DecisionPolicy::new(provider.clone(), store.clone(), PolicySettings::from_config(&config))
                .with_event_bus(event_bus.clone()),
        );
        let tools = sentinel_agent::build_tool_registry(runtime.clone(), policy.clone(), &config.ops);
        let orchestrator = Orchestrator::new(
            provider,
            &config.default_model,
            config.default_temperature,
            Arc::new(tools),
            &config.agent.instruction,
            event_bus.clone(),
        )
        .with_max_iterations(config.agent.max_tool_iterations)
        .with_max_tokens(config.default_max_tokens);

        info!(
            agent = %config.agent.name,
            model = %config.default_model,
            runtime = runtime.name(),
            tools = ?orchestrator.tools().names(),
            "Services ready"
        );

        Self {
            config,
            event_bus,
            store,
            policy,
            runtime,
            orchestrator: Arc::new(orchestrator),
            sessions: Arc::new(SessionStore::new()),
        }
    }
}

/// Log every domain event until the bus closes.
pub fn spawn_event_logger(event_bus: &EventBus) -> JoinHandle<()> {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.as_ref() {
                    DomainEvent::DecisionMade {
                        workload,
                        severity,
                        action,
                        compliant,
                        ..
                    } => info!(%workload, %severity, %action, compliant, "event: decision"),
                    DomainEvent::ErrorOccurred {
                        context,
                        error_message,
                        ..
                    } => warn!(%context, error = %error_message, "event: error"),
                    other => debug!(event = ?other, "event"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Start the HTTP server and serve until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let services = Arc::new(AppServices::build(&config)?);
    let _events = spawn_event_logger(&services.event_bus);

    let summary = services.store.summary();
    info!(
        addr = %addr,
        policy_mode = summary.mode,
        demonstrations = summary.demonstrations,
        "Gateway starting"
    );

    let app = build_router(services);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
