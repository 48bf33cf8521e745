//! Botweaver engine entry point
//!
//! Loads the configuration and an optional fleet plan, launches the
//! listed bots with their task queues and keeps the engine running
//! until shutdown.
//!
//! ## Environment variables
//! - `BOTWEAVER_CDP_ENDPOINT`: CDP WebSocket endpoint (default: ws://localhost:9222)
//! - `BOTWEAVER_MAX_CONCURRENT_TASKS`: per-bot concurrency limit (default: 5)
//! - `RUST_LOG`: log filter, overrides the configured log level

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use botweaver::bot::{BotIdentity, BrowserEngine, TaskRecord};
use botweaver::config::Config;
use botweaver::launch::{CdpBrowserProvider, Launcher};
use botweaver::session::SessionRegistry;
use botweaver::stealth::BrowserVersionManager;
use botweaver::tasks::{TaskManager, TaskRegistry, TaskSpec};

/// Interval between dead-session sweeps
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Interval between browser-version metadata refreshes
const VERSION_REFRESH_INTERVAL: Duration = Duration::from_secs(6 * 3600);

/// Bots to launch at startup, with their task queues
#[derive(Debug, Deserialize)]
struct FleetPlan {
    #[serde(default)]
    bots: Vec<FleetBot>,
}

#[derive(Debug, Deserialize)]
struct FleetBot {
    #[serde(flatten)]
    identity: BotIdentity,
    /// Session lifetime in minutes; unbounded when absent
    #[serde(default)]
    duration_minutes: Option<u64>,
    #[serde(default)]
    tasks: Vec<TaskRecord>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var("BOTWEAVER_CONFIG") {
        Ok(path) => Config::from_file(&path)?,
        Err(_) => Config::from_env()?,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Botweaver engine v{}", botweaver::VERSION);
    info!("CDP endpoint: {}", config.cdp_endpoint);

    let registry = SessionRegistry::new();
    let launcher = Arc::new(Launcher::new(
        config.clone(),
        Arc::new(CdpBrowserProvider::new(config.cdp_endpoint.clone())),
        registry.clone(),
    ));

    if let Some(path) = std::env::args().nth(1) {
        let plan: FleetPlan = toml::from_str(&std::fs::read_to_string(&path)?)?;
        info!("Fleet plan loaded: {} bots", plan.bots.len());

        for bot in plan.bots {
            if let Err(e) = launch_fleet_bot(&launcher, &config, bot).await {
                error!("Bot launch failed: {}", e);
            }
        }
    }

    let versions = BrowserVersionManager::new();

    let mut cleanup = tokio::time::interval(CLEANUP_INTERVAL);
    cleanup.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut version_refresh = tokio::time::interval(VERSION_REFRESH_INTERVAL);
    version_refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = cleanup.tick() => {
                let removed = registry.cleanup().await;
                if removed > 0 {
                    info!("Dropped {} dead sessions", removed);
                }
            }
            _ = version_refresh.tick() => {
                if let Err(e) = versions.refresh().await {
                    warn!("Browser version refresh failed: {}", e);
                } else if let Some(version) = versions.current_version(BrowserEngine::Chromium).await {
                    info!("Current stable Chromium: {}", version);
                }
            }
        }
    }

    for id in registry.list().await {
        if let Err(e) = registry.terminate(&id).await {
            warn!("Session {} did not close cleanly: {}", id, e);
        }
    }

    info!("Engine stopped");
    Ok(())
}

/// Launch one bot from the plan and queue its tasks
async fn launch_fleet_bot(
    launcher: &Arc<Launcher>,
    config: &Config,
    bot: FleetBot,
) -> botweaver::Result<()> {
    let manager = Arc::new(TaskManager::with_limits(
        TaskRegistry::with_builtins(),
        config.max_concurrent_tasks,
        config.task_max_retries,
        config.task_retry_delay,
    ));

    let duration = bot.duration_minutes.map(|m| Duration::from_secs(m * 60));
    let launched = launcher
        .launch_into(&bot.identity, duration, &manager)
        .await?;
    info!(
        "Bot {} launched as session {}",
        launched.bot_name, launched.session_id
    );

    for task in bot.tasks {
        let spec = TaskSpec::new(task.kind.clone(), task.parameters).with_actions(task.actions);
        let ticket = match manager.submit(spec, task.priority).await {
            Ok(ticket) => ticket,
            Err(e) => {
                error!("Task {} rejected: {}", task.kind, e);
                continue;
            }
        };

        let bot_name = launched.bot_name.clone();
        tokio::spawn(async move {
            match ticket.wait().await {
                Ok(result) => info!("[{}] task finished: {}", bot_name, result),
                Err(e) => error!("[{}] task failed: {}", bot_name, e),
            }
        });
    }

    Ok(())
}
