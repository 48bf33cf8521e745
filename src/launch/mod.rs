//! Launch orchestration
//!
//! Turns a bot identity into a live, registered session: connect to the
//! browser, install the fingerprint and evasion scripts, restore
//! cookies, open the page with the right device preset, start the
//! behavior simulator and hand the resources to the task manager.

pub mod cache;
pub mod cookies;
pub mod presets;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bot::BotIdentity;
use crate::captcha::{CaptchaSolver, TwoCaptchaClient};
use crate::cdp::{CdpBrowser, CdpBrowserImpl, EvaluationResult};
use crate::config::Config;
use crate::session::{
    BrowserSession, BrowserSessionImpl, PageOptions, PageSession, SessionRegistry,
};
use crate::stealth::{
    BehaviorSimulator, Fingerprint, FingerprintManager, FingerprintOs, SimulatorOptions,
    UserAgentRotator,
};
use crate::tasks::{TaskContext, TaskManager};
use crate::Result;

pub use cache::CacheStore;
pub use cookies::CookieStore;
pub use presets::{preset_for, DevicePreset, DEFAULT_PRESET};

/// Process arguments that strip the obvious automation tells from a
/// Chromium launch.
pub const STEALTH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-dev-shm-usage",
];

/// Process arguments for a bot's browser, stealth flags plus the bot's
/// proxy when one is attached and enabled.
///
/// The engine attaches to a running browser over CDP, so the proxy has
/// to be baked into the process invocation rather than the context.
pub fn launch_args(bot: &BotIdentity) -> Vec<String> {
    let mut args: Vec<String> = STEALTH_ARGS.iter().map(|a| a.to_string()).collect();

    if let Some(proxy) = bot.proxy.as_ref().filter(|p| p.enabled) {
        args.push(format!("--proxy-server={}", proxy.url()));
    }

    args
}

/// Opens browser sessions for bots.
///
/// Seam between the launcher and the transport so tests can hand out
/// mock sessions.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn connect(&self, bot: &BotIdentity) -> Result<Arc<dyn BrowserSession>>;
}

/// Real provider: one CDP browser attachment per bot
pub struct CdpBrowserProvider {
    endpoint: String,
}

impl CdpBrowserProvider {
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl BrowserProvider for CdpBrowserProvider {
    async fn connect(&self, bot: &BotIdentity) -> Result<Arc<dyn BrowserSession>> {
        let browser = Arc::new(CdpBrowserImpl::new(self.endpoint.clone()));
        Ok(Arc::new(BrowserSessionImpl::new(
            bot.name.clone(),
            browser as Arc<dyn CdpBrowser>,
        )))
    }
}

/// A live bot session as returned by [`Launcher::launch`]
pub struct LaunchedBot {
    pub session_id: String,
    pub bot_name: String,
    pub session: Arc<dyn BrowserSession>,
    pub page: Arc<dyn PageSession>,
    pub fingerprint: Fingerprint,
    pub simulator: Arc<BehaviorSimulator>,
}

pub struct Launcher {
    config: Config,
    provider: Arc<dyn BrowserProvider>,
    registry: SessionRegistry,
    cookies: CookieStore,
    cache: CacheStore,
    /// UA source for sessions launched without the stealth scripts
    user_agents: UserAgentRotator,
}

impl Launcher {
    pub fn new(config: Config, provider: Arc<dyn BrowserProvider>, registry: SessionRegistry) -> Self {
        let cookies = CookieStore::new(&config.cookie_dir);
        let cache = CacheStore::new(&config.cookie_dir);
        Self {
            config,
            provider,
            registry,
            cookies,
            cache,
            user_agents: UserAgentRotator::new(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Launch a session for the bot.
    ///
    /// A duration bound makes the session self-terminate: the simulator
    /// stops, cookies are persisted and the browser closes.
    pub async fn launch(
        self: &Arc<Self>,
        bot: &BotIdentity,
        duration: Option<Duration>,
    ) -> Result<LaunchedBot> {
        info!("Launching bot {} ({:?})", bot.name, bot.browser);

        let session = self.provider.connect(bot).await?;

        // Identity first: init scripts only reach pages created later.
        let fingerprints = FingerprintManager::for_os_label(&bot.os);
        let fingerprint = if self.config.stealth_enabled {
            fingerprints.apply(session.as_ref()).await?
        } else {
            fingerprints.fingerprint()
        };

        let stored = self.cookies.load(&bot.name).await?;
        if !stored.is_empty() {
            session.set_cookies(stored).await?;
        }

        let snapshot = self.cache.load(&bot.name).await?;
        if snapshot.as_object().is_some_and(|m| !m.is_empty()) {
            session
                .add_init_script(&cache::restore_script(&snapshot))
                .await?;
        }

        // Without stealth scripts the identity is just the UA header,
        // rotated round-robin across launches.
        let user_agent = if self.config.stealth_enabled {
            fingerprint.user_agent.clone()
        } else {
            self.user_agents
                .next_for_os(FingerprintOs::from_label(&bot.os))
        };

        let preset = preset_for(&bot.device);
        let page = session
            .create_page(PageOptions {
                viewport_width: preset.width,
                viewport_height: preset.height,
                device_scale_factor: preset.scale,
                is_mobile: preset.mobile,
                user_agent: Some(user_agent),
                initial_url: None,
            })
            .await?;

        let simulator = Arc::new(BehaviorSimulator::new(
            Arc::clone(&page),
            SimulatorOptions::default(),
        ));
        if bot.category == "enhanced" {
            simulator.start().await?;
        }

        let session_id = self.registry.register(Arc::clone(&session)).await;

        if let Some(duration) = duration {
            self.spawn_termination_timer(&session_id, &bot.name, &page, &simulator, duration);
        }

        Ok(LaunchedBot {
            session_id,
            bot_name: bot.name.clone(),
            session,
            page,
            fingerprint,
            simulator,
        })
    }

    /// Launch and bind the session into the task manager
    pub async fn launch_into(
        self: &Arc<Self>,
        bot: &BotIdentity,
        duration: Option<Duration>,
        manager: &Arc<TaskManager>,
    ) -> Result<LaunchedBot> {
        let launched = self.launch(bot, duration).await?;

        let mut context = TaskContext::new(Arc::clone(&launched.session), Arc::clone(&launched.page))
            .with_timeouts(self.config.page_load_timeout, self.config.navigation_timeout);
        if let Some(api_key) = &self.config.captcha_api_key {
            let client = TwoCaptchaClient::new(self.config.captcha_api_url.clone(), api_key.clone());
            context = context.with_captcha(Arc::new(CaptchaSolver::new(Arc::new(client))));
        }

        manager.attach(context).await;
        Ok(launched)
    }

    /// Stop the simulator, persist cookies and cache, drop the session
    pub async fn terminate(&self, launched: &LaunchedBot) -> Result<()> {
        launched.simulator.stop().await;
        self.persist_state(&launched.bot_name, &launched.page).await;
        self.registry.terminate(&launched.session_id).await
    }

    /// Save the page's cookies and cache snapshot for the next launch
    async fn persist_state(&self, bot_name: &str, page: &Arc<dyn PageSession>) {
        match page.cdp().get_cookies().await {
            Ok(cookies) => {
                if let Err(e) = self.cookies.save(bot_name, &cookies).await {
                    warn!("Could not persist cookies for {}: {}", bot_name, e);
                }
            }
            Err(e) => warn!("Could not read cookies for {}: {}", bot_name, e),
        }

        match page.evaluate(cache::CACHE_SNAPSHOT_SCRIPT, true).await {
            Ok(EvaluationResult::Object(snapshot))
                if snapshot.as_object().is_some_and(|m| !m.is_empty()) =>
            {
                if let Err(e) = self.cache.save(bot_name, &snapshot).await {
                    warn!("Could not persist cache for {}: {}", bot_name, e);
                }
            }
            Ok(_) => debug!("No cache entries to persist for {}", bot_name),
            Err(e) => warn!("Could not snapshot cache for {}: {}", bot_name, e),
        }
    }

    fn spawn_termination_timer(
        self: &Arc<Self>,
        session_id: &str,
        bot_name: &str,
        page: &Arc<dyn PageSession>,
        simulator: &Arc<BehaviorSimulator>,
        duration: Duration,
    ) {
        let launcher = Arc::clone(self);
        let session_id = session_id.to_string();
        let bot_name = bot_name.to_string();
        let page = Arc::clone(page);
        let simulator = Arc::clone(simulator);

        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            info!("Session {} reached its duration bound", session_id);

            simulator.stop().await;
            launcher.persist_state(&bot_name, &page).await;

            if let Err(e) = launcher.registry.terminate(&session_id).await {
                warn!("Termination of session {} failed: {}", session_id, e);
            }
        });
    }
}
