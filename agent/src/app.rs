//! Application wiring — builds the production adapters from [`AgentConfig`].
//!
//! Command handlers receive an `&App` and ask it for the services they need;
//! nothing else in the crate constructs infrastructure types.

use std::sync::Arc;

use anyhow::{Context, Result};
use outpost_common::AgentConfig;

use crate::application::ports::{MessageSender, ReleaseFeed};
use crate::application::services::checker::{BackgroundChecker, CheckerSettings};
use crate::application::services::update::{UpdateOrchestrator, UpdatePorts};
use crate::infra::authorizer::AllowlistAuthorizer;
use crate::infra::feed::{GithubReleaseFeed, USER_AGENT};
use crate::infra::ledger::JsonLedgerStore;
use crate::infra::lock::FsUpdateLock;
use crate::infra::notice::FileNoticeStore;
use crate::infra::process::{DetachedSpawner, SystemLiveness};
use crate::infra::script::ShellScriptLauncher;
use crate::infra::stager::{HttpArtifactStager, StagerSettings};
use crate::infra::telegram::TelegramSender;
use crate::output::OutputContext;

/// Unified context passed to every command handler.
pub struct App {
    pub config: AgentConfig,
    pub output: OutputContext,
    /// Machine-readable output requested.
    pub json: bool,
    client: reqwest::Client,
}

impl App {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AgentConfig, output: OutputContext, json: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            config,
            output,
            json,
            client,
        })
    }

    #[must_use]
    pub fn feed(&self) -> Arc<dyn ReleaseFeed> {
        Arc::new(GithubReleaseFeed::from_config(self.client.clone(), &self.config))
    }

    #[must_use]
    pub fn lock(&self) -> Arc<FsUpdateLock> {
        Arc::new(FsUpdateLock::new(self.config.lock_path(), Arc::new(SystemLiveness)))
    }

    #[must_use]
    pub fn notices(&self) -> Arc<FileNoticeStore> {
        Arc::new(FileNoticeStore::with_path(self.config.notice_path()))
    }

    /// # Errors
    ///
    /// Returns an error if the ledger file exists but is unreadable.
    pub fn ledger(&self) -> Result<Arc<JsonLedgerStore>> {
        Ok(Arc::new(JsonLedgerStore::open(self.config.ledger_path())?))
    }

    /// Telegram sender, if a bot token is configured.
    #[must_use]
    pub fn sender(&self) -> Option<Arc<dyn MessageSender>> {
        let token = self.config.telegram_token.as_deref()?.trim();
        if token.is_empty() {
            return None;
        }
        Some(Arc::new(TelegramSender::new(
            self.client.clone(),
            &self.config.telegram_api_base,
            token,
            self.config.send_timeout(),
        )))
    }

    /// # Errors
    ///
    /// Returns an error if no Telegram token is configured.
    pub fn require_sender(&self) -> Result<Arc<dyn MessageSender>> {
        self.sender()
            .context("OUTPOST_TELEGRAM_TOKEN is not set; the agent cannot deliver notices")
    }

    #[must_use]
    pub fn orchestrator(&self) -> Arc<UpdateOrchestrator> {
        let ports = UpdatePorts {
            feed: self.feed(),
            lock: self.lock(),
            stager: Arc::new(HttpArtifactStager::new(
                self.client.clone(),
                StagerSettings::from_config(&self.config),
            )),
            launcher: Arc::new(ShellScriptLauncher::from_config(
                &self.config,
                Arc::new(DetachedSpawner),
            )),
            notices: self.notices(),
        };
        Arc::new(UpdateOrchestrator::new(
            self.config.current_version.clone(),
            ports,
        ))
    }

    /// # Errors
    ///
    /// Returns an error if the ledger cannot be opened.
    pub fn checker(&self, sender: Arc<dyn MessageSender>) -> Result<BackgroundChecker> {
        let settings = CheckerSettings {
            current_version: self.config.current_version.clone(),
            interval: self.config.check_interval(),
            changelog_chars: self.config.changelog_chars,
        };
        Ok(BackgroundChecker::new(
            settings,
            self.feed(),
            self.ledger()?,
            sender,
            Arc::new(AllowlistAuthorizer::with_path(self.config.allowlist_path())),
        ))
    }
}
