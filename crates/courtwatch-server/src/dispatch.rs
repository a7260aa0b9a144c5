//! Notification delivery.
//!
//! The [`NotifierDispatcher`] turns newly opened slots into messages and
//! delivers them to every configured [`NotificationSink`]. Sinks run
//! concurrently and independently: a failing or slow sink never holds back
//! the others, and its failure is reported rather than raised.
//!
//! A failed delivery is retried once per sink per cycle. The retry sends
//! the compact form of the digest, which lists only the affected days.

use std::sync::Arc;
use std::time::Duration;

use courtwatch_core::{MessageFormatter, MessageStyle, NotificationEvent};
use courtwatch_providers::BoxFuture;
use futures_util::future::join_all;
use notify_rust::Notification;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::SinkError;

/// Longest message the Discord API accepts.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// A destination for formatted notification text.
pub trait NotificationSink: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Delivers one message.
    fn deliver<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), SinkError>>;
}

/// Sink kinds selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Post to a Discord channel.
    Discord,
    /// Show a desktop notification.
    Desktop,
    /// Write to the log.
    Log,
    /// Discard.
    Noop,
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn name(&self) -> &str {
        "noop"
    }

    fn deliver<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            debug!(chars = message.chars().count(), "notification discarded");
            Ok(())
        })
    }
}

/// Writes every message to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            info!(message = %message, "notification");
            Ok(())
        })
    }
}

/// Posts messages to a Discord channel through the REST API.
#[derive(Debug)]
pub struct DiscordSink {
    http_client: reqwest::Client,
    token: String,
    channel_id: u64,
    api_base: String,
}

impl DiscordSink {
    /// Creates a sink posting to `channel_id` as the bot owning `token`.
    pub fn new(token: impl Into<String>, channel_id: u64, timeout: Duration) -> Result<Self, SinkError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SinkError::Config("discord token is empty".to_string()));
        }
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("courtwatch/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http_client,
            token,
            channel_id,
            api_base: DISCORD_API_BASE.to_string(),
        })
    }

    /// Builder: override the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Returns the URL messages are posted to.
    pub fn messages_url(&self) -> String {
        format!(
            "{}/channels/{}/messages",
            self.api_base.trim_end_matches('/'),
            self.channel_id
        )
    }

    async fn post(&self, message: &str) -> Result<(), SinkError> {
        let response = self
            .http_client
            .post(self.messages_url())
            .header("Authorization", format!("Bot {}", self.token))
            .json(&json!({ "content": truncate_message(message, DISCORD_MESSAGE_LIMIT) }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl NotificationSink for DiscordSink {
    fn name(&self) -> &str {
        "discord"
    }

    fn deliver<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(self.post(message))
    }
}

/// Shows messages as desktop notifications.
#[derive(Debug, Clone)]
pub struct DesktopSink {
    app_name: String,
    timeout_secs: u32,
}

impl Default for DesktopSink {
    fn default() -> Self {
        Self {
            app_name: "courtwatch".to_string(),
            timeout_secs: 10,
        }
    }
}

impl DesktopSink {
    /// Builder: set the notification display time.
    pub fn with_timeout(mut self, secs: u32) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl NotificationSink for DesktopSink {
    fn name(&self) -> &str {
        "desktop"
    }

    fn deliver<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), SinkError>> {
        let app_name = self.app_name.clone();
        let timeout = Duration::from_secs(u64::from(self.timeout_secs));
        let body = message.to_string();
        Box::pin(async move {
            let (summary, body) = match body.split_once('\n') {
                Some((first, rest)) => (first.to_string(), rest.to_string()),
                None => ("Court availability".to_string(), body),
            };
            // The D-Bus call blocks.
            tokio::task::spawn_blocking(move || {
                Notification::new()
                    .appname(&app_name)
                    .summary(&summary)
                    .body(&body)
                    .timeout(timeout)
                    .show()
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
            .await
            .map_err(|e| SinkError::Desktop(e.to_string()))?
            .map_err(SinkError::Desktop)
        })
    }
}

/// Cuts `message` to at most `limit` characters, marking the cut.
pub fn truncate_message(message: &str, limit: usize) -> String {
    if message.chars().count() <= limit {
        return message.to_string();
    }
    let keep = limit.saturating_sub(3);
    let mut truncated: String = message.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound on one delivery attempt.
    pub delivery_timeout: Duration,
    /// Whether a failed delivery is retried once.
    pub retry_failed: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(10),
            retry_failed: true,
        }
    }
}

impl DispatchConfig {
    /// Builder: set the per-attempt timeout.
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Builder: enable or disable the single retry.
    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry_failed = retry;
        self
    }
}

/// Delivery outcome for one sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkOutcome {
    /// Sink name.
    pub sink: String,
    /// Messages delivered, including retries that succeeded.
    pub delivered: usize,
    /// Messages that could not be delivered.
    pub failed: usize,
    /// Whether the retry was used.
    pub retried: bool,
    /// Last error seen, if any.
    pub last_error: Option<String>,
}

impl SinkOutcome {
    /// Returns true if every message reached the sink.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Per-sink outcomes of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// One entry per sink, in configuration order.
    pub outcomes: Vec<SinkOutcome>,
}

impl DispatchReport {
    /// Returns true if every sink received every message.
    pub fn all_delivered(&self) -> bool {
        self.outcomes.iter().all(SinkOutcome::is_success)
    }

    /// Names of sinks with at least one undelivered message.
    pub fn failed_sinks(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.sink.as_str())
            .collect()
    }

    /// Returns the outcome for a sink by name.
    pub fn outcome(&self, sink: &str) -> Option<&SinkOutcome> {
        self.outcomes.iter().find(|o| o.sink == sink)
    }
}

/// Formats events and fans them out to sinks.
pub struct NotifierDispatcher {
    sinks: Vec<Arc<dyn NotificationSink>>,
    formatter: MessageFormatter,
    config: DispatchConfig,
}

impl NotifierDispatcher {
    /// Creates a dispatcher with no sinks.
    pub fn new(formatter: MessageFormatter, config: DispatchConfig) -> Self {
        Self {
            sinks: Vec::new(),
            formatter,
            config,
        }
    }

    /// Builder: add a sink.
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Adds a sink.
    pub fn add_sink(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    /// Names of the configured sinks.
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Returns the formatter.
    pub fn formatter(&self) -> &MessageFormatter {
        &self.formatter
    }

    /// Formats `events` and delivers them to every sink.
    ///
    /// Returns once every sink has finished or timed out. No events means
    /// nothing is sent.
    pub async fn notify(&self, events: &[NotificationEvent]) -> DispatchReport {
        let messages = self.formatter.format(events);
        if messages.is_empty() {
            return DispatchReport::default();
        }
        let fallback = match self.formatter.style() {
            MessageStyle::Digest => Some(self.formatter.compact(events)),
            MessageStyle::PerSlot => None,
        };
        self.dispatch(&messages, fallback.as_deref()).await
    }

    /// Delivers a plain announcement to every sink.
    pub async fn announce(&self, text: &str) -> DispatchReport {
        self.dispatch(&[text.to_string()], None).await
    }

    async fn dispatch(&self, messages: &[String], fallback: Option<&str>) -> DispatchReport {
        let deliveries = self
            .sinks
            .iter()
            .map(|sink| self.deliver_to(sink.as_ref(), messages, fallback));
        let outcomes = join_all(deliveries).await;

        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            warn!(
                sink = %outcome.sink,
                failed = outcome.failed,
                error = outcome.last_error.as_deref().unwrap_or(""),
                "notification not delivered"
            );
        }
        DispatchReport { outcomes }
    }

    async fn deliver_to(
        &self,
        sink: &dyn NotificationSink,
        messages: &[String],
        fallback: Option<&str>,
    ) -> SinkOutcome {
        let mut outcome = SinkOutcome {
            sink: sink.name().to_string(),
            delivered: 0,
            failed: 0,
            retried: false,
            last_error: None,
        };

        for message in messages {
            let mut result = self.attempt(sink, message).await;
            if let Err(ref e) = result
                && self.config.retry_failed
                && !outcome.retried
            {
                warn!(sink = sink.name(), error = %e, "delivery failed, retrying once");
                outcome.retried = true;
                result = self.attempt(sink, fallback.unwrap_or(message)).await;
            }

            match result {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    outcome.failed += 1;
                    outcome.last_error = Some(e.to_string());
                }
            }
        }

        debug!(
            sink = sink.name(),
            delivered = outcome.delivered,
            failed = outcome.failed,
            "sink finished"
        );
        outcome
    }

    async fn attempt(&self, sink: &dyn NotificationSink, message: &str) -> Result<(), SinkError> {
        let timeout = self.config.delivery_timeout;
        match tokio::time::timeout(timeout, sink.deliver(message)).await {
            Ok(result) => result,
            Err(_) => Err(SinkError::Timeout(timeout)),
        }
    }
}
