//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/courtwatch/config.toml` by default.
//!
//! Credential values (`[credentials]`, `[discord]` and the Mindbody
//! `client_id`) support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use courtwatch_core::MessageStyle;
use courtwatch_providers::Credentials;
use courtwatch_providers::mindbody::MindbodyConfig;
use courtwatch_server::{DispatchConfig, SchedulerConfig, SinkKind};
use serde::{Deserialize, Serialize};

use crate::secret;

/// Longest lookahead accepted for `monitor.window_days`.
pub const MAX_WINDOW_DAYS: u32 = 366;

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the courtwatch process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Poll loop settings.
    pub monitor: MonitorSettings,

    /// Notification settings.
    pub notifications: NotificationSettings,

    /// Discord delivery settings.
    pub discord: DiscordSettings,

    /// Upstream booking system settings.
    pub mindbody: MindbodyConfig,

    /// Login credentials.
    pub credentials: CredentialSettings,
}

/// Poll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Seconds between polls.
    pub interval_secs: u64,

    /// Days ahead to watch.
    pub window_days: u32,

    /// Upper bound of the failure backoff in seconds.
    pub max_backoff_secs: u64,

    /// Consecutive rejected logins before giving up.
    pub max_auth_failures: u32,

    /// Seconds an in-flight cycle may take to finish on shutdown.
    pub shutdown_grace_secs: u64,

    /// Random spread applied to the interval, as a fraction of it.
    pub jitter_fraction: f64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            window_days: 7,
            max_backoff_secs: 300,
            max_auth_failures: 5,
            shutdown_grace_secs: 10,
            jitter_fraction: 0.0,
        }
    }
}

impl MonitorSettings {
    /// Builds the scheduler configuration.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(Duration::from_secs(self.interval_secs))
            .with_max_backoff(Duration::from_secs(self.max_backoff_secs))
            .with_max_auth_failures(self.max_auth_failures)
            .with_shutdown_grace(Duration::from_secs(self.shutdown_grace_secs))
            .with_jitter(self.jitter_fraction)
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Detect changes without delivering anything.
    pub dry_run: bool,

    /// Where messages go.
    pub sinks: Vec<SinkKind>,

    /// One digest per cycle or one message per slot.
    pub style: MessageStyle,

    /// IANA timezone used to display slot times.
    pub timezone: String,

    /// Upper bound on one delivery attempt in seconds.
    pub delivery_timeout_secs: u64,

    /// Retry a failed delivery once with the compact digest.
    pub retry_failed: bool,

    /// How long desktop notifications stay on screen, in seconds.
    pub desktop_timeout_secs: u32,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            sinks: vec![SinkKind::Discord],
            style: MessageStyle::default(),
            timezone: "America/Los_Angeles".to_string(),
            delivery_timeout_secs: 10,
            retry_failed: true,
            desktop_timeout_secs: 10,
        }
    }
}

impl NotificationSettings {
    /// Parses the display timezone.
    pub fn timezone(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| format!("invalid timezone `{}`: {}", self.timezone, e))
    }

    /// Builds the dispatcher configuration.
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig::default()
            .with_delivery_timeout(Duration::from_secs(self.delivery_timeout_secs))
            .with_retry(self.retry_failed)
    }
}

/// Discord delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSettings {
    /// Bot token (supports `pass::` and `env::` prefixes).
    pub token: Option<String>,

    /// Channel to post to (supports `pass::` and `env::` prefixes).
    pub channel_id: Option<String>,
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            token: Some("env::DISCORD_TOKEN".to_string()),
            channel_id: Some("env::DISCORD_CHANNEL_ID".to_string()),
        }
    }
}

impl DiscordSettings {
    /// Resolves the bot token and channel id.
    pub fn resolve(&self) -> Result<(String, u64), String> {
        let token = secret::resolve_optional(self.token.as_deref())
            .map_err(|e| format!("failed to resolve discord token: {}", e))?
            .ok_or_else(|| "discord token is missing from [discord]".to_string())?;
        let channel = secret::resolve_optional(self.channel_id.as_deref())
            .map_err(|e| format!("failed to resolve discord channel_id: {}", e))?
            .ok_or_else(|| "discord channel_id is missing from [discord]".to_string())?;
        let channel_id = channel
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("discord channel_id `{}` is not a number", channel.trim()))?;
        Ok((token, channel_id))
    }
}

/// Login credentials.
///
/// Either `username` and `password`, or an `access_token` copied from a
/// browser session. A token wins when both are set.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Account email (supports `pass::` and `env::` prefixes).
    pub username: Option<String>,

    /// Account password (supports `pass::` and `env::` prefixes).
    pub password: Option<String>,

    /// Bearer token (supports `pass::` and `env::` prefixes).
    pub access_token: Option<String>,
}

impl std::fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSettings")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl CredentialSettings {
    /// Resolves secret references into provider credentials.
    pub fn resolve(&self) -> Result<Credentials, String> {
        if let Some(token) = secret::resolve_optional(self.access_token.as_deref())
            .map_err(|e| format!("failed to resolve access_token: {}", e))?
        {
            return Ok(Credentials::access_token(token));
        }

        let username = secret::resolve_optional(self.username.as_deref())
            .map_err(|e| format!("failed to resolve username: {}", e))?;
        let password = secret::resolve_optional(self.password.as_deref())
            .map_err(|e| format!("failed to resolve password: {}", e))?;
        match (username, password) {
            (Some(username), Some(password)) => Ok(Credentials::password(username, password)),
            (Some(_), None) => Err("password is missing from [credentials]".to_string()),
            _ => Err(format!(
                "credentials not found. Add to {}:\n  \
                 [credentials]\n  \
                 username = \"you@example.com\"\n  \
                 password = \"env::COURTWATCH_PASSWORD\"\n\n  \
                 Or set access_token instead.",
                ClientConfig::default_path().display()
            )),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("courtwatch")
    }

    /// Returns the Mindbody settings with secret references resolved.
    pub fn mindbody_config(&self) -> Result<MindbodyConfig, String> {
        let mut config = self.mindbody.clone();
        config.client_id = secret::resolve_optional(config.client_id.as_deref())
            .map_err(|e| format!("failed to resolve mindbody client_id: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), String> {
        if self.monitor.interval_secs == 0 {
            return Err("monitor.interval_secs must be at least 1".to_string());
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.monitor.window_days) {
            return Err(format!(
                "monitor.window_days must be between 1 and {}",
                MAX_WINDOW_DAYS
            ));
        }
        if self.monitor.max_backoff_secs < self.monitor.interval_secs {
            return Err("monitor.max_backoff_secs must not be below monitor.interval_secs".to_string());
        }
        if !(0.0..1.0).contains(&self.monitor.jitter_fraction) {
            return Err("monitor.jitter_fraction must be in [0, 1)".to_string());
        }
        self.notifications.timezone()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.monitor.interval_secs, 15);
        assert_eq!(config.monitor.max_auth_failures, 5);
        assert_eq!(config.notifications.sinks, vec![SinkKind::Discord]);
        assert_eq!(config.notifications.style, MessageStyle::Digest);
        assert_eq!(config.notifications.timezone().unwrap(), chrono_tz::America::Los_Angeles);
        assert_eq!(config.mindbody, MindbodyConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_path_ends_with_courtwatch() {
        let path = ClientConfig::default_path();
        assert!(path.ends_with("courtwatch/config.toml"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[monitor]
interval_secs = 30
window_days = 3

[notifications]
sinks = ["discord", "log"]
style = "per_slot"
timezone = "Europe/Paris"

[discord]
token = "bot-token"
channel_id = "1234"

[mindbody]
site_id = 42
court_offset = 0
max_court = 4

[credentials]
access_token = "abc"
"#
        )
        .unwrap();

        let config = ClientConfig::load_from(file.path()).unwrap();

        assert_eq!(config.monitor.interval_secs, 30);
        assert_eq!(config.monitor.window_days, 3);
        assert_eq!(config.monitor.max_backoff_secs, 300);
        assert_eq!(config.notifications.sinks, vec![SinkKind::Discord, SinkKind::Log]);
        assert_eq!(config.notifications.style, MessageStyle::PerSlot);
        assert_eq!(config.notifications.timezone().unwrap(), chrono_tz::Europe::Paris);
        assert_eq!(config.discord.resolve().unwrap(), ("bot-token".to_string(), 1234));
        assert_eq!(config.mindbody.site_id, 42);
        assert_eq!(config.mindbody.max_court, Some(4));
        assert_eq!(config.mindbody.slot_minutes, 15);
        assert!(matches!(
            config.credentials.resolve().unwrap(),
            Credentials::AccessToken(ref t) if t == "abc"
        ));
    }

    #[test]
    fn load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.contains("failed to read config"));
    }

    #[test]
    fn load_from_invalid_toml_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[monitor]\ninterval_secs = \"soon\"\n").unwrap();

        let err = ClientConfig::load_from(file.path()).unwrap_err();
        assert!(err.contains("failed to parse config"));
    }

    #[test]
    fn unknown_sink_is_rejected() {
        let result: Result<ClientConfig, _> = toml::from_str("[notifications]\nsinks = [\"pager\"]\n");
        assert!(result.is_err());
    }

    #[test]
    fn scheduler_config_from_settings() {
        let settings = MonitorSettings {
            interval_secs: 20,
            max_backoff_secs: 100,
            max_auth_failures: 2,
            ..Default::default()
        };
        let scheduler = settings.scheduler_config();
        assert_eq!(scheduler.poll_interval, Duration::from_secs(20));
        assert_eq!(scheduler.max_backoff, Duration::from_secs(100));
        assert_eq!(scheduler.max_auth_failures, 2);
    }

    #[test]
    fn dispatch_config_follows_notification_settings() {
        let settings: NotificationSettings =
            toml::from_str("delivery_timeout_secs = 4\nretry_failed = false\n").unwrap();

        let dispatch = settings.dispatch_config();

        assert_eq!(dispatch.delivery_timeout, Duration::from_secs(4));
        assert!(!dispatch.retry_failed);
        assert_eq!(settings.desktop_timeout_secs, 10);
        assert!(NotificationSettings::default().dispatch_config().retry_failed);
    }

    #[test]
    fn mindbody_client_id_is_resolved() {
        let mut config = ClientConfig::default();
        config.mindbody = MindbodyConfig::default().with_client_id("plain-client");
        assert_eq!(
            config.mindbody_config().unwrap().client_id.as_deref(),
            Some("plain-client")
        );

        config.mindbody = MindbodyConfig::default().with_client_id("env::_COURTWATCH_UNSET_CLIENT_ID");
        let err = config.mindbody_config().unwrap_err();
        assert!(err.contains("mindbody client_id"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = ClientConfig::default();
        config.monitor.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.notifications.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().unwrap_err().contains("invalid timezone"));

        let mut config = ClientConfig::default();
        config.monitor.jitter_fraction = 1.5;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.monitor.window_days = u32::MAX;
        assert!(config.validate().unwrap_err().contains("window_days"));

        let mut config = ClientConfig::default();
        config.monitor.window_days = MAX_WINDOW_DAYS;
        assert!(config.validate().is_ok());

        let mut config = ClientConfig::default();
        config.monitor.interval_secs = 600;
        config.monitor.max_backoff_secs = 300;
        assert!(config.validate().unwrap_err().contains("max_backoff_secs"));
    }

    #[test]
    fn credentials_prefer_token() {
        let settings = CredentialSettings {
            username: Some("me@example.com".to_string()),
            password: Some("pw".to_string()),
            access_token: Some("tok".to_string()),
        };
        assert!(matches!(settings.resolve().unwrap(), Credentials::AccessToken(_)));
    }

    #[test]
    fn credentials_password_with_env_reference() {
        unsafe {
            std::env::set_var("_COURTWATCH_TEST_PASSWORD", "from-env");
        }
        let settings = CredentialSettings {
            username: Some("me@example.com".to_string()),
            password: Some("env::_COURTWATCH_TEST_PASSWORD".to_string()),
            access_token: None,
        };
        match settings.resolve().unwrap() {
            Credentials::Password { username, password } => {
                assert_eq!(username, "me@example.com");
                assert_eq!(password, "from-env");
            }
            other => panic!("unexpected credentials: {other:?}"),
        }
        unsafe {
            std::env::remove_var("_COURTWATCH_TEST_PASSWORD");
        }
    }

    #[test]
    fn credentials_missing_errors() {
        let err = CredentialSettings::default().resolve().unwrap_err();
        assert!(err.contains("credentials not found"));

        let settings = CredentialSettings {
            username: Some("me@example.com".to_string()),
            ..Default::default()
        };
        assert!(settings.resolve().unwrap_err().contains("password"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let settings = CredentialSettings {
            username: Some("me".to_string()),
            password: Some("hunter2".to_string()),
            access_token: Some("tok".to_string()),
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("tok\""));
    }

    #[test]
    fn discord_channel_must_be_numeric() {
        let settings = DiscordSettings {
            token: Some("t".to_string()),
            channel_id: Some("general".to_string()),
        };
        assert!(settings.resolve().unwrap_err().contains("not a number"));
    }
}
