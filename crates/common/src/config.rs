use serde::Deserialize;

/// SMTP settings for the email channel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address; falls back to `username` when unset
    pub from: Option<String>,
    /// Upgrade the session with STARTTLS before authenticating
    pub use_tls: bool,
}

/// Twilio-compatible SMS gateway credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

/// Telegram bot credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
}

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string (`memory:` selects the volatile store)
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 10)
    pub db_max_connections: u32,

    /// Socket address the API server binds to (default: 0.0.0.0:8000)
    pub bind_addr: String,

    /// Upper bound for a single provider send, in seconds (default: 20)
    pub send_timeout_secs: u64,

    pub smtp: SmtpConfig,
    pub twilio: TwilioConfig,
    pub telegram: TelegramConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Channel credentials are optional: a channel without them stays registered
    /// and reports itself as not configured when a delivery is attempted.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            send_timeout_secs: parse_send_timeout(
                &std::env::var("SEND_TIMEOUT_SECS").unwrap_or_else(|_| "20".to_string()),
            )?,
            smtp: SmtpConfig {
                host: non_empty_var("SMTP_HOST"),
                port: std::env::var("SMTP_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("SMTP_PORT must be a valid u16"))?,
                username: non_empty_var("SMTP_USER"),
                password: non_empty_var("SMTP_PASS"),
                from: non_empty_var("SMTP_FROM"),
                use_tls: parse_flag(
                    &std::env::var("SMTP_USE_TLS").unwrap_or_else(|_| "true".to_string()),
                ),
            },
            twilio: TwilioConfig {
                account_sid: non_empty_var("TWILIO_SID"),
                auth_token: non_empty_var("TWILIO_TOKEN"),
                from_number: non_empty_var("TWILIO_FROM"),
            },
            telegram: TelegramConfig {
                bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
            },
        })
    }
}

/// Read an optional variable, treating an empty value as absent.
fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// A zero timeout would fail every send before it starts.
fn parse_send_timeout(value: &str) -> anyhow::Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(0) => anyhow::bail!("SEND_TIMEOUT_SECS must be greater than 0"),
        Ok(secs) => Ok(secs),
        Err(_) => anyhow::bail!("SEND_TIMEOUT_SECS must be a valid u64"),
    }
}

/// Interpret `1`, `true` and `yes` (any case) as enabled.
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_accepts_truthy_values() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
    }

    #[test]
    fn test_parse_flag_rejects_everything_else() {
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("on"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_send_timeout_must_be_positive() {
        assert_eq!(parse_send_timeout("20").unwrap(), 20);
        assert_eq!(parse_send_timeout(" 5 ").unwrap(), 5);

        let err = parse_send_timeout("0").unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
        assert!(parse_send_timeout("-1").is_err());
        assert!(parse_send_timeout("soon").is_err());
    }
}
