use std::time::Duration;

/// Process configuration, loaded once at startup and read-only thereafter.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// How often the expiry reaper runs.
    pub cleanup_interval: Duration,
    /// How often the maintenance scheduler runs its broader sweep.
    pub maintenance_interval: Duration,
    /// Offset added to `created_at` to compute a new record's `expires_at`.
    pub default_expiry: Duration,
    /// Disables the reaper entirely when false (maintenance still runs).
    pub cleanup_enabled: bool,
    /// Webhook endpoints notified on limit-reached events. Empty = disabled.
    pub webhook_urls: Vec<String>,
    /// Optional HMAC-SHA256 signing secret for webhook payloads.
    pub webhook_secret: Option<String>,
}

pub const DEFAULT_EXPIRY_SECS: u64 = 86_400; // 24h
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 86_400; // 24h
pub const DEFAULT_MAINTENANCE_INTERVAL_SECS: u64 = 21_600; // 6h

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let cfg = Config {
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/chat_notify".into()),
        cleanup_interval: Duration::from_secs(parse_secs(
            "NOTIFY_CLEANUP_INTERVAL_SECS",
            DEFAULT_CLEANUP_INTERVAL_SECS,
        )),
        maintenance_interval: Duration::from_secs(parse_secs(
            "NOTIFY_MAINTENANCE_INTERVAL_SECS",
            DEFAULT_MAINTENANCE_INTERVAL_SECS,
        )),
        default_expiry: Duration::from_secs(parse_secs(
            "NOTIFY_DEFAULT_EXPIRY_SECS",
            DEFAULT_EXPIRY_SECS,
        )),
        cleanup_enabled: parse_bool("NOTIFY_CLEANUP_ENABLED", true),
        webhook_urls: std::env::var("NOTIFY_WEBHOOK_URLS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        webhook_secret: std::env::var("NOTIFY_WEBHOOK_SECRET").ok(),
    };

    // expires_at must strictly exceed created_at for every new record.
    if cfg.default_expiry.is_zero() {
        anyhow::bail!("NOTIFY_DEFAULT_EXPIRY_SECS must be greater than zero");
    }

    Ok(cfg)
}

fn parse_secs(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
