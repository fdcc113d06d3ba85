use crate::capability;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Shared HS256 signing secret. `None` (or empty) disables token
    /// issuance and verification entirely — fail closed on both sides.
    pub token_secret: Option<String>,
    /// Base URL that action links point at, e.g. "https://gate.example.com".
    pub public_url: String,
    /// Comma-separated list of webhook URLs that receive device notifications.
    pub webhook_urls: Vec<String>,
    /// Optional HMAC secret for signing webhook deliveries.
    pub webhook_secret: Option<String>,
    /// Capability token lifetime in seconds.
    /// Set via DEVGATE_TOKEN_TTL_SECS. Default: 600 (10 minutes).
    pub token_ttl_secs: i64,
}

impl Config {
    /// The signing secret, treating the empty string as absent.
    pub fn signing_secret(&self) -> Option<&str> {
        self.token_secret.as_deref().filter(|s| !s.is_empty())
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let token_secret = std::env::var("DEVGATE_TOKEN_SECRET").ok();
    if token_secret.as_deref().map_or(true, str::is_empty) {
        eprintln!(
            "⚠️  DEVGATE_TOKEN_SECRET is not set — management links are disabled \
             and every action request will be refused."
        );
    }

    Ok(Config {
        port: std::env::var("DEVGATE_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/devgate".into()),
        token_secret,
        public_url: std::env::var("DEVGATE_PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into()),
        webhook_urls: std::env::var("DEVGATE_WEBHOOK_URLS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        webhook_secret: std::env::var("DEVGATE_WEBHOOK_SECRET").ok(),
        token_ttl_secs: std::env::var("DEVGATE_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(capability::DEFAULT_TOKEN_TTL_SECS),
    })
}
