use std::time::Duration;

/// Endpoint and timing configuration, read once at startup. Environment
/// variables override the defaults; a `.env` file is honoured when the
/// binaries call `dotenvy::dotenv()` first.
#[derive(Clone, Debug)]
pub struct LiveConfig {
    pub stream_url: String,
    pub api_base: String,
    pub keepalive_interval: Duration,
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            stream_url: "ws://127.0.0.1:8920/ws".to_string(),
            api_base: "http://127.0.0.1:8920".to_string(),
            keepalive_interval: Duration::from_secs(30),
            reconnect_base_delay: Duration::from_secs(5),
            reconnect_max_delay: Duration::from_secs(60),
        }
    }
}

impl LiveConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            stream_url: std::env::var("LARKSPUR_STREAM_URL")
                .unwrap_or_else(|_| defaults.stream_url.clone()),
            api_base: std::env::var("LARKSPUR_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| defaults.api_base.clone()),
            keepalive_interval: env_secs("LARKSPUR_KEEPALIVE_SECS", defaults.keepalive_interval),
            reconnect_base_delay: env_secs(
                "LARKSPUR_RECONNECT_BASE_SECS",
                defaults.reconnect_base_delay,
            ),
            reconnect_max_delay: env_secs(
                "LARKSPUR_RECONNECT_MAX_SECS",
                defaults.reconnect_max_delay,
            ),
        }
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
