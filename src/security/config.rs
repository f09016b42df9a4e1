use time::Duration;
use tracing::warn;

pub const ACCESS_TOKEN_TTL: Duration = Duration::minutes(15);
pub const REFRESH_TOKEN_TTL: Duration = Duration::days(7);

/// Signing secrets and lifetimes for the two token families. Built once at
/// startup and handed to the codec; nothing else reads the environment for
/// these.
#[derive(Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let access_secret = env_string("JWT_ACCESS_SECRET").unwrap_or_else(|| {
            warn!("JWT_ACCESS_SECRET missing; using the dev default");
            "access_secret_dev".into()
        });
        let refresh_secret = env_string("JWT_REFRESH_SECRET").unwrap_or_else(|| {
            warn!("JWT_REFRESH_SECRET missing; using the dev default");
            "refresh_secret_dev".into()
        });

        AuthConfig {
            access_secret,
            refresh_secret,
            access_ttl: ACCESS_TOKEN_TTL,
            refresh_ttl: REFRESH_TOKEN_TTL,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
